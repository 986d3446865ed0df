//! Schema migration runner for the self-hosted provider.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! The database URL comes from `--database-url`, `DATABASE_URL`, or the
//! `local.database_url` setting.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill_db::migration::Migrator;
use quill_shared::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "migrator", version, about = "Quill schema migrations")]
struct Cli {
    /// Overrides the configured database URL.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Apply pending migrations (default).
    Up {
        /// Apply at most this many.
        #[arg(short, long)]
        num: Option<u32>,
    },
    /// Roll back applied migrations.
    Down {
        #[arg(short, long, default_value_t = 1)]
        num: u32,
    },
    /// Show applied and pending migrations.
    Status,
    /// Drop every table and apply all migrations.
    Fresh,
    /// Roll back everything, then apply all migrations.
    Refresh,
    /// Roll back everything.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=info,sea_orm_migration=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let url = match cli.database_url {
        Some(url) => url,
        None => {
            AppConfig::load()
                .context("failed to load configuration")?
                .local
                .database_url
        }
    };
    let db = quill_db::connect(&url).await?;

    match cli.command.unwrap_or(Command::Up { num: None }) {
        Command::Up { num } => Migrator::up(&db, num).await?,
        Command::Down { num } => Migrator::down(&db, Some(num)).await?,
        Command::Status => Migrator::status(&db).await?,
        Command::Fresh => Migrator::fresh(&db).await?,
        Command::Refresh => Migrator::refresh(&db).await?,
        Command::Reset => Migrator::reset(&db).await?,
    }

    info!(database = %quill_db::redact_url(&url), "migrations finished");
    Ok(())
}
