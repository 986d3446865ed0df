//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Blog client over Appwrite, Supabase or a local database.
#[derive(Debug, Parser)]
#[command(name = "quill", version, about)]
pub struct Cli {
    /// Emit logs as JSON.
    #[arg(long, global = true, env = "QUILL_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// One facade operation per subcommand.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the setup guide or save provider settings.
    Setup(SetupArgs),
    /// Create an account, its profile and a session.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "QUILL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: String,
    },
    /// Open a session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "QUILL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Close every session of the signed-in user.
    Logout,
    /// Print the signed-in user.
    Whoami,
    /// List the latest posts.
    Posts {
        #[arg(long)]
        limit: Option<u32>,
        /// Only posts by this user ID.
        #[arg(long)]
        author: Option<String>,
    },
    /// Show one post.
    Post { id: String },
    /// Compose and publish a post as the signed-in user.
    Publish(PublishArgs),
    /// Edit a post.
    Update(UpdateArgs),
    /// Delete a post.
    Delete { id: String },
    /// Upload an image and print its reference.
    Upload {
        path: PathBuf,
        #[arg(long)]
        key: Option<String>,
    },
    /// Resolve an image reference (URL or file ID) to a URL.
    ImageUrl { reference: String },
    /// Show a profile; defaults to the signed-in user.
    Profile { user_id: Option<String> },
    /// List the signed-in user's posts.
    MyPosts {
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Appwrite project ID.
    #[arg(long, conflicts_with_all = ["supabase_url", "supabase_key"])]
    pub project_id: Option<String>,
    /// Supabase project URL.
    #[arg(long, requires = "supabase_key")]
    pub supabase_url: Option<String>,
    /// Supabase anon key.
    #[arg(long, requires = "supabase_url")]
    pub supabase_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct PublishArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub content: String,
    /// Cover image to upload first.
    #[arg(long)]
    pub image: Option<PathBuf>,
    /// Reusing a key returns the post created by the first call.
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long)]
    pub published: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_publish() {
        let cli = Cli::try_parse_from([
            "quill", "publish", "--title", "Hello", "--content", "World", "--key", "k1",
        ])
        .unwrap();
        let Command::Publish(args) = cli.command else {
            panic!("expected publish");
        };
        assert_eq!(args.title, "Hello");
        assert_eq!(args.key.as_deref(), Some("k1"));
        assert!(args.image.is_none());
    }

    #[test]
    fn test_setup_rejects_mixed_providers() {
        let result = Cli::try_parse_from([
            "quill",
            "setup",
            "--project-id",
            "p1",
            "--supabase-url",
            "https://x.supabase.co",
            "--supabase-key",
            "k",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_supabase_setup_needs_both_values() {
        assert!(Cli::try_parse_from(["quill", "setup", "--supabase-url", "https://x"]).is_err());
    }
}
