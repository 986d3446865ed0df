//! Command execution against the facade.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};

use quill_core::Blog;
use quill_core::blog::{
    Credentials, CurrentUser, DEFAULT_POST_LIMIT, IdempotencyKey, ImageRef, ImageUpload,
    NewAccount, Post, PostPatch, PostQuery, PublishRequest,
};
use quill_core::session::{FileSessionCache, SessionCache};
use quill_core::setup::{LocalSettings, SetupGuide};
use quill_shared::types::{FileId, PostId, UserId};
use quill_shared::{AppConfig, AppError};

use crate::backend::build_backend;
use crate::cli::{Command, PublishArgs, SetupArgs, UpdateArgs};

/// Runs one command.
///
/// `setup` works on local settings only. Everything else goes through the
/// setup gate first and never reaches the network while it is closed.
pub async fn run(command: Command, config: AppConfig) -> anyhow::Result<()> {
    if let Command::Setup(args) = &command {
        return setup(&config, args);
    }

    let guide = SetupGuide::for_config(&config);
    if !guide.is_complete() {
        eprint!("{guide}");
        bail!("{} is not configured yet", config.provider);
    }

    let cache: Arc<dyn SessionCache> = Arc::new(FileSessionCache::in_dir(&config.settings_dir));
    let backend = build_backend(&config, cache).await?;
    let blog = Blog::with_config(backend, config.uploads.clone(), &config.idempotency);
    execute(&blog, command).await
}

fn setup(config: &AppConfig, args: &SetupArgs) -> anyhow::Result<()> {
    let settings = LocalSettings::in_dir(&config.settings_dir);
    if let Some(project_id) = &args.project_id {
        settings.save_project_id(project_id)?;
    } else if let (Some(url), Some(key)) = (&args.supabase_url, &args.supabase_key) {
        settings.save_supabase(url, key)?;
    } else {
        print!("{}", SetupGuide::for_config(config));
        return Ok(());
    }
    println!("Saved settings to {}", settings.path().display());

    // Environment variables still win over saved settings; report what will
    // actually be used.
    let reloaded = AppConfig::load_from(&config.settings_dir)
        .context("failed to reload configuration")?;
    let guide = SetupGuide::for_config(&reloaded);
    if guide.is_complete() {
        println!("{} is ready", reloaded.provider);
    } else {
        print!("{guide}");
    }
    Ok(())
}

async fn execute(blog: &Blog, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Setup(_) => bail!("setup does not use a backend"),
        Command::Register {
            email,
            password,
            name,
        } => {
            let session = blog
                .create_account(&NewAccount {
                    email,
                    password,
                    name,
                })
                .await?;
            println!(
                "Welcome, {}! Signed in as {}",
                session.user.display_name(),
                session.user.email
            );
        }
        Command::Login { email, password } => {
            let session = blog.login(&Credentials { email, password }).await?;
            println!("Signed in as {}", session.user.display_name());
        }
        Command::Logout => {
            blog.logout().await?;
            println!("Signed out");
        }
        Command::Whoami => match blog.current_user().await {
            CurrentUser::Authenticated(user) => {
                println!("{} <{}> [{}]", user.display_name(), user.email, user.id);
            }
            CurrentUser::Anonymous => println!("Not signed in"),
        },
        Command::Posts { limit, author } => {
            let query = PostQuery {
                limit: limit.unwrap_or(DEFAULT_POST_LIMIT),
                author_id: author.map(UserId::new),
            };
            print_feed(&blog.posts(&query).await?);
        }
        Command::Post { id } => {
            let post = blog.post(&PostId::new(id)).await?;
            print_post(blog, &post).await;
        }
        Command::Publish(args) => publish(blog, args).await?,
        Command::Update(args) => update(blog, args).await?,
        Command::Delete { id } => {
            blog.delete_post(&PostId::new(id.as_str())).await?;
            println!("Deleted {id}");
        }
        Command::Upload { path, key } => {
            let upload = read_image(&path).await?;
            let key = key.map(IdempotencyKey::new);
            let image = blog.upload_image(&upload, key.as_ref()).await?;
            println!("{image}");
            println!("{}", blog.image_url(&image).await?);
        }
        Command::ImageUrl { reference } => {
            println!("{}", blog.image_url(&parse_image_ref(&reference)).await?);
        }
        Command::Profile { user_id } => {
            let user_id = match user_id {
                Some(id) => UserId::new(id),
                None => blog
                    .current_user()
                    .await
                    .into_user()
                    .map(|user| user.id)
                    .ok_or_else(|| AppError::Unauthorized("sign in first".to_string()))?,
            };
            match blog.user_profile(&user_id).await? {
                Some(profile) => {
                    println!("{} <{}>", profile.name, profile.email);
                    if let Some(bio) = profile.bio.filter(|b| !b.trim().is_empty()) {
                        println!("{bio}");
                    }
                }
                None => println!("No profile for {user_id}"),
            }
        }
        Command::MyPosts { limit } => print_feed(&blog.my_posts(limit).await?),
    }
    Ok(())
}

async fn publish(blog: &Blog, args: PublishArgs) -> anyhow::Result<()> {
    let image = match &args.image {
        Some(path) => Some(read_image(path).await?),
        None => None,
    };
    let request = PublishRequest {
        title: args.title,
        content: args.content,
        image,
        idempotency_key: args.key.map(IdempotencyKey::new),
    };
    let post = blog.publish(&request).await?;
    println!("Published \"{}\" [{}]", post.title, post.id);
    Ok(())
}

async fn update(blog: &Blog, args: UpdateArgs) -> anyhow::Result<()> {
    let patch = PostPatch {
        title: args.title,
        content: args.content,
        image: None,
        published: args.published,
    };
    let post = blog.update_post(&PostId::new(args.id), &patch).await?;
    println!("Updated \"{}\" [{}]", post.title, post.id);
    Ok(())
}

fn print_feed(posts: &[Post]) {
    if posts.is_empty() {
        println!("No posts yet");
        return;
    }
    for post in posts {
        println!(
            "{}  {}  by {}  [{}]",
            post.created_at.format("%Y-%m-%d %H:%M"),
            post.title,
            post.author_name,
            post.id
        );
    }
}

async fn print_post(blog: &Blog, post: &Post) {
    println!("{}", post.title);
    println!(
        "by {} on {}",
        post.author_name,
        post.created_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(image) = &post.image {
        match blog.image_url(image).await {
            Ok(url) => println!("image: {url}"),
            Err(e) => println!("image unavailable: {}", e.message()),
        }
    }
    println!();
    for paragraph in post.content.lines().filter(|l| !l.trim().is_empty()) {
        println!("{paragraph}\n");
    }
}

/// URLs stay URLs; anything else is a provider file ID.
fn parse_image_ref(reference: &str) -> ImageRef {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        ImageRef::Url(reference.to_string())
    } else {
        ImageRef::File(FileId::new(reference.trim_start_matches("file:")))
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

async fn read_image(path: &Path) -> anyhow::Result<ImageUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    Ok(ImageUpload::new(filename, content_type_for(path), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_shared::ProviderKind;

    #[test]
    fn test_parse_image_ref() {
        assert_eq!(
            parse_image_ref("https://cdn.example.com/a.png"),
            ImageRef::Url("https://cdn.example.com/a.png".to_string())
        );
        assert_eq!(parse_image_ref("f1"), ImageRef::File(FileId::new("f1")));
        assert_eq!(parse_image_ref("file:f1"), ImageRef::File(FileId::new("f1")));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.exe")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_unconfigured_commands_stop_at_the_gate() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            settings_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };

        let err = run(Command::Whoami, config).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
        // No session file: the backend was never built.
        assert!(!dir.path().join("session.json").exists());
    }

    #[test]
    fn test_setup_saves_project_id() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            settings_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let args = SetupArgs {
            project_id: Some("proj-1".to_string()),
            supabase_url: None,
            supabase_key: None,
        };

        setup(&config, &args).unwrap();
        let saved = LocalSettings::in_dir(dir.path()).load().unwrap();
        assert_eq!(saved["appwrite"]["project_id"], "proj-1");
        assert_eq!(saved["provider"], ProviderKind::Appwrite.to_string());
    }

    #[tokio::test]
    async fn test_local_provider_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig {
            settings_dir: dir.path().to_path_buf(),
            provider: ProviderKind::Local,
            ..AppConfig::default()
        };
        config.local.database_url =
            format!("sqlite://{}?mode=rwc", dir.path().join("quill.db").display());
        config.local.storage_root = dir.path().join("uploads");

        run(
            Command::Register {
                email: "alice@example.com".to_string(),
                password: "password123".to_string(),
                name: "Alice".to_string(),
            },
            config.clone(),
        )
        .await
        .unwrap();
        assert!(dir.path().join("session.json").exists());

        run(
            Command::Publish(PublishArgs {
                title: "Hello".to_string(),
                content: "World".to_string(),
                image: None,
                key: None,
            }),
            config.clone(),
        )
        .await
        .unwrap();
        run(Command::MyPosts { limit: None }, config.clone())
            .await
            .unwrap();
        run(Command::Logout, config).await.unwrap();
        assert!(!dir.path().join("session.json").exists());
    }
}
