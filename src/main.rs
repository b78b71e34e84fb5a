use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use futures::TryStreamExt;
use std::path::{Path, PathBuf};

use blogger_import::blogger::{http_client, BlogSource, BloggerClient};
use blogger_import::config::Config;
use blogger_import::migrate::{session, ConsolePrompt, Migrator, Reporter, SessionOptions};
use blogger_import::storage::{Database, DatabaseError};

/// Get the config directory path (~/.config/blogger-import/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("blogger-import"))
}

/// Create the config directory if needed, user-only on Unix.
fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        eprintln!("Created config directory: {}", config_dir.display());
    }

    // SEC-007: Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "blogger-import",
    version,
    about = "Import a Blogger blog into a local blog database"
)]
struct Args {
    /// Config file (default: ~/.config/blogger-import/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database file (default: ~/.config/blogger-import/blog.db)
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Console verbosity: 0 silent, 1 normal, 2 detailed
    #[arg(short, long, value_name = "LEVEL")]
    verbosity: Option<u8>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import every post and comment of one Blogger blog
    Migrate(MigrateArgs),

    /// List the blogs owned by a Blogger account
    Blogs {
        /// The username to log in to Blogger with
        #[arg(long)]
        blogger_username: Option<String>,
    },

    /// Create a local author that imported entries can belong to
    AddUser {
        username: String,

        #[arg(long, default_value = "")]
        email: String,
    },
}

#[derive(ClapArgs, Debug)]
struct MigrateArgs {
    /// The username to log in to Blogger with
    #[arg(long)]
    blogger_username: Option<String>,

    /// The category to import Blogger posts to
    #[arg(long)]
    category_title: Option<String>,

    /// The id of the Blogger blog to import
    #[arg(long)]
    blogger_blog_id: Option<String>,

    /// All imported entries belong to this local user
    #[arg(long)]
    author: Option<String>,
}

async fn open_database(path: &Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: The blog database is in use by another process. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

async fn login(config: &Config, username: Option<&str>) -> Result<BloggerClient> {
    let http = http_client().context("Failed to build HTTP client")?;
    let client = session::authenticate(
        &mut ConsolePrompt,
        http,
        &config.endpoints(),
        username,
        Some(config.request_timeout()),
    )
    .await?;
    Ok(client)
}

async fn migrate(config: &Config, db: &Database, args: MigrateArgs, verbosity: u8) -> Result<()> {
    let username = args
        .blogger_username
        .as_deref()
        .or(config.blogger_username.as_deref());
    let client = login(config, username).await?;

    let options = SessionOptions {
        category_title: args.category_title.or_else(|| config.category_title.clone()),
        blog_id: args.blogger_blog_id.or_else(|| config.blog_id.clone()),
        author: args.author.or_else(|| config.author.clone()),
        site_domain: config.site_domain.clone(),
        site_name: config.site_name.clone(),
    };
    let plan = session::prepare(&client, db, &mut ConsolePrompt, &options).await?;

    let mut migrator = Migrator::new(&client, db, Reporter::stdout(verbosity));
    let summary = migrator.run(&plan).await?;
    if summary.failed > 0 {
        eprintln!(
            "Warning: {} post(s) could not be imported; see the lines marked Failed above.",
            summary.failed
        );
    }
    Ok(())
}

async fn list_blogs(config: &Config, username: Option<String>) -> Result<()> {
    let username = username.or_else(|| config.blogger_username.clone());
    let client = login(config, username.as_deref()).await?;

    let mut blogs = client.blogs();
    while let Some(blog) = blogs.try_next().await.context("Failed to list blogs")? {
        println!("{}  {}", blog.id, blog.title);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries the migration report
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let verbosity = args.verbosity.unwrap_or(config.verbosity);

    let db_path = match args.database.clone().or_else(|| config.database_path.clone()) {
        Some(path) => path,
        None => {
            ensure_config_dir(&config_dir)?;
            config_dir.join("blog.db")
        }
    };

    match args.command {
        Command::Migrate(migrate_args) => {
            let db = open_database(&db_path).await?;
            migrate(&config, &db, migrate_args, verbosity).await?;
        }
        Command::Blogs { blogger_username } => {
            list_blogs(&config, blogger_username).await?;
        }
        Command::AddUser { username, email } => {
            let db = open_database(&db_path).await?;
            let user = db
                .create_user(&username, &email)
                .await
                .context("Failed to create user")?;
            println!("Created user {} (id {})", user.username, user.id);
        }
    }

    Ok(())
}
