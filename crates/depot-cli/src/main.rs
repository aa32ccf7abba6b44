//! Depot CLI: run file-system operations for one user against the configured
//! database and storage backends.
//!
//! Configuration comes from the environment (see `DepotConfig::from_env`).

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use depot_cli::{human_size, removal_report, truncate_string};
use depot_core::constants::DOWNLOAD_TIMEOUT_SETTING;
use depot_core::models::Policy;
use depot_core::DepotConfig;
use depot_db::{FileStore, PgFileStore, PgSettingsStore, UserRepository};
use depot_fs::{Binding, ContentResponse, FileRef, FileSystem, FsDeps, FsOptions, OpContext};
use depot_infra::{init_telemetry, LogFormat, MemorySessionStore};
use depot_storage::{DefaultHandlerFactory, HandlerFactory};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "depot", about = "Depot file-system operations")]
struct Cli {
    /// User the operation runs as
    #[arg(long, value_name = "UUID")]
    user: Uuid,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a file's content (throttled to the user's group limit)
    Get {
        /// File UUID
        id: Uuid,
        /// Write to this path instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Read a file by physical path through the built-in local policy
    Physical {
        path: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Issue a signed link
    Sign {
        /// File UUID
        id: Uuid,
        /// Link lifetime in seconds; omit for a non-expiring link
        #[arg(long)]
        ttl: Option<u64>,
        /// Ask the browser to download instead of display
        #[arg(long)]
        download: bool,
    },
    /// Issue a download link with the configured download timeout
    DownloadUrl {
        /// File UUID
        id: Uuid,
    },
    /// Issue a non-expiring source link (policy must allow it)
    Source {
        /// File UUID
        id: Uuid,
    },
    /// Preview a file: prints the redirect or writes the content
    Preview {
        /// File UUID
        id: Uuid,
        /// Preview as editable text (size limited)
        #[arg(long)]
        text: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete files: objects first, then the records of every file whose
    /// objects are gone
    Delete {
        /// File UUIDs
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Search the user's files by name
    Search {
        /// Keywords
        #[arg(required = true)]
        terms: Vec<String>,
        /// Restrict to this folder and its subfolders
        #[arg(long)]
        root: Option<Uuid>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn write_content(
    mut content: depot_storage::BoxedContent,
    out: Option<PathBuf>,
) -> anyhow::Result<u64> {
    let copied = match out {
        Some(path) => {
            let mut file = tokio::fs::File::create(&path)
                .await
                .with_context(|| format!("Create {}", path.display()))?;
            let n = tokio::io::copy(&mut content, &mut file).await?;
            file.flush().await?;
            n
        }
        None => {
            let mut stdout = tokio::io::stdout();
            let n = tokio::io::copy(&mut content, &mut stdout).await?;
            stdout.flush().await?;
            n
        }
    };
    Ok(copied)
}

async fn build_file_system(config: &DepotConfig, user_id: Uuid) -> anyhow::Result<FileSystem> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set")?;
    let pool = depot_db::connect(database_url, config.db_max_connections).await?;

    let user = UserRepository::new(pool.clone())
        .get(user_id)
        .await?
        .with_context(|| format!("User {} not found", user_id))?;

    let handlers: Arc<dyn HandlerFactory> = Arc::new(DefaultHandlerFactory::new(config));
    let deps = FsDeps {
        files: Arc::new(PgFileStore::new(pool.clone())) as Arc<dyn FileStore>,
        settings: Arc::new(PgSettingsStore::new(pool)),
        sessions: Arc::new(MemorySessionStore::new(config.upload_session_cache_capacity)),
        handlers: handlers.clone(),
    };
    let options = FsOptions::from(config);

    if config.is_slave() {
        let policy = Policy::builtin_local();
        let handler = handlers.build(&policy).await?;
        return Ok(FileSystem::slave(
            user,
            deps,
            options,
            Binding::new(policy, handler),
        ));
    }

    Ok(FileSystem::new(user, deps, options))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let config = DepotConfig::from_env()?;
    let cli = Cli::parse();

    let fs = build_file_system(&config, cli.user).await?;
    let ctx = OpContext::default();

    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::Get { id, out } => {
            let content = fs.get_download_content(&ctx, FileRef::Id(id)).await?;
            let n = write_content(content, out).await?;
            tracing::info!(file_id = %id, bytes = n, "Download finished");
        }
        Commands::Physical { path, out } => {
            let content = fs.get_physical_content(&ctx, &path).await?;
            let n = write_content(content, out).await?;
            tracing::info!(path = %path, bytes = n, "Download finished");
        }
        Commands::Sign { id, ttl, download } => {
            let target = fs.resolve(&ctx, FileRef::Id(id)).await?;
            let url = fs
                .sign_url(&ctx, target.first(), ttl.map(Duration::from_secs), download)
                .await?;
            print_json(&serde_json::json!({ "url": url }))?;
        }
        Commands::DownloadUrl { id } => {
            let url = fs
                .get_download_url(&ctx, id, DOWNLOAD_TIMEOUT_SETTING)
                .await?;
            print_json(&serde_json::json!({ "url": url }))?;
        }
        Commands::Source { id } => {
            let url = fs.get_source(&ctx, id).await?;
            print_json(&serde_json::json!({ "url": url }))?;
        }
        Commands::Preview { id, text, out } => match fs.preview(&ctx, id, text).await? {
            ContentResponse::Redirect { url, max_age } => {
                print_json(&serde_json::json!({
                    "redirect": true,
                    "url": url,
                    "max_age": max_age.as_secs(),
                }))?;
            }
            ContentResponse::Content(content) => {
                write_content(content, out).await?;
            }
        },
        Commands::Delete { ids } => {
            let files = fs.load_files(&ids).await.context("Failed to load files")?;
            let removal = fs.remove_files(&ctx, files).await?;
            print_json(&removal_report(&removal))?;
        }
        Commands::Search {
            terms,
            root,
            format,
        } => {
            let listing = fs.search(&ctx, &terms, root).await?;
            if format == OutputFormat::Json {
                print_json(&listing.objects)?;
            } else {
                println!("{:<38} {:<40} {:<30} {:>10}", "ID", "NAME", "PATH", "SIZE");
                for object in &listing.objects {
                    println!(
                        "{:<38} {:<40} {:<30} {:>10}",
                        object.id,
                        truncate_string(&object.name, 40),
                        truncate_string(&object.path, 30),
                        human_size(object.size)
                    );
                }
                println!("{} result(s)", listing.objects.len());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "6f1c2a3e-9d4b-4c5e-8f7a-1b2c3d4e5f60";

    #[test]
    fn search_format_defaults_to_table() {
        let cli = Cli::try_parse_from(["depot", "--user", USER, "search", "report"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Search {
                format: OutputFormat::Table,
                ..
            }
        ));
    }

    #[test]
    fn search_format_accepts_json() {
        let cli = Cli::try_parse_from([
            "depot", "--user", USER, "search", "report", "--format", "json",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Search {
                format: OutputFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn unknown_search_format_is_rejected() {
        let result = Cli::try_parse_from([
            "depot", "--user", USER, "search", "report", "--format", "xml",
        ]);
        assert!(result.is_err());
    }
}
