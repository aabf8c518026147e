//! Mediastore CLI: drive the configured storage disks from the shell.
//!
//! Disks are read from STORAGE_DEFAULT, STORAGE_DISKS and STORAGE_<ALIAS>_* (a
//! `.env` file is honoured). Output is JSON on stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use mediastore_cli::{init_tracing, zip_urls};
use mediastore_core::StorageConfig;
use mediastore_storage::create_manager;
use serde::Serialize;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mediastore", about = "Mediastore storage CLI")]
struct Cli {
    /// Storage alias to use instead of STORAGE_DEFAULT
    #[arg(long, global = true)]
    storage: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file under the given key
    Put {
        /// Path to the file to upload
        file: std::path::PathBuf,
        /// Storage key
        key: String,
    },
    /// Delete one or more keys
    Delete {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Check whether a key exists
    Exists { key: String },
    /// Check whether a key is missing
    Missing { key: String },
    /// Direct URLs for public disks
    Url {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Signed URLs for private disks
    SignedUrl {
        #[arg(required = true)]
        keys: Vec<String>,
        /// Lifetime of each URL in seconds
        #[arg(long, default_value = "900")]
        expiry_secs: u64,
    },
    /// List configured disks
    Disks,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = StorageConfig::from_env().context("Failed to load storage configuration")?;
    let manager = create_manager(&config)
        .await
        .context("Failed to initialise storage disks")?;
    let manager = match cli.storage.as_deref() {
        Some(alias) => manager.storage(alias)?,
        None => manager,
    };

    match cli.command {
        Commands::Put { file, key } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let url = manager.put(&key, data.into()).await?;
            print_json(&serde_json::json!({ "key": key, "url": url }))?;
        }
        Commands::Delete { keys } => {
            manager.delete_many(&keys).await?;
            print_json(&serde_json::json!({ "deleted": keys }))?;
        }
        Commands::Exists { key } => {
            let exists = manager.exists(&key).await?;
            print_json(&serde_json::json!({ "key": key, "exists": exists }))?;
        }
        Commands::Missing { key } => {
            let missing = manager.missing(&key).await?;
            print_json(&serde_json::json!({ "key": key, "missing": missing }))?;
        }
        Commands::Url { keys } => {
            let urls = manager.get_urls(&keys).await?;
            print_json(&zip_urls(&keys, urls))?;
        }
        Commands::SignedUrl { keys, expiry_secs } => {
            let urls = manager
                .get_signed_urls(&keys, Duration::from_secs(expiry_secs))
                .await?;
            print_json(&zip_urls(&keys, urls))?;
        }
        Commands::Disks => {
            let disks: Vec<_> = config
                .disks
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "alias": d.alias,
                        "backend": d.backend,
                        "visibility": d.visibility,
                        "default": d.alias == config.default_alias,
                    })
                })
                .collect();
            print_json(&disks)?;
        }
    }

    Ok(())
}
