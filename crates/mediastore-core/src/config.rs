//! Configuration module
//!
//! Storage disks are declared through environment variables. `STORAGE_DISKS`
//! lists the aliases, and every alias reads its own `STORAGE_<ALIAS>_*`
//! variables. `STORAGE_DEFAULT` selects the alias a manager starts on.

use std::env;
use std::time::Duration;

use crate::storage_types::{StorageBackend, Visibility};

// Common constants
const DEFAULT_ALIAS: &str = "default";
const DEFAULT_REGION: &str = "us-east-1";
const SIGNED_URL_EXPIRY_SECS: u64 = 900;
const LOCAL_STORAGE_PATH: &str = "./storage";
const LOCAL_STORAGE_BASE_URL: &str = "http://localhost:3000/storage";

/// Configuration for one named storage disk
#[derive(Clone, Debug)]
pub struct DiskConfig {
    pub alias: String,
    pub backend: StorageBackend,
    pub visibility: Visibility,
    // S3-compatible settings
    pub bucket: Option<String>,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, R2, etc.)
    pub use_ssl: bool,
    pub signed_url_expiry: Duration,
    // Local filesystem settings
    pub local_path: String,
    pub local_base_url: String,
}

/// Storage configuration: every declared disk plus the default alias
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub default_alias: String,
    pub disks: Vec<DiskConfig>,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_alias = lookup("STORAGE_DEFAULT")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ALIAS.to_string());

        let aliases: Vec<String> = match lookup("STORAGE_DISKS") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => vec![default_alias.clone()],
        };

        if aliases.is_empty() {
            return Err(anyhow::anyhow!("STORAGE_DISKS must name at least one disk"));
        }

        let mut disks: Vec<DiskConfig> = Vec::with_capacity(aliases.len());
        for alias in aliases {
            if disks.iter().any(|d| d.alias == alias) {
                return Err(anyhow::anyhow!("Storage disk '{}' is declared twice", alias));
            }
            disks.push(DiskConfig::from_lookup(&alias, &lookup)?);
        }

        tracing::debug!(
            default_alias = %default_alias,
            disks = disks.len(),
            "Loaded storage configuration"
        );

        Ok(StorageConfig {
            default_alias,
            disks,
        })
    }

    pub fn disk(&self, alias: &str) -> Option<&DiskConfig> {
        self.disks.iter().find(|d| d.alias == alias)
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.disks.iter().map(|d| d.alias.as_str()).collect()
    }
}

impl DiskConfig {
    fn from_lookup<F>(alias: &str, lookup: &F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = env_prefix(alias);
        let non_empty = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let var = |suffix: &str| non_empty(&format!("{}_{}", prefix, suffix));

        let backend = match var("DRIVER") {
            Some(s) => s.parse()?,
            None => StorageBackend::Local,
        };

        let visibility = match var("VISIBILITY") {
            Some(s) => s.parse()?,
            None => Visibility::default(),
        };

        let use_ssl = match var("USE_SSL") {
            Some(s) => s.to_lowercase().parse::<bool>().map_err(|_| {
                anyhow::anyhow!("{}_USE_SSL must be true or false", prefix)
            })?,
            None => true,
        };

        let expiry_secs = match var("SIGNED_URL_EXPIRY_SECS") {
            Some(s) => s.parse::<u64>().map_err(|_| {
                anyhow::anyhow!("{}_SIGNED_URL_EXPIRY_SECS must be a valid number", prefix)
            })?,
            None => SIGNED_URL_EXPIRY_SECS,
        };

        Ok(DiskConfig {
            alias: alias.to_string(),
            backend,
            visibility,
            bucket: var("BUCKET"),
            region: var("REGION")
                .or_else(|| non_empty("AWS_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key: var("ACCESS_KEY").or_else(|| non_empty("AWS_ACCESS_KEY_ID")),
            secret_key: var("SECRET_KEY").or_else(|| non_empty("AWS_SECRET_ACCESS_KEY")),
            endpoint: var("ENDPOINT"),
            use_ssl,
            signed_url_expiry: Duration::from_secs(expiry_secs),
            local_path: var("PATH").unwrap_or_else(|| LOCAL_STORAGE_PATH.to_string()),
            local_base_url: var("BASE_URL").unwrap_or_else(|| LOCAL_STORAGE_BASE_URL.to_string()),
        })
    }
}

/// `STORAGE_<ALIAS>` with the alias uppercased and `-`/`.` folded to `_`.
fn env_prefix(alias: &str) -> String {
    let normalized: String = alias
        .chars()
        .map(|c| match c {
            '-' | '.' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    format!("STORAGE_{}", normalized)
}
