//! TOML configuration.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [db]
//! path = "./data/intake.sqlite"
//!
//! [fetch]
//! user_agent = "Mozilla/5.0 (compatible; IntakeHarness/0.1)"
//! timeout_secs = 10
//!
//! [budget]
//! max_chars_per_source = 5000
//! max_documents = 5
//! deadline_secs = 25
//!
//! [storage]
//! backend = "fs"
//! root = "./data/blobs"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/intake.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; IntakeHarness/0.1)".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct BudgetConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars_per_source: usize,
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_chars_per_source: default_max_chars(),
            max_documents: default_max_documents(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

impl BudgetConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

fn default_max_chars() -> usize {
    5000
}
fn default_max_documents() -> usize {
    5
}
fn default_deadline_secs() -> u64 {
    25
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_blob_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: default_blob_root(),
            bucket: None,
            region: default_region(),
            endpoint_url: None,
            prefix: String::new(),
        }
    }
}

fn default_backend() -> String {
    "fs".to_string()
}
fn default_blob_root() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Built-in defaults, for commands that run without a config file.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.budget.max_chars_per_source == 0 {
            anyhow::bail!("budget.max_chars_per_source must be > 0");
        }
        if self.budget.max_documents == 0 {
            anyhow::bail!("budget.max_documents must be > 0");
        }
        if self.budget.deadline_secs == 0 {
            anyhow::bail!("budget.deadline_secs must be > 0");
        }
        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be > 0");
        }

        match self.storage.backend.as_str() {
            "fs" => {}
            "s3" => {
                if self.storage.bucket.as_deref().is_none_or(str::is_empty) {
                    anyhow::bail!("storage.bucket must be set when backend is 's3'");
                }
            }
            other => anyhow::bail!(
                "Unknown storage backend: '{}'. Must be fs or s3.",
                other
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// [`load_config`] when `path` exists, [`Config::minimal`] otherwise.
pub fn load_config_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}
