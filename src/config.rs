use std::path::PathBuf;

use tracing::trace;

use crate::target::TargetSpec;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./targets.db")
}

/// Capacity of the rolling per-target histories
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct HistoryLimits {
    #[serde(default = "default_latency_samples")]
    pub latency_samples: usize,

    #[serde(default = "default_status_events")]
    pub status_events: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            latency_samples: default_latency_samples(),
            status_events: default_status_events(),
        }
    }
}

fn default_latency_samples() -> usize {
    50
}

fn default_status_events() -> usize {
    100
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Global polling interval in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Upper bound for a single HTTP exchange in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    #[serde(default)]
    pub history: HistoryLimits,

    /// Targets to seed on startup (skipped when an identical address is already stored)
    #[serde(default)]
    pub targets: Vec<TargetSpec>,

    /// Storage configuration (optional - defaults to in-memory)
    pub storage: Option<StorageConfig>,

    /// Where down notifications are delivered
    pub alert: Option<Alert>,

    /// Remote diagnosis service
    pub diagnosis: Option<DiagnosisConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            http_timeout: default_http_timeout(),
            history: HistoryLimits::default(),
            targets: vec![],
            storage: None,
            alert: None,
            diagnosis: None,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    Discord(Discord),
    Webhook(Webhook),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DiagnosisConfig {
    pub url: String,
    pub token: Option<String>,
    #[serde(default = "default_diagnosis_timeout")]
    pub timeout: u64,
}

fn default_interval() -> u64 {
    60
}

fn default_http_timeout() -> u64 {
    30
}

fn default_diagnosis_timeout() -> u64 {
    60
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content)
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
