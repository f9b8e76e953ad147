mod file_config;

pub use file_config::FileConfig;

use crate::admin::{DEFAULT_ACCESS_CODE, SESSION_STORAGE_KEY};
use crate::catalog_store::CATALOG_STORAGE_KEY;
use crate::storage::DEFAULT_MAX_PAYLOAD_BYTES;
use crate::sync::{SyncConfig, DEFAULT_POLL_INTERVAL};
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub catalog_key: String,
    pub session_key: String,
    pub poll_interval_ms: u64,
    pub access_code: String,
    pub log_level: String,
    pub max_payload_bytes: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            catalog_key: CATALOG_STORAGE_KEY.to_string(),
            session_key: SESSION_STORAGE_KEY.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            access_code: DEFAULT_ACCESS_CODE.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub catalog_key: String,
    pub session_key: String,
    pub poll_interval: Duration,
    pub access_code: String,
    pub log_level: tracing::Level,
    pub max_payload_bytes: usize,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let catalog_key = file.catalog_key.unwrap_or_else(|| cli.catalog_key.clone());
        let session_key = file.session_key.unwrap_or_else(|| cli.session_key.clone());
        if catalog_key.trim().is_empty() || session_key.trim().is_empty() {
            bail!("Storage keys must not be empty");
        }
        if catalog_key == session_key {
            bail!("catalog_key and session_key must differ, both are '{}'", catalog_key);
        }

        let poll_interval_ms = file.poll_interval_ms.unwrap_or(cli.poll_interval_ms);
        if poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }

        let access_code = file.access_code.unwrap_or_else(|| cli.access_code.clone());
        if access_code.trim().is_empty() {
            bail!("access_code must not be empty");
        }

        let log_level_name = file.log_level.unwrap_or_else(|| cli.log_level.clone());
        let log_level = log_level_name
            .parse::<tracing::Level>()
            .map_err(|_| anyhow::anyhow!("Invalid log_level: {}", log_level_name))?;

        let max_payload_bytes = file.max_payload_bytes.unwrap_or(cli.max_payload_bytes);
        if max_payload_bytes == 0 {
            bail!("max_payload_bytes must be greater than zero");
        }

        Ok(Self {
            db_path,
            catalog_key,
            session_key,
            poll_interval: Duration::from_millis(poll_interval_ms),
            access_code,
            log_level,
            max_payload_bytes,
        })
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            poll_interval: self.poll_interval,
            catalog_key: self.catalog_key.clone(),
        }
    }
}
