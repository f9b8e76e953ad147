use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Storage
    pub db_path: Option<String>,
    pub catalog_key: Option<String>,
    pub max_payload_bytes: Option<usize>,

    // Views
    pub poll_interval_ms: Option<u64>,

    // Admin
    pub session_key: Option<String>,
    pub access_code: Option<String>,

    pub log_level: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.toml");
        std::fs::write(&path, "poll_interval_ms = 250\naccess_code = \"OPEN\"\n").unwrap();

        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.poll_interval_ms, Some(250));
        assert_eq!(config.access_code.as_deref(), Some("OPEN"));
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.toml");
        std::fs::write(&path, "poll_interval_ms = \"soon\"").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/catalog.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
