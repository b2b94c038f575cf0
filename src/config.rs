use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::blob::DEFAULT_BLOCK_SIZE;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DownloadConfig {
    /// Maximum bytes requested per blob block.
    #[serde(default = "default_block_size")]
    pub block_size: u64,
    /// Overall deadline for one blob download, in seconds. Unset means no
    /// deadline.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_block_size() -> u64 {
    DEFAULT_BLOCK_SIZE
}

impl Default for DownloadConfig {
    fn default() -> Self {
        DownloadConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "crmlink", "crmlink")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
store:
  base_url: "http://localhost:8080"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.store.base_url, "http://localhost:8080");
        assert_eq!(config.download.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.download.timeout_secs, None);

        let yaml_str_with_download = r#"
store:
  base_url: "http://store.example.com/"
download:
  block_size: 1048576
  timeout_secs: 30
"#;
        let config: AppConfig =
            serde_yaml::from_str(yaml_str_with_download).expect("Failed to deserialize");
        assert_eq!(config.download.block_size, 1_048_576);
        assert_eq!(config.download.timeout_secs, Some(30));
    }

    #[test]
    fn test_load_from_path() {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        fs::write(
            config_file.path(),
            "store:\n  base_url: \"http://localhost:9999\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from_path(config_file.path()).unwrap();
        assert_eq!(config.store.base_url, "http://localhost:9999");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = AppConfig::load_from_path("/nonexistent/config.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
