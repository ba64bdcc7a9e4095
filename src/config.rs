//! Configuration file for the `dirman` binary
//!
//! Looked up at `--config`, then `./dirman.toml`, then
//! `<config dir>/dirman/config.toml`. Every key is optional.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::ArchiveFormat;
use crate::operations::CopyOptions;

pub const CONFIG_FILE_NAME: &str = "dirman.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root directory used when `--root` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub copy: CopyOptions,

    #[serde(default)]
    pub script: ScriptConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also append logs to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Format used by `compress` when `--format` is not given
    #[serde(default)]
    pub format: ArchiveFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Interpreter for `run-script`; platform default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Places searched when no explicit config path is given
    pub fn default_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("dirman").join("config.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.archive.format, ArchiveFormat::Zip);
        assert!(config.copy.overwrite);
        assert!(config.root.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            root = "C:\\Users\\me\\Downloads"

            [archive]
            format = "tar.gz"

            [copy]
            preserve_metadata = true
            "#,
        )
        .unwrap();

        assert_eq!(config.root.as_deref(), Some(r"C:\Users\me\Downloads"));
        assert_eq!(config.archive.format, ArchiveFormat::TarGz);
        assert!(config.copy.overwrite);
        assert!(config.copy.preserve_metadata);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);

        let mut config = Config::default();
        config.root = Some("/srv/inbox".to_string());
        config.script.interpreter = Some("python3.12".to_string());
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[archive]\nformat = \"rar\"\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
