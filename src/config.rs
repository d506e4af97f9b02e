use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::store::StoreSettings;

pub const DATA_DIR_ENV: &str = "SNIPVAULT_DATA_DIR";
pub const LOG_ENV: &str = "SNIPVAULT_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where collections are stored. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Filter directive used when `SNIPVAULT_LOG` is unset.
    pub log_level: String,
    pub default_folder_name: String,
    pub cleanup_on_open: bool,
}

impl Default for Config {
    fn default() -> Self {
        let settings = StoreSettings::default();
        Self {
            data_dir: None,
            log_level: String::from("warn"),
            default_folder_name: settings.default_folder_name,
            cleanup_on_open: settings.cleanup_on_open,
        }
    }
}

impl Config {
    /// `<config dir>/snipvault/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("snipvault").join("config.toml"))
    }

    /// Read the config file at `path`, falling back to defaults when it does
    /// not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(text)?;
        if config.default_folder_name.trim().is_empty() {
            config.default_folder_name = Self::default().default_folder_name;
        }
        Ok(config)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in practice.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            default_folder_name: self.default_folder_name.clone(),
            cleanup_on_open: self.cleanup_on_open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_folder_name, "Snippets");
        assert!(config.cleanup_on_open);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse("log_level = \"debug\"\ncleanup_on_open = false\n").unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(!config.cleanup_on_open);
        assert_eq!(config.default_folder_name, "Snippets");
    }

    #[test]
    fn blank_default_folder_name_falls_back() {
        let config = Config::parse("default_folder_name = \"  \"").unwrap();
        assert_eq!(config.default_folder_name, "Snippets");
    }

    #[test]
    fn bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "cleanup_on_open = maybe").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn env_overrides_data_dir() {
        let config = Config::default().with_env(|key| {
            (key == DATA_DIR_ENV).then(|| String::from("/tmp/vault"))
        });
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/vault")));

        let untouched = Config::default().with_env(|_| Some(String::from(" ")));
        assert_eq!(untouched.data_dir, None);
    }
}
