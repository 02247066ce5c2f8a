//! Importer configuration
//!
//! Read from `<config_dir>/qnap-import/config.toml` unless a path is given.
//! Every key is optional; command line flags override file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_DIR: &str = "qnap-import";
const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub joplin: JoplinConfig,
    pub import: ImportOptions,
}

/// Connection to the Joplin Data API (Web Clipper service)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoplinConfig {
    pub base_url: String,
    /// API token from Joplin's Web Clipper options
    pub token: Option<String>,
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:41184".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for JoplinConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl JoplinConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Destination folder id; empty imports at the top level
    pub parent_folder: String,
}

impl ImportConfig {
    /// Default config file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or the default location when `None`.
    ///
    /// A missing default file yields the defaults; an explicitly named file
    /// must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => {
                    log::debug!("Loading config from {}", path.display());
                    Self::load(&path)
                }
                _ => Ok(Self::default()),
            },
        }
    }

    /// Collects all validation errors and reports them together
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        let url = self.joplin.base_url.trim();
        if url.is_empty() {
            errors.push("joplin.base_url must not be empty".to_string());
        } else if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(format!(
                "joplin.base_url must start with http:// or https:// (got '{}')",
                url
            ));
        }

        if self.joplin.timeout_secs == 0 {
            errors.push("joplin.timeout_secs must be positive".to_string());
        }

        if let Some(token) = &self.joplin.token {
            if token.trim().is_empty() {
                errors.push("joplin.token must not be blank when set".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
