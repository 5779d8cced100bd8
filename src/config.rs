//! Configuration loading and management for tomecast.
//!
//! Loads settings from `tomecast.toml` with environment variable overrides.
//! Every section is optional; a missing file yields the defaults.

use crate::backend::DEFAULT_BACKEND_URL;
use crate::catalog::{DEFAULT_COVER_PATTERN, DEFAULT_SEARCH_URL};
use crate::language::{Language, UnknownLanguage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE: &str = "tomecast.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid TOMECAST_LANGUAGE: {0}")]
    Language(#[from] UnknownLanguage),
}

/// Summariser backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base address of the summariser service
    pub url: String,
}

/// Book catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub search_url: String,
    /// Cover image URL with an `{id}` placeholder
    pub cover_url: String,
}

/// Per-session preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Initially selected summary language
    pub language: Language,
    /// Where `summary.txt` and `summary.mp3` are saved
    pub download_dir: PathBuf,
    /// Command used to play narration, e.g. "mpv" or "afplay"
    pub player: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds, unset means transport defaults
    pub timeout_secs: Option<u64>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub catalog: CatalogConfig,
    pub session: SessionConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from the default location (tomecast.toml in cwd or home)
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::parse_file(&path)?,
            None => Config::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::parse_file(path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override values from environment variables
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = var("TOMECAST_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(code) = var("TOMECAST_LANGUAGE") {
            self.session.language = code.parse()?;
        }
        Ok(())
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        let home_config = dirs::home_dir()?
            .join(".config")
            .join("tomecast")
            .join(CONFIG_FILE);
        home_config.exists().then_some(home_config)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            cover_url: DEFAULT_COVER_PATTERN.to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: Language::En,
            download_dir: PathBuf::from("."),
            player: None,
        }
    }
}
