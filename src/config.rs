//! Configuration system for petty.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `~/.config/petty/config.toml`
//! 3. **Environment variables** - `PETTY_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [paths]
//! db = "~/.local/share/petty/petty.db"
//!
//! [mastodon]
//! server_url = "https://mastodon.social"
//! access_token = "your-access-token-here"
//!
//! [output]
//! format = "text"
//! colors = true
//! ```

use crate::error::{PettyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure for petty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path-related configuration.
    pub paths: PathsConfig,
    /// Remote server credentials.
    pub mastodon: MastodonConfig,
    /// Output formatting configuration.
    pub output: OutputConfig,
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Path to the `SQLite` database file.
    /// Environment variable: `PETTY_DB`
    pub db: Option<PathBuf>,
}

/// Server and credentials used by the account fetcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MastodonConfig {
    /// Environment variable: `PETTY_SERVER_URL`
    pub server_url: Option<String>,
    /// Environment variable: `PETTY_ACCESS_TOKEN`
    pub access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format: text, json, json-pretty, csv.
    pub format: String,

    /// Enable colored output.
    pub colors: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            colors: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. User config file (~/.config/petty/config.toml)
    /// 3. Compiled defaults
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::user_config_path().and_then(|p| Self::load_from_file(&p))
        {
            config.merge(user_config);
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());

        debug!("Configuration loaded: {:?}", config.redacted());
        config
    }

    /// Load configuration from a specific file.
    ///
    /// A missing or unparsable file yields `None`; parse problems are logged.
    #[must_use]
    pub fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return None;
        }

        match Self::read_file(path) {
            Ok(config) => {
                info!("Loaded config from: {}", path.display());
                Some(config)
            }
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    }

    /// Read and parse a config file, reporting why it failed.
    ///
    /// # Errors
    ///
    /// Returns [`PettyError::ConfigError`] if the file cannot be read or is
    /// not valid TOML.
    pub fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PettyError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| PettyError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("petty").join("config.toml"))
    }

    /// Apply environment overrides read through `var`.
    fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = var("PETTY_DB") {
            self.paths.db = Some(PathBuf::from(db));
        }
        if let Some(url) = var("PETTY_SERVER_URL") {
            self.mastodon.server_url = Some(url);
        }
        if let Some(token) = var("PETTY_ACCESS_TOKEN") {
            self.mastodon.access_token = Some(token);
        }
        if let Some(format) = var("PETTY_FORMAT") {
            self.output.format = format;
        }
        if var("PETTY_NO_COLOR").is_some() || var("NO_COLOR").is_some() {
            self.output.colors = false;
        }
    }

    /// Merge another config into this one (other takes precedence).
    fn merge(&mut self, other: Self) {
        if other.paths.db.is_some() {
            self.paths.db = other.paths.db;
        }

        let mastodon = other.mastodon;
        if mastodon.server_url.is_some() {
            self.mastodon.server_url = mastodon.server_url;
        }
        if mastodon.access_token.is_some() {
            self.mastodon.access_token = mastodon.access_token;
        }
        if mastodon.client_id.is_some() {
            self.mastodon.client_id = mastodon.client_id;
        }
        if mastodon.client_secret.is_some() {
            self.mastodon.client_secret = mastodon.client_secret;
        }

        self.output = other.output;
    }

    /// Check the server settings.
    ///
    /// # Errors
    ///
    /// Returns [`PettyError::InvalidConfig`] if the server URL is empty or not
    /// http(s), or if `require_access_token` is set and no token is present.
    pub fn validate(&self, require_access_token: bool) -> Result<()> {
        let url = self
            .mastodon
            .server_url
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if url.is_empty() {
            return Err(PettyError::invalid_config("mastodon.server_url cannot be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PettyError::invalid_config(
                "mastodon.server_url must start with http:// or https://",
            ));
        }

        let has_token = self
            .mastodon
            .access_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if require_access_token && !has_token {
            return Err(PettyError::invalid_config(
                "mastodon.access_token cannot be empty",
            ));
        }

        Ok(())
    }

    /// Get the database path, using defaults if not configured.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.paths.db.clone().unwrap_or_else(crate::default_db_path)
    }

    /// Copy with secrets masked, for display and logs.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |value: &Option<String>| value.as_ref().map(|_| "********".to_string());
        let mut copy = self.clone();
        copy.mastodon.access_token = mask(&self.mastodon.access_token);
        copy.mastodon.client_secret = mask(&self.mastodon.client_secret);
        copy
    }

    /// Save the configuration to `path`, creating parent directories.
    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PettyError::path_error("create directory", parent, e))?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| PettyError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        std::fs::write(path, content).map_err(|e| PettyError::path_error("write", path, e))?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Write a sample config with placeholder credentials to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PettyError::ConfigError`] if a file already exists there.
    pub fn write_sample(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(PettyError::ConfigError {
                path: path.to_path_buf(),
                reason: "configuration file already exists".to_string(),
            });
        }
        Self::sample().save_to(path)
    }

    fn sample() -> Self {
        Self {
            mastodon: MastodonConfig {
                server_url: Some("https://mastodon.social".to_string()),
                access_token: Some("your-access-token-here".to_string()),
                ..MastodonConfig::default()
            },
            ..Self::default()
        }
    }
}
