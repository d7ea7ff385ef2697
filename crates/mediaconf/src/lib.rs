//! Configuration loading for the media store.
//!
//! # Usage
//!
//! ```rust,no_run
//! use mediaconf::MediaConfig;
//!
//! let config = MediaConfig::load().expect("Failed to load config");
//! println!("Storage root: {}", config.storage.root_path.display());
//! println!("Max upload: {} bytes", config.storage.max_file_size);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/mediastore/config.toml` (system)
//! 2. `~/.config/mediastore/config.toml` (user)
//! 3. `./mediastore.toml` or the `--config` path (local override)
//! 4. Environment variables (`MEDIASTORE_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [storage]
//! root_path = "$HOME/media"
//! max_file_size = 524288000
//! max_folder_depth = 16
//! blocked_extensions = [".exe", ".bat"]
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, expand_path, ConfigSources};
pub use settings::{StorageSettings, TelemetrySettings};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete media store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MediaConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl MediaConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/mediastore/config.toml`
    /// 3. `~/.config/mediastore/config.toml`
    /// 4. `./mediastore.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with `config_path` standing in for the local
    /// `./mediastore.toml`. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = MediaConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_from_file(&path, &mut config)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let quote = |s: &str| toml::Value::String(s.to_string()).to_string();
        let mut output = String::new();

        output.push_str("# Media store configuration\n\n");

        output.push_str("[storage]\n");
        output.push_str(&format!(
            "root_path = {}\n",
            quote(&self.storage.root_path.to_string_lossy())
        ));
        output.push_str(&format!("max_file_size = {}\n", self.storage.max_file_size));
        output.push_str(&format!(
            "max_folder_depth = {}\n",
            self.storage.max_folder_depth
        ));
        let blocked: Vec<_> = self
            .storage
            .blocked_extensions
            .iter()
            .map(|e| quote(e))
            .collect();
        output.push_str(&format!("blocked_extensions = [{}]\n", blocked.join(", ")));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            quote(&self.telemetry.log_level)
        ));

        output
    }
}
