//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, MediaConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/mediastore/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config on Linux, the platform equivalent elsewhere
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("mediastore/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("mediastore.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Overlay the values set in a TOML file onto `config`.
pub fn load_from_file(path: &Path, config: &mut MediaConfig) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(&contents, path, config)
}

/// Overlay the keys present in `contents`; absent keys keep their value.
pub(crate) fn apply_toml(
    contents: &str,
    path: &Path,
    config: &mut MediaConfig,
) -> Result<(), ConfigError> {
    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let table: toml::Table = contents
        .parse()
        .map_err(|e: toml::de::Error| parse_error(e.to_string()))?;

    if let Some(storage) = table.get("storage").and_then(|v| v.as_table()) {
        if let Some(v) = storage.get("root_path") {
            let raw = v
                .as_str()
                .ok_or_else(|| parse_error("storage.root_path must be a string".into()))?;
            config.storage.root_path = expand_path(raw);
        }
        if let Some(v) = storage.get("max_file_size") {
            config.storage.max_file_size = v
                .as_integer()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| {
                    parse_error("storage.max_file_size must be a non-negative integer".into())
                })?;
        }
        if let Some(v) = storage.get("max_folder_depth") {
            config.storage.max_folder_depth = v
                .as_integer()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    parse_error("storage.max_folder_depth must be a non-negative integer".into())
                })?;
        }
        if let Some(v) = storage.get("blocked_extensions") {
            config.storage.blocked_extensions = if let Some(list) = v.as_str() {
                split_list(list)
            } else if let Some(items) = v.as_array() {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            } else {
                return Err(parse_error(
                    "storage.blocked_extensions must be a list of strings".into(),
                ));
            };
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut MediaConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from any key lookup. Unparseable numbers are ignored.
pub(crate) fn apply_overrides_from<F>(
    config: &mut MediaConfig,
    sources: &mut ConfigSources,
    lookup: F,
) where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("MEDIASTORE_ROOT_PATH") {
        config.storage.root_path = expand_path_with(&v, &lookup);
        sources.env_overrides.push("MEDIASTORE_ROOT_PATH".to_string());
    }
    if let Some(v) = lookup("MEDIASTORE_MAX_FILE_SIZE") {
        if let Ok(size) = v.trim().parse() {
            config.storage.max_file_size = size;
            sources.env_overrides.push("MEDIASTORE_MAX_FILE_SIZE".to_string());
        }
    }
    if let Some(v) = lookup("MEDIASTORE_MAX_FOLDER_DEPTH") {
        if let Ok(depth) = v.trim().parse() {
            config.storage.max_folder_depth = depth;
            sources.env_overrides.push("MEDIASTORE_MAX_FOLDER_DEPTH".to_string());
        }
    }
    if let Some(v) = lookup("MEDIASTORE_BLOCKED_EXTENSIONS") {
        config.storage.blocked_extensions = split_list(&v);
        sources.env_overrides.push("MEDIASTORE_BLOCKED_EXTENSIONS".to_string());
    }

    if let Some(v) = lookup("MEDIASTORE_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("MEDIASTORE_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand `~/` and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    expand_path_with(path, |key| env::var(key).ok())
}

fn expand_path_with<F>(path: &str, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_vars(path, &lookup);
    if let Some(stripped) = expanded.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(stripped);
        }
    }
    PathBuf::from(expanded)
}

/// Replace `$VAR`, `${VAR}` and `%VAR%` references.
///
/// Unknown variables and malformed references are left as written.
pub fn expand_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(['$', '%']) {
        out.push_str(&rest[..pos]);
        let marker = &rest[pos..];

        let (name, consumed) = if let Some(braced) = marker.strip_prefix("${") {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 3),
                None => ("", 0),
            }
        } else if let Some(percent) = marker.strip_prefix('%') {
            match percent.find('%') {
                Some(end) if is_var_name(&percent[..end]) => (&percent[..end], end + 2),
                _ => ("", 0),
            }
        } else {
            let bare = &marker[1..];
            let end = bare
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(bare.len());
            (&bare[..end], end + 1)
        };

        match (is_var_name(name), lookup(name)) {
            (true, Some(value)) => {
                out.push_str(&value);
                rest = &marker[consumed..];
            }
            _ => {
                out.push_str(&marker[..1]);
                rest = &marker[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_var_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
