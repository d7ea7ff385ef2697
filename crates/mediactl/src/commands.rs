//! CLI command implementations

use anyhow::{bail, Context, Result};
use mediaconf::{ConfigSources, MediaConfig};
use mediastore::{paginate, save_batch, FileStorage, FileStore, StoreConfig, Upload, UploadSource};
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

/// Marker argument that reads an upload from stdin.
pub const STDIN_MARKER: &str = "-";

/// Map the loaded configuration onto store settings.
pub fn store_config(config: &MediaConfig) -> StoreConfig {
    StoreConfig::with_root(&config.storage.root_path)
        .max_file_size(config.storage.max_file_size)
        .max_folder_depth(config.storage.max_folder_depth)
        .block_extensions(&config.storage.blocked_extensions)
}

/// Open the filesystem store described by `config`.
pub fn open_store(config: &MediaConfig) -> Result<FileStore> {
    FileStore::new(store_config(config)).with_context(|| {
        format!(
            "Failed to open storage at {}",
            config.storage.root_path.display()
        )
    })
}

/// Open every local file (or buffer stdin) as a named upload source.
pub fn read_sources(
    files: &[PathBuf],
    stdin_name: &str,
    stdin: &mut dyn Read,
) -> Result<Vec<(String, Box<dyn UploadSource>)>> {
    let mut sources: Vec<(String, Box<dyn UploadSource>)> = Vec::with_capacity(files.len());

    for path in files {
        if path == Path::new(STDIN_MARKER) {
            let mut buffer = Vec::new();
            stdin
                .read_to_end(&mut buffer)
                .context("Failed to read upload from stdin")?;
            let content: Box<dyn UploadSource> = Box::new(Cursor::new(buffer));
            sources.push((stdin_name.to_string(), content));
            continue;
        }

        let Some(name) = path.file_name() else {
            bail!("Not a file: {}", path.display());
        };
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let content: Box<dyn UploadSource> = Box::new(file);
        sources.push((name.to_string_lossy().into_owned(), content));
    }

    Ok(sources)
}

/// Save a batch of uploads under `dest` and print one JSON line per stored file.
pub fn save(
    storage: &dyn FileStorage,
    dest: &str,
    sources: &mut [(String, Box<dyn UploadSource>)],
    out: &mut impl Write,
) -> Result<usize> {
    let uploads = sources
        .iter_mut()
        .map(|(name, content)| Upload::new(name.clone(), &mut **content));

    let saved = save_batch(storage, dest, uploads).context("Upload failed")?;

    for meta in &saved {
        writeln!(out, "{}", serde_json::to_string(meta)?)?;
    }
    if saved.len() < sources.len() {
        tracing::warn!(
            skipped = sources.len() - saved.len(),
            max = storage.max_file_size(),
            "some files exceeded the size limit and were not stored"
        );
    }

    Ok(saved.len())
}

/// Print one page of a folder listing as a JSON array.
pub fn list(
    storage: &dyn FileStorage,
    path: &str,
    start: usize,
    count: usize,
    out: &mut impl Write,
) -> Result<()> {
    let entries = storage
        .list(path)
        .with_context(|| format!("Failed to list '{}'", path))?;
    let page = paginate(entries, start, count);

    writeln!(out, "{}", serde_json::to_string_pretty(&page)?)?;
    Ok(())
}

/// Print the resolved config as TOML, followed by where it came from.
pub fn show_config(
    config: &MediaConfig,
    sources: &ConfigSources,
    out: &mut impl Write,
) -> Result<()> {
    write!(out, "{}", config.to_toml())?;

    writeln!(out)?;
    if sources.files.is_empty() {
        writeln!(out, "# No config files found, using defaults")?;
    } else {
        writeln!(out, "# Loaded from:")?;
        for file in &sources.files {
            writeln!(out, "#   {}", file.display())?;
        }
    }
    if !sources.env_overrides.is_empty() {
        writeln!(out, "# Environment overrides:")?;
        for var in &sources.env_overrides {
            writeln!(out, "#   {}", var)?;
        }
    }

    Ok(())
}

/// Drop all stored content. Refuses unless `confirmed`.
pub fn purge(store: &FileStore, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!(
            "Refusing to delete everything under {} without --yes",
            store.root().display()
        );
    }
    store.purge().context("Failed to purge storage")?;
    Ok(())
}
