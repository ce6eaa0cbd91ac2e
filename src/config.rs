//! Run configuration for the loader.
//!
//! The only tunable the core consumes is the batch size driving the
//! batched loader's flush threshold. It comes from a JSON config file or
//! the `--batch-size` flag; having neither is a startup error, as is a
//! non-positive value.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "loader_config.json";

/// On-disk configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    pub batch_size: usize,
}

impl LoaderConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: LoaderConfig = serde_json::from_str(&text)
            .with_context(|| format!("Malformed config file '{}'", path.display()))?;
        validate_batch_size(config.batch_size)?;
        Ok(config)
    }
}

pub fn validate_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        bail!("batch_size must be a positive integer");
    }
    Ok(())
}

/// Resolve the effective batch size: the CLI flag wins, otherwise the
/// config file (the default path unless `--config` points elsewhere).
pub fn resolve_batch_size(cli: Option<usize>, config_path: Option<&Path>) -> Result<usize> {
    if let Some(batch_size) = cli {
        validate_batch_size(batch_size)?;
        return Ok(batch_size);
    }
    let path: PathBuf = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.into());
    if !path.exists() {
        bail!(
            "No batch size configured: pass --batch-size or provide '{}'",
            path.display()
        );
    }
    Ok(LoaderConfig::from_file(&path)?.batch_size)
}
