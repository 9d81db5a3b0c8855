//! # Configuration File Parser
//!
//! Reads and parses `cpakit.toml`, the optional configuration file that
//! supplies defaults for the CLI flags. Supports:
//!
//! - `[metadata]`: path to the metadata document
//! - `[data]`: directory holding the table files, if not next to the metadata
//! - `[model]`: model kind and marginal distribution
//! - `[output]`: where `cpakit model` writes its report
//!
//! Example `cpakit.toml`:
//!
//! ```toml
//! [metadata]
//! path = "data/metadata.json"
//!
//! [data]
//! dir = "data/2024-q4"
//!
//! [model]
//! kind = "gaussian_copula"
//! distribution = "uniform"
//!
//! [output]
//! report = "models/report.json"
//! ```
//!
//! Relative paths resolve against the directory containing `cpakit.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CpaError, Result};
use crate::model::ModelConfig;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "cpakit.toml";

/// Top-level cpakit.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CpaConfig {
    pub metadata: MetadataConfig,
    pub data: DataConfig,
    pub model: ModelConfig,
    pub output: OutputConfig,

    /// Absolute path to the directory containing cpakit.toml.
    ///
    /// Populated by `read_config()`.
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Path to the metadata JSON document.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory table files resolve against instead of the metadata's own.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report file written by `cpakit model`.
    pub report: Option<PathBuf>,
}

/// Read and parse a cpakit.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed.
pub fn read_config(dir: &Path) -> Result<Option<CpaConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| CpaError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let mut config: CpaConfig = toml::from_str(&content).map_err(|e| CpaError::Config {
        message: format!("Failed to parse {}: {}", path.display(), e),
    })?;

    config.config_dir = Some(std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));
    config.validate()?;

    Ok(Some(config))
}

impl CpaConfig {
    /// Reject settings serde accepts but that can never work.
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("metadata.path", &self.metadata.path),
            ("data.dir", &self.data.dir),
            ("output.report", &self.output.report),
        ];
        for (key, path) in paths {
            if matches!(path, Some(p) if p.as_os_str().is_empty()) {
                return Err(CpaError::Config {
                    message: format!("{} is set but empty. Remove it or give a path.", key),
                });
            }
        }
        Ok(())
    }

    pub fn metadata_path(&self) -> Option<PathBuf> {
        self.metadata.path.as_deref().map(|p| self.resolve(p))
    }

    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data.dir.as_deref().map(|p| self.resolve(p))
    }

    pub fn report_path(&self) -> Option<PathBuf> {
        self.output.report.as_deref().map(|p| self.resolve(p))
    }

    /// Resolve `path` against the config file's directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        match self.config_dir {
            Some(ref dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
