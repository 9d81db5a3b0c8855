pub mod extend;
pub mod graph;
pub mod inspect;
pub mod model;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use cpakit_core::config::{read_config, CpaConfig};
use cpakit_core::model::ModelConfig;
use cpakit_core::schema::Metadata;

use crate::args::{ModelOptions, SourceArgs};

/// Optional `cpakit.toml` from the working directory.
pub fn load_config() -> Result<Option<CpaConfig>> {
    Ok(read_config(Path::new("."))?)
}

/// Load the metadata document named by the flags, the environment or the
/// config file, in that order.
pub fn load_metadata(source: &SourceArgs, config: Option<&CpaConfig>) -> Result<Metadata> {
    let path = source
        .metadata
        .clone()
        .or_else(|| config.and_then(|c| c.metadata_path()))
        .ok_or_else(|| {
            anyhow!(
                "No metadata document given.\n  \
                 Pass --metadata, set CPAKIT_METADATA, or add [metadata] path to cpakit.toml"
            )
        })?;

    debug!("Loading metadata from {}", path.display());
    let metadata = Metadata::load(&path)
        .with_context(|| format!("Failed to load metadata from {}", path.display()))?;

    match source
        .data
        .clone()
        .or_else(|| config.and_then(|c| c.data_dir()))
    {
        Some(dir) => Ok(metadata.with_root(dir)),
        None => Ok(metadata),
    }
}

/// Model settings from cpakit.toml with flag overrides applied.
pub fn model_config(options: &ModelOptions, config: Option<&CpaConfig>) -> ModelConfig {
    let mut model = config.map(|c| c.model.clone()).unwrap_or_default();
    if let Some(kind) = options.model {
        model.kind = kind.into();
    }
    if let Some(distribution) = options.distribution {
        model.distribution = distribution.into();
    }
    model
}

pub fn spinner(prefix: &str, message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{prefix}] {msg}")?);
    pb.set_prefix(prefix.to_string());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}
