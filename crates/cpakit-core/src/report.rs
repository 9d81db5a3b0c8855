//! # Model Report
//!
//! The `cpakit model` command persists what it learned to a JSON report: the
//! model configuration, the raw row count and the flat parameter map of
//! every table, and a hash of the metadata it was fitted against. A report
//! whose hash no longer matches the metadata is stale and should be
//! regenerated rather than edited by hand.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CpaError, Result};
use crate::model::{ModelConfig, ModelFactory, Parameters};
use crate::modeler::Modeler;
use crate::schema::types::MetadataDocument;
use crate::schema::{Metadata, MetadataProvider};

/// Default report file name.
pub const REPORT_FILE_NAME: &str = "cpakit-report.json";

/// Everything a modeling run produced, in fit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    /// SHA256 of the normalized metadata document.
    pub metadata_hash: String,
    /// cpakit version that wrote the report.
    pub cpakit_version: String,
    pub model: ModelConfig,
    /// Raw row count per table.
    pub table_sizes: IndexMap<String, usize>,
    /// Flat model parameters per table.
    pub parameters: IndexMap<String, Parameters>,
    pub created_at: String,
}

impl ModelReport {
    /// Snapshot a finished modeling run.
    pub fn from_modeler<F: ModelFactory>(
        modeler: &Modeler<Metadata, F>,
        model: &ModelConfig,
    ) -> Result<Self> {
        Self::collect(modeler, modeler.metadata().document(), model)
    }

    /// Snapshot a run over any metadata provider, hashing `document`.
    pub fn collect<M: MetadataProvider, F: ModelFactory>(
        modeler: &Modeler<M, F>,
        document: &MetadataDocument,
        model: &ModelConfig,
    ) -> Result<Self> {
        Ok(Self {
            metadata_hash: compute_metadata_hash(document),
            cpakit_version: env!("CARGO_PKG_VERSION").to_string(),
            model: model.clone(),
            table_sizes: modeler.table_sizes().clone(),
            parameters: modeler.parameters()?,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// True if the report was fitted against a different metadata document.
    pub fn is_stale(&self, document: &MetadataDocument) -> bool {
        self.metadata_hash != compute_metadata_hash(document)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.values().map(|p| p.len()).sum()
    }
}

/// Hash the parts of a metadata document that affect modeling.
///
/// Table and field order are kept, since they fix the traversal and column
/// order. Data file locations are ignored.
pub fn compute_metadata_hash(document: &MetadataDocument) -> String {
    use sha2::{Digest, Sha256};
    let mut normalized = document.clone();
    for table in &mut normalized.tables {
        table.path = None;
    }
    let serialized = serde_json::to_string(&normalized).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Write a report to disk atomically.
///
/// The JSON goes to a temporary file next to `path`, which is then renamed
/// into place, so an interrupted write never leaves a truncated report.
pub fn write_report(report: &ModelReport, path: &Path) -> Result<()> {
    use std::io::Write;

    let json = serde_json::to_string_pretty(report).map_err(|e| CpaError::Report {
        message: format!("Failed to serialize report: {}", e),
    })?;

    let dir = path.parent().unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| REPORT_FILE_NAME.to_string());
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    let mut file = fs::File::create(&tmp_path).map_err(|e| CpaError::Output {
        message: format!("Failed to create temp report at {}", tmp_path.display()),
        source: e,
    })?;
    file.write_all(json.as_bytes())
        .map_err(|e| CpaError::Output {
            message: format!("Failed to write temp report at {}", tmp_path.display()),
            source: e,
        })?;
    file.sync_all().map_err(|e| CpaError::Output {
        message: "Failed to sync report to disk".to_string(),
        source: e,
    })?;

    fs::rename(&tmp_path, path).map_err(|e| CpaError::Output {
        message: format!(
            "Failed to rename {} → {}",
            tmp_path.display(),
            path.display()
        ),
        source: e,
    })?;

    Ok(())
}

/// Read a report from disk.
pub fn read_report(path: &Path) -> Result<ModelReport> {
    let content = fs::read_to_string(path).map_err(|e| CpaError::Output {
        message: format!("Failed to read report from {}", path.display()),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| CpaError::Report {
        message: format!("Failed to parse report: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;
    use crate::schema::types::{FieldType, TableMeta};
    use tempfile::tempdir;

    fn document() -> MetadataDocument {
        MetadataDocument {
            tables: vec![TableMeta::new("users")
                .with_primary_key("id")
                .with_field("id", FieldType::id())
                .with_field("age", FieldType::integer())],
        }
    }

    fn report() -> ModelReport {
        let mut params = Parameters::new();
        params.insert("distribs__age__loc".to_string(), 35.5);
        params.insert("distribs__age__scale".to_string(), 4.25);
        ModelReport {
            metadata_hash: compute_metadata_hash(&document()),
            cpakit_version: "0.0.0".to_string(),
            model: ModelConfig::new(ModelKind::Independent),
            table_sizes: [("users".to_string(), 2)].into_iter().collect(),
            parameters: [("users".to_string(), params)].into_iter().collect(),
            created_at: "2025-06-15T12:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(REPORT_FILE_NAME);
        write_report(&report(), &path).unwrap();

        let loaded = read_report(&path).unwrap();
        assert_eq!(loaded, report());
        assert_eq!(loaded.parameter_count(), 2);
        assert!(!dir.path().join(format!(".{}.tmp", REPORT_FILE_NAME)).exists());
    }

    #[test]
    fn test_read_nonexistent_file() {
        let err = read_report(Path::new("/nonexistent/cpakit-report.json")).unwrap_err();
        assert!(matches!(err, CpaError::Output { .. }));
    }

    #[test]
    fn test_read_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            read_report(&path).unwrap_err(),
            CpaError::Report { .. }
        ));
    }

    #[test]
    fn test_hash_ignores_paths_but_not_fields() {
        let base = document();
        let mut moved = base.clone();
        moved.tables[0].path = Some("data/users.csv".to_string());
        assert_eq!(compute_metadata_hash(&base), compute_metadata_hash(&moved));

        let mut changed = base.clone();
        changed.tables[0] = changed.tables[0].clone().with_field("score", FieldType::float());
        assert_ne!(compute_metadata_hash(&base), compute_metadata_hash(&changed));
        assert!(report().is_stale(&changed));
        assert!(!report().is_stale(&moved));
    }
}
