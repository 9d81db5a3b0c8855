use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{CpaError, Result};
use crate::graph::dag::DependencyGraph;
use crate::schema::load::read_csv_table;
use crate::schema::types::{MetadataDocument, TableMeta};
use crate::table::{Frame, RawTable};
use crate::transform::transform_table;

/// Schema and data access needed by the modeler.
///
/// The provider is the single source of truth for table names, keys and
/// parent/child relations, and knows how to load a table and turn it into a
/// numeric frame.
pub trait MetadataProvider {
    /// All table names, in declared order.
    fn get_tables(&self) -> Vec<String>;

    /// Tables referenced by `table_name`'s foreign keys.
    fn get_parents(&self, table_name: &str) -> Result<Vec<String>>;

    /// Tables referencing `table_name`, in declared order.
    fn get_children(&self, table_name: &str) -> Result<Vec<String>>;

    fn get_primary_key(&self, table_name: &str) -> Result<Option<String>>;

    /// Column of `child` holding `parent`'s primary key.
    fn get_foreign_key(&self, parent: &str, child: &str) -> Result<String>;

    fn load_table(&self, table_name: &str) -> Result<RawTable>;

    /// Encode a raw table into a numeric-only frame.
    fn transform(&self, table_name: &str, table: &RawTable) -> Result<Frame>;
}

/// Metadata backed by a [`MetadataDocument`] and CSV files under a root directory.
#[derive(Debug, Clone)]
pub struct Metadata {
    document: MetadataDocument,
    graph: DependencyGraph,
    root: PathBuf,
}

impl Metadata {
    /// Validate `document` and resolve table files relative to `root`.
    pub fn new(document: MetadataDocument, root: impl Into<PathBuf>) -> Result<Self> {
        for table in &document.tables {
            if let Some(ref pk) = table.primary_key {
                if table.field(pk).is_none() {
                    return Err(CpaError::InvalidMetadata {
                        message: format!(
                            "primary key '{}' of table '{}' is not a declared field",
                            pk, table.name
                        ),
                    });
                }
            }
        }

        let graph = DependencyGraph::from_document(&document)?;

        for table in &document.tables {
            for (field, reference) in table.foreign_keys() {
                let parent_pk = document
                    .table(&reference.table)
                    .and_then(|t| t.primary_key.as_deref());
                match parent_pk {
                    None => warn!(
                        "Table '{}' references '{}', which has no primary key. \
                         '{}' will not be modeled.",
                        table.name, reference.table, table.name
                    ),
                    Some(pk) if pk != reference.field => warn!(
                        "{}.{} references {}.{}, which is not the primary key ({})",
                        table.name, field.name, reference.table, reference.field, pk
                    ),
                    Some(_) => {}
                }
            }
        }

        Ok(Self {
            document,
            graph,
            root: root.into(),
        })
    }

    /// Read a JSON metadata document. Table files resolve against the
    /// document's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CpaError::InvalidMetadata {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let document: MetadataDocument =
            serde_json::from_str(&content).map_err(|e| CpaError::InvalidMetadata {
                message: format!("Failed to parse {}: {}", path.display(), e),
            })?;
        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::new(document, root)
    }

    /// Resolve table files against `root` instead.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn document(&self) -> &MetadataDocument {
        &self.document
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_meta(&self, table_name: &str) -> Result<&TableMeta> {
        self.document
            .table(table_name)
            .ok_or_else(|| CpaError::UnknownTable {
                table: table_name.to_string(),
            })
    }
}

impl MetadataProvider for Metadata {
    fn get_tables(&self) -> Vec<String> {
        self.document.tables.iter().map(|t| t.name.clone()).collect()
    }

    fn get_parents(&self, table_name: &str) -> Result<Vec<String>> {
        Ok(self
            .graph
            .parents(table_name)?
            .into_iter()
            .map(String::from)
            .collect())
    }

    fn get_children(&self, table_name: &str) -> Result<Vec<String>> {
        Ok(self
            .graph
            .children(table_name)?
            .into_iter()
            .map(String::from)
            .collect())
    }

    fn get_primary_key(&self, table_name: &str) -> Result<Option<String>> {
        Ok(self.table_meta(table_name)?.primary_key.clone())
    }

    fn get_foreign_key(&self, parent: &str, child: &str) -> Result<String> {
        Ok(self.graph.foreign_key(parent, child)?.foreign_key.clone())
    }

    fn load_table(&self, table_name: &str) -> Result<RawTable> {
        let meta = self.table_meta(table_name)?;
        let path = self.root.join(meta.data_path());
        let file = fs::File::open(&path).map_err(|e| CpaError::Load {
            table: table_name.to_string(),
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;
        read_csv_table(meta, std::io::BufReader::new(file))
    }

    fn transform(&self, table_name: &str, table: &RawTable) -> Result<Frame> {
        transform_table(self.table_meta(table_name)?, table)
    }
}
