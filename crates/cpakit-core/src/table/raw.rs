use indexmap::IndexMap;

use crate::error::{CpaError, Result};
use crate::table::value::{Key, Value};

/// A table exactly as loaded: named, ordered columns of raw values.
///
/// Raw tables are read-only inputs to modeling. Every stage downstream works
/// on a transformed [`Frame`](crate::table::Frame) instead.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub name: String,
    columns: IndexMap<String, Vec<Value>>,
    len: usize,
}

impl RawTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            len: 0,
        }
    }

    /// Build a table from `(column, values)` pairs. All columns must have the
    /// same length.
    pub fn from_columns<I, S>(name: impl Into<String>, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let mut table = Self::new(name);
        for (column, values) in columns {
            table.push_column(column, values)?;
        }
        Ok(table)
    }

    /// Append a column. The first column fixes the row count.
    pub fn push_column(&mut self, column: impl Into<String>, values: Vec<Value>) -> Result<()> {
        let column = column.into();
        if self.columns.is_empty() {
            self.len = values.len();
        } else if values.len() != self.len {
            return Err(CpaError::shape(
                &self.name,
                format!(
                    "column '{}' has {} rows, expected {}",
                    column,
                    values.len(),
                    self.len
                ),
            ));
        }
        if self.columns.insert(column.clone(), values).is_some() {
            return Err(CpaError::shape(
                &self.name,
                format!("duplicate column '{}'", column),
            ));
        }
        Ok(())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    fn require(&self, name: &str) -> Result<&[Value]> {
        self.column(name).ok_or_else(|| CpaError::MissingColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Read a column as row identities; nulls are kept as `None`.
    pub fn key_column(&self, name: &str) -> Result<Vec<Option<Key>>> {
        self.require(name)?
            .iter()
            .enumerate()
            .map(|(row, value)| {
                value.to_key().map_err(|reason| {
                    CpaError::shape(&self.name, format!("column '{}' row {}: {}", name, row, reason))
                })
            })
            .collect()
    }

    /// Read a primary-key column. Every row must carry a key.
    pub fn index_keys(&self, name: &str) -> Result<Vec<Key>> {
        self.key_column(name)?
            .into_iter()
            .enumerate()
            .map(|(row, key)| {
                key.ok_or_else(|| {
                    CpaError::shape(
                        &self.name,
                        format!("primary key '{}' is null at row {}", name, row),
                    )
                })
            })
            .collect()
    }
}
