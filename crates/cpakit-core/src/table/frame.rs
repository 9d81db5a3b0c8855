use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{CpaError, Result};
use crate::table::value::Key;

/// A single frame column.
///
/// Model-facing data is numeric with explicit gaps. Key columns carry row
/// identities (primary or foreign keys) alongside the numeric data so callers
/// can group or join on them; models reject them.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Keys(Vec<Option<Key>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Keys(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, positions: &[usize]) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(positions.iter().map(|&i| v[i]).collect()),
            Column::Keys(v) => Column::Keys(positions.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Gather rows by optional position; `None` yields a missing cell.
    fn gather(&self, positions: &[Option<usize>]) -> Column {
        match self {
            Column::Numeric(v) => {
                Column::Numeric(positions.iter().map(|p| p.and_then(|i| v[i])).collect())
            }
            Column::Keys(v) => Column::Keys(
                positions
                    .iter()
                    .map(|p| p.and_then(|i| v[i].clone()))
                    .collect(),
            ),
        }
    }
}

/// Row labels of a frame, e.g. the parent primary key while children are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub keys: Vec<Key>,
}

impl Index {
    pub fn new(name: impl Into<String>, keys: Vec<Key>) -> Self {
        Self {
            name: name.into(),
            keys,
        }
    }

    fn kind(&self) -> Option<&'static str> {
        self.keys.first().map(Key::kind)
    }
}

/// A transformed (and possibly extended) table.
///
/// The row count is tracked explicitly so that frames with zero columns still
/// know how many rows they describe.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    table: String,
    index: Option<Index>,
    columns: IndexMap<String, Column>,
    len: usize,
}

impl Frame {
    /// An empty frame with `len` rows and no columns.
    pub fn new(table: impl Into<String>, len: usize) -> Self {
        Self {
            table: table.into(),
            index: None,
            columns: IndexMap::new(),
            len,
        }
    }

    /// Assemble a frame from one record per index key.
    ///
    /// Columns are the union of the record fields in first-seen order; a
    /// record that lacks a field leaves a missing cell.
    pub fn from_records(
        table: impl Into<String>,
        index: Index,
        records: Vec<IndexMap<String, f64>>,
    ) -> Result<Self> {
        let table = table.into();
        if index.keys.len() != records.len() {
            return Err(CpaError::shape(
                &table,
                format!(
                    "{} index keys for {} records",
                    index.keys.len(),
                    records.len()
                ),
            ));
        }

        let len = records.len();
        let mut cells: IndexMap<String, Vec<Option<f64>>> = IndexMap::new();
        for (row, record) in records.into_iter().enumerate() {
            for (name, value) in record {
                cells.entry(name).or_insert_with(|| vec![None; len])[row] = Some(value);
            }
        }

        Ok(Self {
            table,
            index: Some(index),
            columns: cells
                .into_iter()
                .map(|(name, values)| (name, Column::Numeric(values)))
                .collect(),
            len,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of columns (the index is not a column).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, col)| (name.as_str(), col))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.columns.get(name) {
            Some(Column::Numeric(v)) => Some(v),
            _ => None,
        }
    }

    pub fn keys(&self, name: &str) -> Option<&[Option<Key>]> {
        match self.columns.get(name) {
            Some(Column::Keys(v)) => Some(v),
            _ => None,
        }
    }

    fn check_len(&self, name: &str, column: &Column) -> Result<()> {
        if column.len() != self.len {
            return Err(CpaError::shape(
                &self.table,
                format!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    column.len(),
                    self.len
                ),
            ));
        }
        Ok(())
    }

    /// Append a new column; fails if the name is taken.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        self.check_len(&name, &column)?;
        if self.columns.contains_key(&name) {
            return Err(CpaError::shape(
                &self.table,
                format!("duplicate column '{}'", name),
            ));
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Set a column, replacing any existing column of the same name in place.
    pub fn insert_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        self.check_len(&name, &column)?;
        self.columns.insert(name, column);
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        self.columns.shift_remove(name)
    }

    /// Label rows with `keys`.
    pub fn set_index(&mut self, name: impl Into<String>, keys: Vec<Key>) -> Result<()> {
        let index = Index::new(name, keys);
        if index.keys.len() != self.len {
            return Err(CpaError::shape(
                &self.table,
                format!(
                    "index '{}' has {} keys, expected {}",
                    index.name,
                    index.keys.len(),
                    self.len
                ),
            ));
        }
        self.index = Some(index);
        Ok(())
    }

    /// Move the index back into the frame as its first column.
    pub fn reset_index(&mut self) -> Result<()> {
        let Some(index) = self.index.take() else {
            return Ok(());
        };
        if self.columns.contains_key(&index.name) {
            return Err(CpaError::shape(
                &self.table,
                format!("cannot restore index '{}': column already exists", index.name),
            ));
        }
        let column = Column::Keys(index.keys.into_iter().map(Some).collect());
        self.columns.shift_insert(0, index.name, column);
        Ok(())
    }

    /// Copy of the selected rows, in the given order.
    pub fn take_rows(&self, positions: &[usize]) -> Frame {
        Frame {
            table: self.table.clone(),
            index: self.index.as_ref().map(|index| Index {
                name: index.name.clone(),
                keys: positions.iter().map(|&i| index.keys[i].clone()).collect(),
            }),
            columns: self
                .columns
                .iter()
                .map(|(name, col)| (name.clone(), col.take(positions)))
                .collect(),
            len: positions.len(),
        }
    }

    /// Row positions grouped by the values of a key column.
    ///
    /// Groups appear in order of first occurrence. Rows with a null key
    /// belong to no group.
    pub fn group_positions(&self, column: &str) -> Result<IndexMap<Key, Vec<usize>>> {
        let keys = match self.columns.get(column) {
            Some(Column::Keys(keys)) => keys,
            Some(Column::Numeric(_)) => {
                return Err(CpaError::shape(
                    &self.table,
                    format!("column '{}' does not hold keys", column),
                ))
            }
            None => {
                return Err(CpaError::MissingColumn {
                    table: self.table.clone(),
                    column: column.to_string(),
                })
            }
        };

        let mut groups: IndexMap<Key, Vec<usize>> = IndexMap::new();
        for (row, key) in keys.iter().enumerate() {
            if let Some(key) = key {
                groups.entry(key.clone()).or_default().push(row);
            }
        }
        Ok(groups)
    }

    /// Left join `other` onto this frame, matching index to index.
    ///
    /// Every row of `self` is kept in order. Rows without a match get missing
    /// cells in all of `other`'s columns. `other`'s index must be unique.
    pub fn merge_left(&self, other: &Frame) -> Result<Frame> {
        let (Some(left), Some(right)) = (self.index.as_ref(), other.index.as_ref()) else {
            return Err(CpaError::shape(
                &self.table,
                format!("cannot merge '{}': both frames need an index", other.table),
            ));
        };

        if let (Some(left_kind), Some(right_kind)) = (left.kind(), right.kind()) {
            if left_kind != right_kind {
                return Err(CpaError::shape(
                    &self.table,
                    format!(
                        "cannot merge '{}' keyed by {} values onto {} index '{}'",
                        other.table, right_kind, left_kind, left.name
                    ),
                ));
            }
        }

        let mut lookup: HashMap<&Key, usize> = HashMap::with_capacity(right.keys.len());
        for (row, key) in right.keys.iter().enumerate() {
            if lookup.insert(key, row).is_some() {
                return Err(CpaError::shape(
                    &other.table,
                    format!("index value {} appears more than once", key),
                ));
            }
        }

        let positions: Vec<Option<usize>> =
            left.keys.iter().map(|key| lookup.get(key).copied()).collect();

        let mut merged = self.clone();
        for (name, column) in &other.columns {
            merged.push_column(name.clone(), column.gather(&positions))?;
        }
        Ok(merged)
    }

    /// Replace missing cells of a numeric column with `value`.
    ///
    /// A column that does not exist yet is created filled with `value`.
    pub fn fill_missing(&mut self, name: &str, value: f64) -> Result<()> {
        match self.columns.get_mut(name) {
            Some(Column::Numeric(cells)) => {
                for cell in cells.iter_mut().filter(|c| c.is_none()) {
                    *cell = Some(value);
                }
                Ok(())
            }
            Some(Column::Keys(_)) => Err(CpaError::shape(
                &self.table,
                format!("cannot fill key column '{}' with a number", name),
            )),
            None => self.push_column(name, Column::Numeric(vec![Some(value); self.len])),
        }
    }
}
