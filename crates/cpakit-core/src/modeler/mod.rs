//! # Conditional Parameter Aggregation
//!
//! The recursive modeler. For every table it first recurses into the
//! table's children, then folds each child's per-parent-row model
//! parameters into the parent as extension columns, and only then fits the
//! parent's own model:
//!
//! ```text
//!   cpa(customers)
//!     ├─ cpa(orders)
//!     │    ├─ cpa(items)            fit items
//!     │    ├─ build_extension(items) one sub-model per order
//!     │    └─ merge + fill           fit orders
//!     ├─ build_extension(orders)     one sub-model per customer
//!     └─ merge + fill                fit customers
//! ```
//!
//! Extension columns are namespaced as `__<child>__<param>`, and every
//! extension carries `__<child>__child_rows`, which is 0 (not missing) for
//! parent rows without children.

use std::borrow::Cow;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{CpaError, Result};
use crate::model::{ModelError, ModelFactory, Parameters, TableModel};
use crate::schema::MetadataProvider;
use crate::table::{Column, Frame, Index, Key, RawTable, Tables};

/// Parameter appended to every extension row: how many child rows it summarizes.
pub const CHILD_ROWS: &str = "child_rows";

/// Name of the extension column carrying `param` of `child`'s sub-models.
pub fn extension_column(child: &str, param: &str) -> String {
    format!("__{}__{}", child, param)
}

/// Name of the extension column counting `child` rows per parent row.
pub fn child_rows_column(child: &str) -> String {
    extension_column(child, CHILD_ROWS)
}

/// Called with `(table_name, raw_row_count)` each time a table is about to
/// be fitted.
pub type ProgressCallback = Box<dyn Fn(&str, usize)>;

/// Recursive modeler over a relational schema.
///
/// Owns the registries it fills: one fitted model and one raw row count per
/// table. Both live as long as the modeler and are overwritten when a table
/// is modeled again.
pub struct Modeler<M, F> {
    metadata: M,
    factory: F,
    models: IndexMap<String, Box<dyn TableModel>>,
    table_sizes: IndexMap<String, usize>,
    progress: Option<ProgressCallback>,
}

impl<M: MetadataProvider, F: ModelFactory> Modeler<M, F> {
    pub fn new(metadata: M, factory: F) -> Self {
        Self {
            metadata,
            factory,
            models: IndexMap::new(),
            table_sizes: IndexMap::new(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: impl Fn(&str, usize) + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Fitted table models, in the order tables were first fitted.
    pub fn models(&self) -> &IndexMap<String, Box<dyn TableModel>> {
        &self.models
    }

    pub fn model(&self, table_name: &str) -> Option<&dyn TableModel> {
        self.models.get(table_name).map(|m| m.as_ref())
    }

    /// Raw row count of every table modeled so far.
    pub fn table_sizes(&self) -> &IndexMap<String, usize> {
        &self.table_sizes
    }

    /// Parameters of every fitted table model, in fit order.
    pub fn parameters(&self) -> Result<IndexMap<String, Parameters>> {
        self.models
            .iter()
            .map(|(table, model)| {
                model
                    .get_parameters()
                    .map(|params| (table.clone(), params))
                    .map_err(|source| fit_error(table, None, source))
            })
            .collect()
    }

    /// Model every root table, and through recursion every table below one.
    pub fn model_database(&mut self, tables: Option<&Tables>) -> Result<()> {
        for table_name in self.metadata.get_tables() {
            if self.metadata.get_parents(&table_name)?.is_empty() {
                self.cpa(&table_name, tables, None)?;
            }
        }
        info!("Modeling complete");
        Ok(())
    }

    /// Tables `model_database` will fit, in fit order.
    ///
    /// Children of a table without a primary key are never reached.
    pub fn planned_tables(&self) -> Result<Vec<String>> {
        let mut planned = Vec::new();
        for table_name in self.metadata.get_tables() {
            if self.metadata.get_parents(&table_name)?.is_empty() {
                self.plan(&table_name, &mut planned)?;
            }
        }
        Ok(planned)
    }

    fn plan(&self, table_name: &str, planned: &mut Vec<String>) -> Result<()> {
        if self.metadata.get_primary_key(table_name)?.is_some() {
            for child in self.metadata.get_children(table_name)? {
                self.plan(&child, planned)?;
            }
        }
        if !planned.iter().any(|t| t == table_name) {
            planned.push(table_name.to_string());
        }
        Ok(())
    }

    /// Extend `table_name` with its children's aggregated parameters, fit its
    /// model and return the extended table.
    ///
    /// `tables` supplies raw tables by name; when absent or empty, tables are
    /// loaded through the metadata. `foreign_key` is given on recursive calls
    /// and is attached to the result as a key column so the caller can group
    /// rows by parent.
    pub fn cpa(
        &mut self,
        table_name: &str,
        tables: Option<&Tables>,
        foreign_key: Option<&str>,
    ) -> Result<Frame> {
        info!("Modeling {}", table_name);

        let raw = self.resolve_table(table_name, tables)?;
        self.table_sizes.insert(table_name.to_string(), raw.len());

        let mut extended = self.metadata.transform(table_name, &raw)?;

        let primary_key = self.metadata.get_primary_key(table_name)?;
        if let Some(ref pk) = primary_key {
            extended.set_index(pk.as_str(), raw.index_keys(pk)?)?;

            for child in self.metadata.get_children(table_name)? {
                let child_key = self.metadata.get_foreign_key(table_name, &child)?;
                debug!("Extending {} with {} via {}", table_name, child, child_key);
                let child_table = self.cpa(&child, tables, Some(&child_key))?;
                let extension = self.build_extension(&child, &child_table, &child_key)?;
                extended = extended.merge_left(&extension)?;
                extended.fill_missing(&child_rows_column(&child), 0.0)?;
            }
        }

        if let Some(ref progress) = self.progress {
            progress(table_name, raw.len());
        }
        debug!(
            "Fitting {} on {} rows x {} columns",
            table_name,
            extended.len(),
            extended.width()
        );
        let mut model = self.factory.build()?;
        model
            .fit(&extended)
            .map_err(|source| fit_error(table_name, None, source))?;
        self.models.insert(table_name.to_string(), model);

        if primary_key.is_some() {
            extended.reset_index()?;
        }

        if let Some(fk) = foreign_key {
            extended.insert_column(fk, Column::Keys(raw.key_column(fk)?))?;
        }

        Ok(extended)
    }

    /// Summarize `child_table` per foreign-key value.
    ///
    /// One fresh model is fit on each parent's child rows. Its parameters plus
    /// the row count become one extension row, indexed by the foreign-key
    /// value. Rows are in first-occurrence order of the values; rows with a
    /// null foreign key belong to no parent and are left out.
    pub fn build_extension(
        &self,
        child_name: &str,
        child_table: &Frame,
        foreign_key: &str,
    ) -> Result<Frame> {
        let groups = child_table.group_positions(foreign_key)?;

        let orphans = child_table.len() - groups.values().map(Vec::len).sum::<usize>();
        if orphans > 0 {
            debug!(
                "{} rows of {} have a null {} and are not aggregated",
                orphans, child_name, foreign_key
            );
        }

        let mut body = child_table.clone();
        body.drop_column(foreign_key);
        if let Some(pk) = self.metadata.get_primary_key(child_name)? {
            body.drop_column(&pk);
        }

        let mut keys: Vec<Key> = Vec::with_capacity(groups.len());
        let mut records: Vec<IndexMap<String, f64>> = Vec::with_capacity(groups.len());
        for (value, positions) in groups {
            let rows = body.take_rows(&positions);
            let mut model = self.factory.build()?;
            let params = model
                .fit(&rows)
                .and_then(|_| model.get_parameters())
                .map_err(|source| fit_error(child_name, Some(&value), source))?;

            let mut record: IndexMap<String, f64> = params
                .into_iter()
                .map(|(name, v)| (extension_column(child_name, &name), v))
                .collect();
            record.insert(child_rows_column(child_name), positions.len() as f64);

            records.push(record);
            keys.push(value);
        }

        debug!(
            "Extension of {} by {}: {} parent rows",
            child_name,
            foreign_key,
            keys.len()
        );
        Frame::from_records(child_name, Index::new(foreign_key, keys), records)
    }

    fn resolve_table<'t>(
        &self,
        table_name: &str,
        tables: Option<&'t Tables>,
    ) -> Result<Cow<'t, RawTable>> {
        match tables.filter(|t| !t.is_empty()) {
            Some(tables) => tables
                .get(table_name)
                .map(Cow::Borrowed)
                .ok_or_else(|| CpaError::UnknownTable {
                    table: table_name.to_string(),
                }),
            None => self.metadata.load_table(table_name).map(Cow::Owned),
        }
    }
}

fn fit_error(table: &str, foreign_key_value: Option<&Key>, source: ModelError) -> CpaError {
    CpaError::Fit {
        table: table.to_string(),
        foreign_key_value: foreign_key_value.cloned(),
        source,
    }
}
