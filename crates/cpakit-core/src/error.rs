//! # Error Types
//!
//! Defines `CpaError`, the unified error enum for every failure mode in the
//! modeling pipeline. Every variant carries enough context (table name,
//! column name, offending foreign-key value) to locate the problem without
//! digging through logs.

use thiserror::Error;

use crate::model::ModelError;
use crate::table::Key;

/// All errors that can occur while loading, extending and modeling tables.
#[derive(Error, Debug)]
pub enum CpaError {
    #[error("Unknown table '{table}': it is not declared in the metadata or was not supplied")]
    UnknownTable { table: String },

    #[error("No foreign key links child table '{child}' to parent table '{parent}'")]
    MissingForeignKey { parent: String, child: String },

    #[error("Child table '{child}' references '{parent}' through several columns ({columns})\n  Only one foreign key per parent/child pair is supported")]
    AmbiguousForeignKey {
        parent: String,
        child: String,
        columns: String,
    },

    #[error("Table '{table}' references more than one parent table ({parents})\n  Tables must form a tree under each root")]
    MultipleParents { table: String, parents: String },

    #[error("Circular dependency detected involving table: {tables}\n  Parent/child relations must form a forest")]
    CircularDependency { tables: String },

    #[error("Column '{column}' not found in table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("Invalid metadata: {message}")]
    InvalidMetadata { message: String },

    #[error("{}", fit_message(.table, .foreign_key_value.as_ref(), .source))]
    Fit {
        table: String,
        foreign_key_value: Option<Key>,
        #[source]
        source: ModelError,
    },

    #[error("Data shape error in table '{table}': {message}")]
    DataShape { table: String, message: String },

    #[error("Failed to load table '{table}': {message}")]
    Load { table: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Report error: {message}")]
    Report { message: String },
}

fn fit_message(table: &str, foreign_key_value: Option<&Key>, source: &ModelError) -> String {
    match foreign_key_value {
        Some(value) => format!(
            "Failed to fit model on rows of '{}' with foreign key value {}: {}",
            table, value, source
        ),
        None => format!("Failed to fit model on table '{}': {}", table, source),
    }
}

impl CpaError {
    /// Shorthand for a `DataShape` error on `table`.
    pub(crate) fn shape(table: &str, message: impl Into<String>) -> Self {
        CpaError::DataShape {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CpaError>;
