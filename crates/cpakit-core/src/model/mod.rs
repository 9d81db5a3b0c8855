//! # Table Models
//!
//! The statistical model fit once per table and once per parent row's child
//! rows. Models are pluggable: the modeler only needs [`TableModel`] (fit,
//! then read a flat parameter map) and a [`ModelFactory`] that hands out
//! fresh, unfitted instances.
//!
//! Two implementations ship with the crate, selected through [`ModelConfig`]:
//!
//! - [`GaussianCopula`]: per-column marginals plus the correlation of the
//!   columns' normal scores.
//! - [`Independent`]: per-column marginals only.

pub mod copula;
pub mod independent;
pub mod univariate;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::table::{Column, Frame};

pub use copula::GaussianCopula;
pub use independent::Independent;
pub use univariate::Distribution;

/// Flat parameter name → value mapping exposed by a fitted model.
pub type Parameters = IndexMap<String, f64>;

/// Errors raised by a model while fitting or reporting parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("cannot fit a model on an empty table")]
    EmptyTable,

    #[error("column '{column}' is not numeric")]
    NonNumeric { column: String },

    #[error("model has not been fitted")]
    NotFitted,

    #[error("invalid model option: {message}")]
    InvalidOption { message: String },
}

/// A statistical model over the numeric columns of a frame.
pub trait TableModel: fmt::Debug {
    /// Fit the model to every row and column of `table`.
    fn fit(&mut self, table: &Frame) -> std::result::Result<(), ModelError>;

    /// Learned parameters as a flat map. The key set depends only on the
    /// model configuration and the fitted columns.
    fn get_parameters(&self) -> std::result::Result<Parameters, ModelError>;
}

/// Hands out fresh, unfitted model instances.
pub trait ModelFactory {
    fn build(&self) -> Result<Box<dyn TableModel>>;
}

impl<F: ModelFactory + ?Sized> ModelFactory for &F {
    fn build(&self) -> Result<Box<dyn TableModel>> {
        (**self).build()
    }
}

/// Which model to fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    GaussianCopula,
    Independent,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::GaussianCopula => write!(f, "gaussian_copula"),
            ModelKind::Independent => write!(f, "independent"),
        }
    }
}

/// Model kind plus its options; the `[model]` section of `cpakit.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub kind: ModelKind,
    /// Marginal distribution fitted to every column.
    pub distribution: Distribution,
}

impl ModelConfig {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            distribution: Distribution::default(),
        }
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }
}

impl ModelFactory for ModelConfig {
    fn build(&self) -> Result<Box<dyn TableModel>> {
        Ok(match self.kind {
            ModelKind::GaussianCopula => Box::new(GaussianCopula::new(self.distribution)),
            ModelKind::Independent => Box::new(Independent::new(self.distribution)),
        })
    }
}

/// Borrow every column of `table` as numeric data.
///
/// Fails on an empty table or on any key column.
pub(crate) fn numeric_columns(
    table: &Frame,
) -> std::result::Result<Vec<(&str, &[Option<f64>])>, ModelError> {
    if table.is_empty() {
        return Err(ModelError::EmptyTable);
    }
    table
        .columns()
        .map(|(name, column)| match column {
            Column::Numeric(cells) => Ok((name, cells.as_slice())),
            Column::Keys(_) => Err(ModelError::NonNumeric {
                column: name.to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Key;

    #[test]
    fn test_factory_builds_fresh_instances() {
        let config = ModelConfig::new(ModelKind::Independent);
        let mut first = config.build().unwrap();
        let second = config.build().unwrap();

        let mut frame = Frame::new("t", 2);
        frame
            .push_column("x", Column::Numeric(vec![Some(1.0), Some(3.0)]))
            .unwrap();
        first.fit(&frame).unwrap();

        assert!(first.get_parameters().is_ok());
        assert_eq!(second.get_parameters(), Err(ModelError::NotFitted));
    }

    #[test]
    fn test_numeric_columns_rejects_keys() {
        let mut frame = Frame::new("t", 1);
        frame
            .push_column("id", Column::Keys(vec![Some(Key::Int(1))]))
            .unwrap();
        assert_eq!(
            numeric_columns(&frame).unwrap_err(),
            ModelError::NonNumeric {
                column: "id".to_string()
            }
        );
    }

    #[test]
    fn test_numeric_columns_rejects_empty() {
        let frame = Frame::new("t", 0);
        assert_eq!(numeric_columns(&frame).unwrap_err(), ModelError::EmptyTable);
    }

    #[test]
    fn test_model_config_from_toml() {
        let config: ModelConfig = toml::from_str(
            r#"
kind = "independent"
distribution = "uniform"
"#,
        )
        .unwrap();
        assert_eq!(config.kind, ModelKind::Independent);
        assert_eq!(config.distribution, Distribution::Uniform);

        let defaults: ModelConfig = toml::from_str("").unwrap();
        assert_eq!(defaults, ModelConfig::default());
        assert_eq!(defaults.kind, ModelKind::GaussianCopula);
    }
}
