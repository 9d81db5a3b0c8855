use std::fmt;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::model::{ModelError, Parameters};

/// Clamp for uniform CDF values before the inverse normal CDF.
const CDF_EPSILON: f64 = 1e-6;

/// Family of the per-column marginal distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// loc = mean, scale = population standard deviation
    #[default]
    Gaussian,
    /// loc = minimum, scale = maximum − minimum
    Uniform,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Gaussian => write!(f, "gaussian"),
            Distribution::Uniform => write!(f, "uniform"),
        }
    }
}

/// A fitted marginal for one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marginal {
    pub distribution: Distribution,
    pub loc: f64,
    pub scale: f64,
}

impl Marginal {
    /// Fit over the observed (non-missing, finite) cells of a column.
    ///
    /// Returns `None` when the column has no observed cell, e.g. the
    /// extension columns of rows whose children had no children of their own.
    pub fn fit(distribution: Distribution, cells: &[Option<f64>]) -> Option<Self> {
        let observed: Vec<f64> = cells.iter().flatten().copied().filter(|x| x.is_finite()).collect();
        if observed.is_empty() {
            return None;
        }

        let (loc, scale) = match distribution {
            Distribution::Gaussian => {
                let n = observed.len() as f64;
                let mean = observed.iter().sum::<f64>() / n;
                let variance = observed.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                (mean, variance.sqrt())
            }
            Distribution::Uniform => {
                let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
                let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (min, max - min)
            }
        };

        Some(Self {
            distribution,
            loc,
            scale,
        })
    }

    /// Map an observation to standard-normal space through this marginal.
    ///
    /// A zero-width marginal maps everything to 0.
    pub fn normal_score(&self, x: f64, standard: &Normal) -> f64 {
        if self.scale <= 0.0 {
            return 0.0;
        }
        match self.distribution {
            Distribution::Gaussian => (x - self.loc) / self.scale,
            Distribution::Uniform => {
                let u = ((x - self.loc) / self.scale).clamp(CDF_EPSILON, 1.0 - CDF_EPSILON);
                standard.inverse_cdf(u)
            }
        }
    }

    /// Append `distribs__<column>__loc` and `distribs__<column>__scale`.
    pub fn write_parameters(&self, column: &str, params: &mut Parameters) {
        params.insert(format!("distribs__{}__loc", column), self.loc);
        params.insert(format!("distribs__{}__scale", column), self.scale);
    }
}

/// The standard normal distribution.
pub fn standard_normal() -> Result<Normal, ModelError> {
    Normal::new(0.0, 1.0).map_err(|e| ModelError::InvalidOption {
        message: format!("standard normal: {}", e),
    })
}
