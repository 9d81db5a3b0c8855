use crate::model::univariate::{standard_normal, Distribution, Marginal};
use crate::model::{numeric_columns, ModelError, Parameters, TableModel};
use crate::table::Frame;

/// Variances below this are treated as zero when correlating normal scores.
const MIN_VARIANCE: f64 = 1e-12;

/// Gaussian copula over the numeric columns of a table.
///
/// Each column gets a univariate marginal; observations are mapped to
/// standard-normal scores through it and the correlation of those scores is
/// learned. Missing cells score 0, the latent mean.
#[derive(Debug, Clone)]
pub struct GaussianCopula {
    distribution: Distribution,
    fitted: Option<FittedCopula>,
}

#[derive(Debug, Clone)]
struct FittedCopula {
    /// `None` for columns without a single observed cell.
    marginals: Vec<(String, Option<Marginal>)>,
    /// Lower triangle, row `i` holds entries `0..=i`.
    correlation: Vec<Vec<f64>>,
}

impl GaussianCopula {
    pub fn new(distribution: Distribution) -> Self {
        Self {
            distribution,
            fitted: None,
        }
    }
}

impl TableModel for GaussianCopula {
    fn fit(&mut self, table: &Frame) -> Result<(), ModelError> {
        let columns = numeric_columns(table)?;
        let standard = standard_normal()?;

        let mut marginals = Vec::with_capacity(columns.len());
        let mut scores = Vec::with_capacity(columns.len());
        for (name, cells) in &columns {
            let marginal = Marginal::fit(self.distribution, cells);
            scores.push(
                cells
                    .iter()
                    .map(|cell| match (cell, &marginal) {
                        (Some(x), Some(m)) if x.is_finite() => m.normal_score(*x, &standard),
                        _ => 0.0,
                    })
                    .collect::<Vec<f64>>(),
            );
            marginals.push((name.to_string(), marginal));
        }

        self.fitted = Some(FittedCopula {
            marginals,
            correlation: correlation_lower(&scores),
        });
        Ok(())
    }

    fn get_parameters(&self) -> Result<Parameters, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        let mut params = Parameters::new();
        for (i, row) in fitted.correlation.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                params.insert(format!("covariance__{}__{}", i, j), *value);
            }
        }
        for (name, marginal) in &fitted.marginals {
            if let Some(marginal) = marginal {
                marginal.write_parameters(name, &mut params);
            }
        }
        Ok(params)
    }
}

/// Pearson correlation of equally long series, lower triangle only.
///
/// A series with (near) zero variance correlates 0 with everything else and
/// 1 with itself.
fn correlation_lower(series: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let centered: Vec<(Vec<f64>, f64)> = series
        .iter()
        .map(|s| {
            let n = s.len().max(1) as f64;
            let mean = s.iter().sum::<f64>() / n;
            let c: Vec<f64> = s.iter().map(|x| x - mean).collect();
            let variance = c.iter().map(|x| x * x).sum::<f64>() / n;
            (c, variance)
        })
        .collect();

    let n = series.first().map_or(1, |s| s.len().max(1)) as f64;
    (0..centered.len())
        .map(|i| {
            (0..=i)
                .map(|j| {
                    if i == j {
                        return 1.0;
                    }
                    let (a, var_a) = &centered[i];
                    let (b, var_b) = &centered[j];
                    if *var_a < MIN_VARIANCE || *var_b < MIN_VARIANCE {
                        return 0.0;
                    }
                    let covariance = a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>() / n;
                    (covariance / (var_a * var_b).sqrt()).clamp(-1.0, 1.0)
                })
                .collect()
        })
        .collect()
}
