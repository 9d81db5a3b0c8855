use crate::model::univariate::{Distribution, Marginal};
use crate::model::{numeric_columns, ModelError, Parameters, TableModel};
use crate::table::Frame;

/// Per-column marginals with no dependence structure.
#[derive(Debug, Clone)]
pub struct Independent {
    distribution: Distribution,
    marginals: Option<Vec<(String, Marginal)>>,
}

impl Independent {
    pub fn new(distribution: Distribution) -> Self {
        Self {
            distribution,
            marginals: None,
        }
    }
}

impl TableModel for Independent {
    fn fit(&mut self, table: &Frame) -> Result<(), ModelError> {
        let marginals = numeric_columns(table)?
            .into_iter()
            .filter_map(|(name, cells)| {
                Marginal::fit(self.distribution, cells).map(|m| (name.to_string(), m))
            })
            .collect();
        self.marginals = Some(marginals);
        Ok(())
    }

    fn get_parameters(&self) -> Result<Parameters, ModelError> {
        let marginals = self.marginals.as_ref().ok_or(ModelError::NotFitted)?;
        let mut params = Parameters::new();
        for (name, marginal) in marginals {
            marginal.write_parameters(name, &mut params);
        }
        Ok(params)
    }
}
