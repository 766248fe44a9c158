//! Indicator applicator: one catalog-driven indicator call on a table.

use crate::catalog::IndicatorCatalog;
use crate::domain::FeatureTable;
use crate::error::PrepError;
use crate::indicators::{IndicatorLibrary, Params};
use tracing::debug;

/// Applies catalog indicators to feature tables.
pub struct IndicatorApplicator<'a> {
    catalog: &'a IndicatorCatalog,
    library: &'a dyn IndicatorLibrary,
}

impl<'a> IndicatorApplicator<'a> {
    pub fn new(catalog: &'a IndicatorCatalog, library: &'a dyn IndicatorLibrary) -> Self {
        Self { catalog, library }
    }

    pub fn catalog(&self) -> &'a IndicatorCatalog {
        self.catalog
    }

    pub fn library(&self) -> &'a dyn IndicatorLibrary {
        self.library
    }

    /// Compute `indicator` over `table` and return a copy of the table with
    /// the indicator's output columns appended.
    ///
    /// Price inputs are taken from the table's columns in the order the
    /// catalog declares them; output names come from the catalog templates
    /// resolved against `params`.
    pub fn apply(
        &self,
        table: &FeatureTable,
        indicator: &str,
        params: &Params,
    ) -> Result<FeatureTable, PrepError> {
        let spec = self
            .catalog
            .get(indicator)
            .filter(|_| self.library.supports(indicator))
            .ok_or_else(|| PrepError::UnknownIndicator {
                name: indicator.to_string(),
            })?;

        spec.check_params(params)?;
        let names = spec.output_names(params)?;

        let inputs = spec
            .price_inputs()
            .map(|field| table.require_column(field))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(indicator, outputs = ?names, "computing indicator");
        let outputs = self.library.compute(indicator, &inputs, params)?;
        if outputs.len() != names.len() {
            return Err(PrepError::OutputArityMismatch {
                indicator: indicator.to_string(),
                expected: names.len(),
                actual: outputs.len(),
            });
        }

        let mut out = table.clone();
        for (name, values) in names.into_iter().zip(outputs) {
            out.set_column(name, values)?;
        }
        Ok(out)
    }
}
