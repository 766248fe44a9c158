//! Labeled dataset formatting.
//!
//! Windows slide over the augmented table exactly as in `window`, and each
//! window is labeled by what happens from the row right after it
//! (`j = i + window_size`). Windows whose label would need prices past the
//! end of the series are dropped.

use crate::domain::table::date_column;
use crate::domain::{FeatureTable, PriceSeries};
use crate::error::PrepError;
use crate::label::{label_for, profitability, ProfitKind};
use crate::window::{flat_names, window_at, WindowSpec, WindowedRow};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Formatting parameters for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatOptions {
    pub window_size: usize,
    pub stride: usize,
    /// Bars between the baseline close and the target close; at least 1.
    pub horizon: usize,
    pub min_profit: f64,
    #[serde(default)]
    pub kind: ProfitKind,
    /// Columns left out of the flattened features.
    #[serde(default)]
    pub excluded_columns: Vec<String>,
    /// Columns passed through as a single value taken at the anchor row.
    #[serde(default)]
    pub signal_columns: Vec<String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            window_size: 20,
            stride: 5,
            horizon: 5,
            min_profit: 0.0,
            kind: ProfitKind::Linear,
            excluded_columns: Vec::new(),
            signal_columns: Vec::new(),
        }
    }
}

impl FormatOptions {
    pub fn window(&self) -> Result<WindowSpec, PrepError> {
        if self.horizon == 0 {
            return Err(PrepError::InvalidWindowConfig("horizon must be at least 1".into()));
        }
        WindowSpec::new(self.window_size, self.stride)
    }
}

/// A window with its label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub window: WindowedRow,
    pub signals: Vec<f64>,
    pub profitability: f64,
    pub label: u8,
}

/// Labeled windows of one asset under one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    pub ticker: String,
    pub window_size: usize,
    pub feature_columns: Vec<String>,
    pub signal_columns: Vec<String>,
    pub rows: Vec<LabeledRow>,
    /// Candidate windows before unlabeled ones were dropped.
    pub candidates: usize,
}

impl LabeledTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn flat_feature_names(&self) -> Vec<String> {
        flat_names(&self.feature_columns, self.window_size)
    }

    /// Columns: `ticker`, `window_start_date`, `window_end_date`,
    /// `shape_rows`, `shape_cols`, flattened features, signals,
    /// `profitability`, `label`.
    pub fn to_frame(&self) -> Result<DataFrame, PrepError> {
        let n = self.rows.len();
        let names = self.flat_feature_names();
        let mut columns = Vec::with_capacity(names.len() + self.signal_columns.len() + 7);

        columns.push(Column::new("ticker".into(), vec![self.ticker.as_str(); n]));
        let starts: Vec<_> = self.rows.iter().map(|r| r.window.start_date).collect();
        let ends: Vec<_> = self.rows.iter().map(|r| r.window.end_date).collect();
        columns.push(date_column("window_start_date", &starts)?);
        columns.push(date_column("window_end_date", &ends)?);
        columns.push(Column::new(
            "shape_rows".into(),
            self.rows.iter().map(|r| r.window.shape.0 as u32).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            "shape_cols".into(),
            self.rows.iter().map(|r| r.window.shape.1 as u32).collect::<Vec<_>>(),
        ));
        for (k, name) in names.iter().enumerate() {
            let values: Vec<f64> = self.rows.iter().map(|r| r.window.features[k]).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        for (k, name) in self.signal_columns.iter().enumerate() {
            let values: Vec<f64> = self.rows.iter().map(|r| r.signals[k]).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        columns.push(Column::new(
            "profitability".into(),
            self.rows.iter().map(|r| r.profitability).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            "label".into(),
            self.rows.iter().map(|r| r.label as i32).collect::<Vec<_>>(),
        ));

        DataFrame::new(columns).map_err(|e| PrepError::Parquet(format!("dataframe creation: {e}")))
    }
}

/// Window, label and flatten one asset's augmented table.
///
/// Profitability is looked up in `raw` by the anchor row's date, so the
/// augmented table may be a suffix or subset of the raw history.
pub fn format_dataset(
    raw: &PriceSeries,
    augmented: &FeatureTable,
    opts: &FormatOptions,
) -> Result<LabeledTable, PrepError> {
    let spec = opts.window()?;
    spec.check(augmented)?;

    let skip: HashSet<&str> = opts
        .excluded_columns
        .iter()
        .chain(&opts.signal_columns)
        .map(String::as_str)
        .collect();
    let feature_columns: Vec<String> = augmented
        .column_names()
        .into_iter()
        .filter(|c| !skip.contains(c))
        .map(String::from)
        .collect();

    let features = feature_columns
        .iter()
        .map(|c| augmented.require_column(c))
        .collect::<Result<Vec<_>, _>>()?;
    let signals = opts
        .signal_columns
        .iter()
        .map(|c| augmented.require_column(c))
        .collect::<Result<Vec<_>, _>>()?;

    let height = augmented.height();
    let mut rows = Vec::new();
    let mut candidates = 0;
    for i in spec.starts(height) {
        candidates += 1;
        let j = i + spec.size;
        let Some(anchor) = augmented.dates().get(j) else {
            continue;
        };
        let Some(profit) = profitability(raw, *anchor, opts.horizon, opts.kind) else {
            continue;
        };
        rows.push(LabeledRow {
            window: window_at(augmented, &features, i, spec.size),
            signals: signals.iter().map(|s| s[j]).collect(),
            profitability: profit,
            label: label_for(profit, opts.min_profit),
        });
    }

    debug!(
        ticker = augmented.ticker(),
        candidates,
        labeled = rows.len(),
        dropped = candidates - rows.len(),
        "formatted dataset"
    );

    Ok(LabeledTable {
        ticker: augmented.ticker().to_string(),
        window_size: spec.size,
        feature_columns,
        signal_columns: opts.signal_columns.clone(),
        rows,
        candidates,
    })
}
