//! Per-asset dataset preparation.
//!
//! Layout under the raw dataset directory:
//! - `{raw}/{strategy}/{ticker}.parquet`: labeled windows
//! - `{raw}/{strategy}/augmented/{ticker}.parquet`: augmented table, when
//!   `keep_augmented` is set

use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use tsprep_core::applicator::IndicatorApplicator;
use tsprep_core::dataset::{format_dataset, FormatOptions};
use tsprep_core::domain::{FeatureTable, PriceSeries};
use tsprep_core::export::TableSink;
use tsprep_core::strategy::{run_strategies, StrategyCatalog};
use tsprep_core::PrepError;

pub const AUGMENTED_DIR: &str = "augmented";

#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub format: FormatOptions,
    pub raw_dir: PathBuf,
    pub keep_augmented: bool,
}

/// Outcome for one (strategy, asset) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetReport {
    pub strategy: String,
    pub ticker: String,
    pub candidates: usize,
    pub rows: usize,
    /// Written labeled table; `None` when no window could be labeled.
    pub path: Option<PathBuf>,
}

/// Run every strategy over one asset and export the results.
///
/// An asset whose labeled table comes out empty is reported and skipped
/// rather than exported.
pub fn prepare_asset(
    series: &PriceSeries,
    strategies: &StrategyCatalog,
    applicator: &IndicatorApplicator<'_>,
    opts: &PrepareOptions,
    sink: &dyn TableSink,
) -> Result<Vec<AssetReport>, PrepError> {
    let table = FeatureTable::from_prices(series);
    let mut reports = Vec::with_capacity(strategies.len());

    for output in run_strategies(strategies, applicator, &table) {
        let output = output?;
        let strategy_dir = opts.raw_dir.join(output.name);

        if opts.keep_augmented {
            sink.write(&output.table.to_frame()?, &strategy_dir.join(AUGMENTED_DIR), series.ticker())?;
        }

        let labeled = format_dataset(series, &output.table, &opts.format)?;
        let path = if labeled.is_empty() {
            warn!(
                strategy = output.name,
                ticker = series.ticker(),
                candidates = labeled.candidates,
                "no labeled windows, skipping export"
            );
            None
        } else {
            Some(sink.write(&labeled.to_frame()?, &strategy_dir, series.ticker())?)
        };

        reports.push(AssetReport {
            strategy: output.name.to_string(),
            ticker: series.ticker().to_string(),
            candidates: labeled.candidates,
            rows: labeled.len(),
            path,
        });
    }

    Ok(reports)
}

/// Prepare every asset of the universe, in order.
pub fn prepare_universe(
    universe: &[PriceSeries],
    strategies: &StrategyCatalog,
    applicator: &IndicatorApplicator<'_>,
    opts: &PrepareOptions,
    sink: &dyn TableSink,
) -> Result<Vec<AssetReport>, PrepError> {
    let mut reports = Vec::new();
    for (i, series) in universe.iter().enumerate() {
        info!(ticker = series.ticker(), asset = i + 1, total = universe.len(), "preparing asset");
        reports.extend(prepare_asset(series, strategies, applicator, opts, sink)?);
    }
    let rows: usize = reports.iter().map(|r| r.rows).sum();
    info!(assets = universe.len(), strategies = strategies.len(), rows, "preparation finished");
    Ok(reports)
}
