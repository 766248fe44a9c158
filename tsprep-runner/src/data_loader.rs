//! Price history loading and universe curation.
//!
//! Providers read a long table ordered by ticker then date:
//!
//! `ticker, dt_price, open, high, low, close, volume[, market, segment_id,
//! subsector_id, sector_id]`
//!
//! and group it into one `PriceSeries` per ticker. `UniverseFilter` then
//! keeps liquid assets with a full recent year of history and trims each
//! to the configured number of years.

use crate::config::UniverseSection;
use chrono::{Months, NaiveDate};
use polars::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use tsprep_core::domain::{read_date_column, Classification, PriceBar, PriceSeries};
use tsprep_core::PrepError;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("price file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported price file format '{0}' (expected .csv or .parquet)")]
    UnsupportedFormat(String),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet: {0}")]
    Parquet(String),

    #[error("price data: {0}")]
    Prep(#[from] PrepError),

    #[error("no price rows in {}", .0.display())]
    Empty(PathBuf),
}

/// A read-only source of price history for the asset universe.
pub trait PriceProvider {
    fn name(&self) -> &str;

    /// Every series the source holds, one per ticker, in first-seen order.
    fn load(&self) -> Result<Vec<PriceSeries>, LoadError>;
}

/// One row of the long price table.
#[derive(Debug, Clone, Deserialize)]
struct PriceRecord {
    ticker: String,
    dt_price: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    segment_id: Option<i64>,
    #[serde(default)]
    subsector_id: Option<i64>,
    #[serde(default)]
    sector_id: Option<i64>,
}

impl PriceRecord {
    fn bar(&self) -> PriceBar {
        PriceBar {
            date: self.dt_price,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }

    fn classification(&self) -> Option<Classification> {
        let any = self.market.is_some()
            || self.segment_id.is_some()
            || self.subsector_id.is_some()
            || self.sector_id.is_some();
        any.then(|| Classification {
            market: self.market.clone(),
            segment_id: self.segment_id,
            subsector_id: self.subsector_id,
            sector_id: self.sector_id,
        })
    }
}

/// Group records by ticker, sort each group by date and validate.
fn group_records(records: Vec<PriceRecord>) -> Result<Vec<PriceSeries>, LoadError> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Vec<PriceBar>, Option<Classification>)> = HashMap::new();

    for record in records {
        let entry = groups.entry(record.ticker.clone()).or_insert_with(|| {
            order.push(record.ticker.clone());
            (Vec::new(), None)
        });
        entry.0.push(record.bar());
        if entry.1.is_none() {
            entry.1 = record.classification();
        }
    }

    order
        .into_iter()
        .filter_map(|ticker| groups.remove(&ticker).map(|g| (ticker, g)))
        .map(|(ticker, (mut bars, classification))| {
            bars.sort_by_key(|b| b.date);
            let series = PriceSeries::new(ticker, bars)?;
            Ok(match classification {
                Some(c) => series.with_classification(c),
                None => series,
            })
        })
        .collect()
}

/// Long price table in CSV with a header row.
pub struct CsvPriceProvider {
    path: PathBuf,
}

impl CsvPriceProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PriceProvider for CsvPriceProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self) -> Result<Vec<PriceSeries>, LoadError> {
        if !self.path.exists() {
            return Err(LoadError::NotFound(self.path.clone()));
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let records = reader
            .deserialize::<PriceRecord>()
            .collect::<Result<Vec<_>, _>>()?;
        if records.is_empty() {
            return Err(LoadError::Empty(self.path.clone()));
        }
        debug!(path = %self.path.display(), rows = records.len(), "read price csv");
        group_records(records)
    }
}

/// Long price table in Parquet.
pub struct ParquetPriceProvider {
    path: PathBuf,
}

impl ParquetPriceProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, LoadError> {
    let column = df
        .column(name)
        .map_err(|_| PrepError::MissingColumn { name: name.to_string() })?
        .cast(&DataType::Float64)
        .map_err(|e| LoadError::Parquet(format!("{name}: {e}")))?;
    let ca = column.f64().map_err(|e| LoadError::Parquet(format!("{name}: {e}")))?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn optional_i64_values(df: &DataFrame, name: &str, n: usize) -> Result<Vec<Option<i64>>, LoadError> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; n]);
    };
    let column = column
        .cast(&DataType::Int64)
        .map_err(|e| LoadError::Parquet(format!("{name}: {e}")))?;
    let ca = column.i64().map_err(|e| LoadError::Parquet(format!("{name}: {e}")))?;
    Ok(ca.into_iter().collect())
}

fn optional_str_values(df: &DataFrame, name: &str, n: usize) -> Result<Vec<Option<String>>, LoadError> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; n]);
    };
    let ca = column.str().map_err(|e| LoadError::Parquet(format!("{name}: {e}")))?;
    Ok(ca.into_iter().map(|v| v.map(String::from)).collect())
}

impl PriceProvider for ParquetPriceProvider {
    fn name(&self) -> &str {
        "parquet"
    }

    fn load(&self) -> Result<Vec<PriceSeries>, LoadError> {
        if !self.path.exists() {
            return Err(LoadError::NotFound(self.path.clone()));
        }
        let df = LazyFrame::scan_parquet(&self.path, Default::default())
            .and_then(|lf| lf.collect())
            .map_err(|e| LoadError::Parquet(format!("{}: {e}", self.path.display())))?;
        let n = df.height();
        if n == 0 {
            return Err(LoadError::Empty(self.path.clone()));
        }

        let tickers = df
            .column("ticker")
            .map_err(|_| PrepError::MissingColumn { name: "ticker".into() })?
            .str()
            .map_err(|e| LoadError::Parquet(format!("ticker: {e}")))?
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                t.map(String::from)
                    .ok_or_else(|| LoadError::Parquet(format!("null ticker at row {i}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let dates = read_date_column(&df, "dt_price")?;
        let open = f64_values(&df, "open")?;
        let high = f64_values(&df, "high")?;
        let low = f64_values(&df, "low")?;
        let close = f64_values(&df, "close")?;
        let volume = f64_values(&df, "volume")?;
        let market = optional_str_values(&df, "market", n)?;
        let segment = optional_i64_values(&df, "segment_id", n)?;
        let subsector = optional_i64_values(&df, "subsector_id", n)?;
        let sector = optional_i64_values(&df, "sector_id", n)?;

        let records = tickers
            .into_iter()
            .enumerate()
            .map(|(i, ticker)| PriceRecord {
                ticker,
                dt_price: dates[i],
                open: open[i],
                high: high[i],
                low: low[i],
                close: close[i],
                volume: volume[i],
                market: market[i].clone(),
                segment_id: segment[i],
                subsector_id: subsector[i],
                sector_id: sector[i],
            })
            .collect();
        debug!(path = %self.path.display(), rows = n, "read price parquet");
        group_records(records)
    }
}

/// Pick a provider from the file extension.
pub fn open_provider(path: &Path) -> Result<Box<dyn PriceProvider>, LoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => Ok(Box::new(CsvPriceProvider::new(path))),
        Some("parquet") | Some("pq") => Ok(Box::new(ParquetPriceProvider::new(path))),
        other => Err(LoadError::UnsupportedFormat(other.unwrap_or("").to_string())),
    }
}

/// Universe curation rules.
///
/// The reference date is the latest bar across all loaded series, so an
/// asset that stopped trading falls out of the lookback window.
#[derive(Debug, Clone)]
pub struct UniverseFilter {
    rules: UniverseSection,
}

impl UniverseFilter {
    pub fn new(rules: UniverseSection) -> Self {
        Self { rules }
    }

    /// Whether `series` passes the liquidity and history rules at `reference`.
    pub fn accepts(&self, series: &PriceSeries, reference: NaiveDate) -> bool {
        let start = reference - chrono::Duration::days(self.rules.lookback_days);
        let recent: Vec<&PriceBar> = series
            .bars()
            .iter()
            .filter(|b| b.date > start && b.date <= reference)
            .collect();
        if recent.len() < self.rules.required_rows {
            return false;
        }
        let avg_volume = recent.iter().map(|b| b.volume).sum::<f64>() / recent.len() as f64;
        avg_volume > self.rules.min_avg_volume
    }

    /// Keep accepted series, each trimmed to the last `history_years`.
    pub fn apply(&self, universe: Vec<PriceSeries>) -> Vec<PriceSeries> {
        let Some(reference) = universe.iter().filter_map(|s| s.bars().last()).map(|b| b.date).max() else {
            return universe;
        };
        let history_start = reference
            .checked_sub_months(Months::new(12 * self.rules.history_years))
            .unwrap_or(NaiveDate::MIN);

        let total = universe.len();
        let kept: Vec<PriceSeries> = universe
            .into_iter()
            .filter(|s| {
                let ok = self.accepts(s, reference);
                if !ok {
                    debug!(ticker = s.ticker(), "excluded from universe");
                }
                ok
            })
            .map(|s| s.since(history_start))
            .collect();
        info!(total, kept = kept.len(), %reference, "universe filtered");
        kept
    }
}
