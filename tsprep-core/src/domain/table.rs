//! FeatureTable: a price table extended with derived columns.
//!
//! Tables are never mutated in place by pipeline stages: `with_column` and
//! friends return a new table, leaving the input untouched.

use super::price::{PriceSeries, PRICE_FIELDS};
use crate::error::PrepError;
use chrono::NaiveDate;
use polars::prelude::*;

/// A named column of values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Date-indexed table of `f64` columns for a single ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    ticker: String,
    dates: Vec<NaiveDate>,
    columns: Vec<FeatureColumn>,
}

impl FeatureTable {
    pub fn new(ticker: impl Into<String>, dates: Vec<NaiveDate>) -> Self {
        Self {
            ticker: ticker.into(),
            dates,
            columns: Vec::new(),
        }
    }

    /// Table holding the OHLCV columns of a price series.
    pub fn from_prices(prices: &PriceSeries) -> Self {
        let mut table = Self::new(prices.ticker(), prices.dates());
        for field in PRICE_FIELDS {
            // field() only returns None for unknown names
            if let Some(values) = prices.field(field) {
                table.columns.push(FeatureColumn {
                    name: field.to_string(),
                    values,
                });
            }
        }
        table
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn height(&self) -> usize {
        self.dates.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn require_column(&self, name: &str) -> Result<&[f64], PrepError> {
        self.column(name).ok_or_else(|| PrepError::MissingColumn {
            name: name.to_string(),
        })
    }

    /// Set a column in place: replaces a same-named column at its position,
    /// otherwise appends.
    pub fn set_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), PrepError> {
        let name = name.into();
        if values.len() != self.height() {
            return Err(PrepError::LengthMismatch {
                name,
                expected: self.height(),
                actual: values.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(FeatureColumn { name, values }),
        }
        Ok(())
    }

    /// Copy of this table with one more column.
    pub fn with_column(&self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, PrepError> {
        let mut out = self.clone();
        out.set_column(name, values)?;
        Ok(out)
    }

    /// Convert to a polars DataFrame with `ticker` and `dt_price` leading columns.
    pub fn to_frame(&self) -> Result<DataFrame, PrepError> {
        let mut columns = Vec::with_capacity(self.columns.len() + 2);
        columns.push(Column::new(
            "ticker".into(),
            vec![self.ticker.as_str(); self.height()],
        ));
        columns.push(date_column("dt_price", &self.dates)?);
        for c in &self.columns {
            columns.push(Column::new(c.name.as_str().into(), c.values.clone()));
        }
        DataFrame::new(columns).map_err(|e| PrepError::Parquet(format!("dataframe creation: {e}")))
    }
}

// ── Date helpers ─────────────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

pub(crate) fn days_to_date(days: i32) -> NaiveDate {
    epoch() + chrono::Duration::days(days as i64)
}

/// Build a polars `Date` column from chrono dates.
pub(crate) fn date_column(name: &str, dates: &[NaiveDate]) -> Result<Column, PrepError> {
    let days: Vec<i32> = dates.iter().copied().map(date_to_days).collect();
    Column::new(name.into(), days)
        .cast(&DataType::Date)
        .map_err(|e| PrepError::Parquet(format!("date cast: {e}")))
}

/// Read a polars `Date` column back into chrono dates.
pub fn read_date_column(frame: &DataFrame, name: &str) -> Result<Vec<NaiveDate>, PrepError> {
    let column = frame.column(name).map_err(|_| PrepError::MissingColumn {
        name: name.to_string(),
    })?;
    let physical = column
        .cast(&DataType::Int32)
        .map_err(|e| PrepError::Parquet(format!("{name} column type: {e}")))?;
    let ca = physical
        .i32()
        .map_err(|e| PrepError::Parquet(format!("{name} column type: {e}")))?;
    ca.into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.map(days_to_date)
                .ok_or_else(|| PrepError::Parquet(format!("null {name} at row {i}")))
        })
        .collect()
}
