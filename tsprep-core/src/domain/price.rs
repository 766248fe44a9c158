//! Price history: the raw OHLCV input of the pipeline.

use crate::error::PrepError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Price fields that may be passed positionally to an indicator.
pub const PRICE_FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Returns true if `name` is one of the OHLCV price fields.
pub fn is_price_field(name: &str) -> bool {
    PRICE_FIELDS.contains(&name)
}

/// Daily OHLCV bar for a single ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Sector/segment classification joined onto the price history by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub market: Option<String>,
    pub segment_id: Option<i64>,
    pub subsector_id: Option<i64>,
    pub sector_id: Option<i64>,
}

/// Ordered price history of one ticker.
///
/// Dates are strictly increasing, which makes `(ticker, date)` unique and
/// lets `position` run as a binary search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<PriceBar>,
    classification: Option<Classification>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, PrepError> {
        let ticker = ticker.into();
        if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(PrepError::InvalidPriceSeries {
                ticker,
                reason: format!("dates not strictly increasing at {} -> {}", w[0].date, w[1].date),
            });
        }
        Ok(Self {
            ticker,
            bars,
            classification: None,
        })
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Values of one OHLCV field, or `None` for an unknown field name.
    pub fn field(&self, name: &str) -> Option<Vec<f64>> {
        let pick: fn(&PriceBar) -> f64 = match name {
            "open" => |b| b.open,
            "high" => |b| b.high,
            "low" => |b| b.low,
            "close" => |b| b.close,
            "volume" => |b| b.volume,
            _ => return None,
        };
        Some(self.bars.iter().map(pick).collect())
    }

    /// Index of `date` in the series.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    /// Keep only bars on or after `start`.
    pub fn since(&self, start: NaiveDate) -> Self {
        let from = self.bars.partition_point(|b| b.date < start);
        Self {
            ticker: self.ticker.clone(),
            bars: self.bars[from..].to_vec(),
            classification: self.classification.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn rejects_unordered_dates() {
        let err = PriceSeries::new("PETR4", vec![bar(3, 10.0), bar(2, 11.0)]).unwrap_err();
        assert!(matches!(err, PrepError::InvalidPriceSeries { .. }));
    }

    #[test]
    fn rejects_duplicate_dates() {
        assert!(PriceSeries::new("PETR4", vec![bar(2, 10.0), bar(2, 11.0)]).is_err());
    }

    #[test]
    fn position_finds_dates() {
        let s = PriceSeries::new("PETR4", vec![bar(2, 10.0), bar(3, 11.0), bar(5, 12.0)]).unwrap();
        assert_eq!(s.position(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()), Some(2));
        assert_eq!(s.position(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()), None);
    }

    #[test]
    fn field_lookup() {
        let s = PriceSeries::new("PETR4", vec![bar(2, 10.0), bar(3, 11.0)]).unwrap();
        assert_eq!(s.field("high"), Some(vec![11.0, 12.0]));
        assert_eq!(s.field("adj_close"), None);
    }

    #[test]
    fn since_trims_history() {
        let s = PriceSeries::new("PETR4", vec![bar(2, 10.0), bar(3, 11.0), bar(5, 12.0)]).unwrap();
        let trimmed = s.since(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed.closes(), vec![11.0, 12.0]);
    }
}
