//! Forward profitability and binary labels.
//!
//! The baseline is the close of the bar *after* the anchor, modelling a
//! one-bar execution delay: a signal read at the anchor's close can only be
//! acted on at the next bar.

use crate::domain::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfitKind {
    #[default]
    Linear,
    Log,
}

impl ProfitKind {
    /// Return from `base` to `target`.
    pub fn ret(self, base: f64, target: f64) -> f64 {
        match self {
            ProfitKind::Linear => target / base - 1.0,
            ProfitKind::Log => (target / base).ln(),
        }
    }
}

/// Profitability for the anchor at position `p` of `closes`.
///
/// `None` when `p + horizon >= closes.len()`.
pub fn profitability_at(closes: &[f64], p: usize, horizon: usize, kind: ProfitKind) -> Option<f64> {
    if p + horizon >= closes.len() {
        return None;
    }
    Some(kind.ret(closes[p + 1], closes[p + horizon]))
}

/// Profitability for `anchor`, located in `raw` by date.
///
/// Absent when the date is not in the series or the horizon runs past the
/// last bar.
pub fn profitability(raw: &PriceSeries, anchor: NaiveDate, horizon: usize, kind: ProfitKind) -> Option<f64> {
    let p = raw.position(anchor)?;
    let bars = raw.bars();
    if p + horizon >= bars.len() {
        return None;
    }
    Some(kind.ret(bars[p + 1].close, bars[p + horizon].close))
}

/// `1` when `profit >= min_profit`, else `0`.
pub fn label_for(profit: f64, min_profit: f64) -> u8 {
    u8::from(profit >= min_profit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceBar;

    fn series(closes: &[f64]) -> PriceSeries {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                date: base + chrono::Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1.0,
            })
            .collect();
        PriceSeries::new("ABEV3", bars).unwrap()
    }

    #[test]
    fn baseline_is_bar_after_anchor() {
        let raw = series(&[1.0, 10.0, 11.0, 12.0, 15.0]);
        let anchor = raw.bars()[0].date;
        let p = profitability(&raw, anchor, 4, ProfitKind::Linear).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn log_kind() {
        let raw = series(&[1.0, 10.0, 20.0]);
        let p = profitability(&raw, raw.bars()[0].date, 2, ProfitKind::Log).unwrap();
        assert!((p - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn absent_past_history() {
        let raw = series(&[1.0, 2.0, 3.0, 4.0]);
        assert!(profitability(&raw, raw.bars()[0].date, 3, ProfitKind::Linear).is_some());
        assert!(profitability(&raw, raw.bars()[1].date, 3, ProfitKind::Linear).is_none());
        assert!(profitability(&raw, raw.bars()[3].date, 1, ProfitKind::Linear).is_none());
    }

    #[test]
    fn absent_for_unknown_anchor() {
        let raw = series(&[1.0, 2.0, 3.0]);
        let anchor = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
        assert!(profitability(&raw, anchor, 1, ProfitKind::Linear).is_none());
    }

    #[test]
    fn horizon_one_is_flat() {
        assert_eq!(profitability_at(&[5.0, 7.0, 9.0], 0, 1, ProfitKind::Linear), Some(0.0));
    }

    #[test]
    fn label_threshold_is_inclusive() {
        assert_eq!(label_for(0.0, 0.0), 1);
        assert_eq!(label_for(-0.0001, 0.0), 0);
        assert_eq!(label_for(0.05, 0.02), 1);
    }

    #[test]
    fn kind_deserializes_lowercase() {
        let k: ProfitKind = serde_json::from_str("\"log\"").unwrap();
        assert_eq!(k, ProfitKind::Log);
    }
}
