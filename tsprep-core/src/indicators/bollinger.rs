//! Bollinger Bands and rolling standard deviation.
//!
//! - Middle: SMA(x, period)
//! - Upper: middle + nbdevup * stddev(x, period)
//! - Lower: middle - nbdevdn * stddev(x, period)
//!
//! Uses population stddev (divide by N). Lookback: period - 1.

use super::sma::sma;

pub struct BandsOutput {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Rolling population standard deviation scaled by `nbdev`.
pub fn stddev(values: &[f64], period: usize, nbdev: f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        result[i] = nbdev * variance.sqrt();
    }

    result
}

pub fn bbands(values: &[f64], period: usize, nbdevup: f64, nbdevdn: f64) -> BandsOutput {
    let middle = sma(values, period);
    let sd = stddev(values, period, 1.0);

    let upper = middle.iter().zip(&sd).map(|(m, s)| m + nbdevup * s).collect();
    let lower = middle.iter().zip(&sd).map(|(m, s)| m - nbdevdn * s).collect();

    BandsOutput {
        upper,
        middle,
        lower,
    }
}
