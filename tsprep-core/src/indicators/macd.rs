//! Moving Average Convergence/Divergence.
//!
//! macd = EMA(fast) - EMA(slow); signal = EMA(macd, signal_period);
//! hist = macd - signal. Three output series, in that order.

use super::ema::ema;

pub struct MacdOutput {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub hist: Vec<f64>,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdOutput {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&line, signal_period);
    let hist = line.iter().zip(&signal).map(|(m, s)| m - s).collect();

    MacdOutput {
        macd: line,
        signal,
        hist,
    }
}
