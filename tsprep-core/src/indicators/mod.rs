//! Indicator computations over plain `f64` series.
//!
//! Every function returns a series as long as its input, with NaN over the
//! warm-up region. `library::BuiltinLibrary` exposes them by their
//! conventional upper-case names (SMA, BBANDS, CDLDOJI, ...) behind the
//! `IndicatorLibrary` trait.

pub mod adx;
pub mod aroon;
pub mod atr;
pub mod bollinger;
pub mod candles;
pub mod ema;
pub mod extremes;
pub mod library;
pub mod macd;
pub mod momentum;
pub mod obv;
pub mod parabolic_sar;
pub mod params;
pub mod rsi;
pub mod sma;

pub use candles::CANDLE_PATTERNS;
pub use library::{BuiltinLibrary, IndicatorLibrary};
pub use params::{ParamValue, Params};

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
