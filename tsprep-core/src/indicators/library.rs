//! The indicator library seam and the built-in implementation.
//!
//! The catalog and applicator never compute anything themselves: they hand
//! positional input series plus keyword parameters to an `IndicatorLibrary`
//! and receive one or more output series back, each as long as the inputs.

use super::params::Params;
use super::{adx, aroon, atr, bollinger, candles, ema, extremes, macd, momentum, obv, parabolic_sar, rsi, sma};
use crate::error::PrepError;

/// A technical-analysis function library.
pub trait IndicatorLibrary: Send + Sync {
    /// Human-readable name of this library.
    fn name(&self) -> &str;

    /// Whether `function` can be computed by this library.
    fn supports(&self, function: &str) -> bool;

    /// Number of output series `function` produces, if known up front.
    fn output_count(&self, function: &str) -> Option<usize>;

    /// Compute `function` over positional `inputs` with keyword `params`.
    fn compute(
        &self,
        function: &str,
        inputs: &[&[f64]],
        params: &Params,
    ) -> Result<Vec<Vec<f64>>, PrepError>;
}

/// Functions implemented by `BuiltinLibrary`: (name, positional inputs, outputs).
const FUNCTIONS: &[(&str, usize, usize)] = &[
    ("SMA", 1, 1),
    ("EMA", 1, 1),
    ("WMA", 1, 1),
    ("RSI", 1, 1),
    ("ROC", 1, 1),
    ("MOM", 1, 1),
    ("MACD", 1, 3),
    ("ATR", 3, 1),
    ("ADX", 3, 1),
    ("BBANDS", 1, 3),
    ("STDDEV", 1, 1),
    ("AROON", 2, 2),
    ("SAR", 2, 1),
    ("MAX", 1, 1),
    ("MIN", 1, 1),
    ("OBV", 2, 1),
    ("CDLDOJI", 4, 1),
    ("CDLHAMMER", 4, 1),
    ("CDLENGULFING", 4, 1),
    ("CDLMARUBOZU", 4, 1),
];

/// Pure-Rust implementations of the common indicators and candle patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLibrary;

impl BuiltinLibrary {
    pub fn new() -> Self {
        Self
    }

    /// Names of every supported function.
    pub fn functions() -> impl Iterator<Item = &'static str> {
        FUNCTIONS.iter().map(|(name, _, _)| *name)
    }

    fn arity(function: &str) -> Option<(usize, usize)> {
        FUNCTIONS
            .iter()
            .find(|(name, _, _)| *name == function)
            .map(|&(_, inputs, outputs)| (inputs, outputs))
    }
}

impl IndicatorLibrary for BuiltinLibrary {
    fn name(&self) -> &str {
        "builtin"
    }

    fn supports(&self, function: &str) -> bool {
        Self::arity(function).is_some()
    }

    fn output_count(&self, function: &str) -> Option<usize> {
        Self::arity(function).map(|(_, outputs)| outputs)
    }

    fn compute(
        &self,
        function: &str,
        inputs: &[&[f64]],
        params: &Params,
    ) -> Result<Vec<Vec<f64>>, PrepError> {
        let (expected_inputs, _) = Self::arity(function).ok_or_else(|| PrepError::UnknownIndicator {
            name: function.to_string(),
        })?;
        if inputs.len() != expected_inputs {
            return Err(PrepError::InvalidParameter {
                indicator: function.to_string(),
                param: "inputs".to_string(),
                reason: format!("expected {expected_inputs} input series, got {}", inputs.len()),
            });
        }

        let period = |default| params.period(function, "timeperiod", default);

        let out = match function {
            "SMA" => vec![sma::sma(inputs[0], period(30)?)],
            "EMA" => vec![ema::ema(inputs[0], period(30)?)],
            "WMA" => vec![sma::wma(inputs[0], period(30)?)],
            "RSI" => vec![rsi::rsi(inputs[0], period(14)?)],
            "ROC" => vec![momentum::roc(inputs[0], period(10)?)],
            "MOM" => vec![momentum::momentum(inputs[0], period(10)?)],
            "MACD" => {
                let out = macd::macd(
                    inputs[0],
                    params.period(function, "fastperiod", 12)?,
                    params.period(function, "slowperiod", 26)?,
                    params.period(function, "signalperiod", 9)?,
                );
                vec![out.macd, out.signal, out.hist]
            }
            "ATR" => vec![atr::atr(inputs[0], inputs[1], inputs[2], period(14)?)],
            "ADX" => vec![adx::adx(inputs[0], inputs[1], inputs[2], period(14)?)],
            "BBANDS" => {
                let out = bollinger::bbands(
                    inputs[0],
                    period(5)?,
                    params.real(function, "nbdevup", 2.0)?,
                    params.real(function, "nbdevdn", 2.0)?,
                );
                vec![out.upper, out.middle, out.lower]
            }
            "STDDEV" => vec![bollinger::stddev(
                inputs[0],
                period(5)?,
                params.real(function, "nbdev", 1.0)?,
            )],
            "AROON" => {
                let out = aroon::aroon(inputs[0], inputs[1], period(14)?);
                vec![out.down, out.up]
            }
            "SAR" => vec![parabolic_sar::parabolic_sar(
                inputs[0],
                inputs[1],
                params.real(function, "acceleration", 0.02)?,
                params.real(function, "maximum", 0.2)?,
            )],
            "MAX" => vec![extremes::rolling_max(inputs[0], period(30)?)],
            "MIN" => vec![extremes::rolling_min(inputs[0], period(30)?)],
            "OBV" => vec![obv::obv(inputs[0], inputs[1])],
            pattern => {
                let out = candles::candle_pattern(pattern, inputs[0], inputs[1], inputs[2], inputs[3])
                    .ok_or_else(|| PrepError::UnknownIndicator {
                        name: pattern.to_string(),
                    })?;
                vec![out]
            }
        };

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_function_computes() {
        let lib = BuiltinLibrary::new();
        let series: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        for (name, inputs, outputs) in FUNCTIONS {
            let args: Vec<&[f64]> = vec![series.as_slice(); *inputs];
            let out = lib.compute(name, &args, &Params::new()).unwrap();
            assert_eq!(out.len(), *outputs, "{name}");
            assert!(out.iter().all(|s| s.len() == series.len()), "{name}");
        }
    }

    #[test]
    fn candle_patterns_are_all_listed() {
        for pattern in candles::CANDLE_PATTERNS {
            assert!(BuiltinLibrary::new().supports(pattern));
        }
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = BuiltinLibrary::new()
            .compute("NOPE", &[], &Params::new())
            .unwrap_err();
        assert!(matches!(err, PrepError::UnknownIndicator { .. }));
    }

    #[test]
    fn wrong_input_count_is_rejected() {
        let x = [1.0, 2.0];
        let err = BuiltinLibrary::new()
            .compute("ATR", &[&x], &Params::new())
            .unwrap_err();
        assert!(matches!(err, PrepError::InvalidParameter { .. }));
    }

    #[test]
    fn params_reach_the_function() {
        let x: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let out = BuiltinLibrary::new()
            .compute("SMA", &[&x], &Params::new().with("timeperiod", 2i64))
            .unwrap();
        assert!(out[0][0].is_nan());
        assert_eq!(out[0][1], 1.5);
    }
}
