//! Candlestick pattern recognition.
//!
//! Each pattern yields +100 (bullish), -100 (bearish) or 0 per bar. Rules are
//! expressed on single-bar geometry (body, range, shadows) rather than on
//! rolling body averages.

/// Supported pattern names.
pub const CANDLE_PATTERNS: [&str; 4] = ["CDLDOJI", "CDLHAMMER", "CDLENGULFING", "CDLMARUBOZU"];

#[derive(Debug, Clone, Copy)]
struct Candle {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl Candle {
    fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    fn range(&self) -> f64 {
        self.high - self.low
    }

    fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    fn is_void(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .any(|v| v.is_nan())
    }
}

/// Evaluate `pattern` over the bars; `None` for an unsupported pattern name.
pub fn candle_pattern(
    pattern: &str,
    open: &[f64],
    high: &[f64],
    low: &[f64],
    close: &[f64],
) -> Option<Vec<f64>> {
    let rule: fn(Option<Candle>, Candle) -> f64 = match pattern {
        "CDLDOJI" => |_, c| doji(c),
        "CDLHAMMER" => |_, c| hammer(c),
        "CDLENGULFING" => engulfing,
        "CDLMARUBOZU" => |_, c| marubozu(c),
        _ => return None,
    };

    let n = open.len().min(high.len()).min(low.len()).min(close.len());
    let candles: Vec<Candle> = (0..n)
        .map(|i| Candle {
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
        })
        .collect();

    let out = candles
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let prev = if i > 0 { Some(candles[i - 1]) } else { None };
            if c.is_void() || prev.is_some_and(|p| p.is_void()) {
                0.0
            } else {
                rule(prev, c)
            }
        })
        .collect();
    Some(out)
}

fn doji(c: Candle) -> f64 {
    if c.range() > 0.0 && c.body() <= 0.1 * c.range() {
        100.0
    } else {
        0.0
    }
}

fn hammer(c: Candle) -> f64 {
    let body = c.body();
    if c.range() > 0.0
        && body > 0.0
        && c.lower_shadow() >= 2.0 * body
        && c.upper_shadow() <= 0.1 * c.range()
    {
        100.0
    } else {
        0.0
    }
}

fn engulfing(prev: Option<Candle>, c: Candle) -> f64 {
    let Some(p) = prev else {
        return 0.0;
    };
    if p.is_bearish() && c.is_bullish() && c.open <= p.close && c.close >= p.open {
        100.0
    } else if p.is_bullish() && c.is_bearish() && c.open >= p.close && c.close <= p.open {
        -100.0
    } else {
        0.0
    }
}

fn marubozu(c: Candle) -> f64 {
    if c.range() <= 0.0 || c.body() < 0.95 * c.range() {
        0.0
    } else if c.is_bullish() {
        100.0
    } else {
        -100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(pattern: &str, bars: &[(f64, f64, f64, f64)]) -> Vec<f64> {
        let o: Vec<f64> = bars.iter().map(|b| b.0).collect();
        let h: Vec<f64> = bars.iter().map(|b| b.1).collect();
        let l: Vec<f64> = bars.iter().map(|b| b.2).collect();
        let c: Vec<f64> = bars.iter().map(|b| b.3).collect();
        candle_pattern(pattern, &o, &h, &l, &c).unwrap()
    }

    #[test]
    fn doji_detects_tiny_body() {
        let out = eval("CDLDOJI", &[(10.0, 11.0, 9.0, 10.05), (10.0, 11.0, 9.0, 10.9)]);
        assert_eq!(out, vec![100.0, 0.0]);
    }

    #[test]
    fn hammer_detects_long_lower_shadow() {
        let out = eval("CDLHAMMER", &[(10.0, 10.6, 7.0, 10.5)]);
        assert_eq!(out, vec![100.0]);
    }

    #[test]
    fn engulfing_is_signed() {
        let bullish = eval("CDLENGULFING", &[(10.0, 10.2, 9.0, 9.2), (9.0, 10.8, 8.9, 10.5)]);
        assert_eq!(bullish, vec![0.0, 100.0]);
        let bearish = eval("CDLENGULFING", &[(9.2, 10.2, 9.0, 10.0), (10.5, 10.6, 8.8, 9.0)]);
        assert_eq!(bearish, vec![0.0, -100.0]);
    }

    #[test]
    fn marubozu_is_signed() {
        let out = eval("CDLMARUBOZU", &[(10.0, 12.0, 10.0, 12.0), (12.0, 12.0, 10.0, 10.0)]);
        assert_eq!(out, vec![100.0, -100.0]);
    }

    #[test]
    fn unknown_pattern_is_none() {
        assert!(candle_pattern("CDLUNKNOWN", &[], &[], &[], &[]).is_none());
    }
}
