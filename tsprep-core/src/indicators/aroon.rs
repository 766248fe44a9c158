//! Aroon: time since the highest high / lowest low as a percentage.
//!
//! Aroon Up = 100 * (period - bars_since_highest_high) / period
//! Aroon Down = 100 * (period - bars_since_lowest_low) / period
//! Window spans period + 1 bars; ties resolve to the most recent bar.
//! Lookback: period.

pub struct AroonOutput {
    pub down: Vec<f64>,
    pub up: Vec<f64>,
}

pub fn aroon(high: &[f64], low: &[f64], period: usize) -> AroonOutput {
    let n = high.len().min(low.len());
    let mut up = vec![f64::NAN; n];
    let mut down = vec![f64::NAN; n];

    if period == 0 || n <= period {
        return AroonOutput { down, up };
    }

    for i in period..n {
        let start = i - period;
        let highs = &high[start..=i];
        let lows = &low[start..=i];

        if !highs.iter().any(|v| v.is_nan()) {
            let offset = most_recent_extreme(highs, |candidate, best| candidate >= best);
            up[i] = 100.0 * offset as f64 / period as f64;
        }
        if !lows.iter().any(|v| v.is_nan()) {
            let offset = most_recent_extreme(lows, |candidate, best| candidate <= best);
            down[i] = 100.0 * offset as f64 / period as f64;
        }
    }

    AroonOutput { down, up }
}

/// Offset of the extreme value within the window (0 = oldest).
fn most_recent_extreme(window: &[f64], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = window[0];
    let mut best_offset = 0;
    for (j, &v) in window.iter().enumerate().skip(1) {
        if better(v, best) {
            best = v;
            best_offset = j;
        }
    }
    best_offset
}
