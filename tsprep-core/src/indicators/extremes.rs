//! Rolling maximum / minimum over a lookback window (Donchian-style bands).
//!
//! Lookback: period - 1. A NaN in the window makes that output NaN.

pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, f64::max)
}

pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, f64::min)
}

fn rolling(values: &[f64], period: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
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
        result[i] = window.iter().copied().reduce(pick).unwrap_or(f64::NAN);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn max_and_min_track_window() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0];
        let hi = rolling_max(&values, 3);
        let lo = rolling_min(&values, 3);
        assert!(hi[1].is_nan());
        assert_approx(hi[2], 4.0, DEFAULT_EPSILON);
        assert_approx(hi[4], 5.0, DEFAULT_EPSILON);
        assert_approx(lo[2], 1.0, DEFAULT_EPSILON);
        assert_approx(lo[4], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_in_window() {
        let hi = rolling_max(&[1.0, f64::NAN, 2.0, 3.0], 2);
        assert!(hi[1].is_nan());
        assert!(hi[2].is_nan());
        assert_approx(hi[3], 3.0, DEFAULT_EPSILON);
    }
}
