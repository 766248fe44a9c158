//! ADX: Average Directional Index (Wilder).
//!
//! 1. +DM / -DM from consecutive bars
//! 2. Wilder-smooth +DM, -DM and TR
//! 3. +DI, -DI = 100 * smoothed DM / smoothed TR
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = Wilder-smoothed DX
//!
//! Lookback: 2 * period.

use super::atr::{true_range, wilder_smooth};

pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    if n < 2 {
        return vec![f64::NAN; n];
    }

    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];

    for i in 1..n {
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        if up.is_nan() || down.is_nan() {
            continue;
        }
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }

    let mut tr = true_range(high, low, close);
    tr[0] = f64::NAN;
    let smooth_tr = wilder_smooth(&tr, period);
    let smooth_plus = wilder_smooth(&plus_dm, period);
    let smooth_minus = wilder_smooth(&minus_dm, period);

    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        if smooth_tr[i].is_nan()
            || smooth_plus[i].is_nan()
            || smooth_minus[i].is_nan()
            || smooth_tr[i] == 0.0
        {
            continue;
        }
        let plus_di = 100.0 * smooth_plus[i] / smooth_tr[i];
        let minus_di = 100.0 * smooth_minus[i] / smooth_tr[i];
        let di_sum = plus_di + minus_di;
        dx[i] = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };
    }

    wilder_smooth(&dx, period)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adx_bounds() {
        let high: Vec<f64> = (0..40).map(|i| 105.0 + (i as f64 * 0.5).sin() * 4.0 + i as f64 * 0.3).collect();
        let low: Vec<f64> = high.iter().map(|h| h - 6.0).collect();
        let close: Vec<f64> = high.iter().map(|h| h - 2.5).collect();
        let result = adx(&high, &low, &close, 5);
        assert!(result[..9].iter().all(|v| v.is_nan()));
        let valid: Vec<f64> = result.into_iter().filter(|v| !v.is_nan()).collect();
        assert!(!valid.is_empty());
        assert!(valid.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn strong_uptrend_has_high_adx() {
        let high: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let low: Vec<f64> = high.iter().map(|h| h - 1.0).collect();
        let close: Vec<f64> = high.iter().map(|h| h - 0.5).collect();
        let result = adx(&high, &low, &close, 5);
        assert!(result[29] > 90.0);
    }
}
