//! Momentum (MOM) and Rate of Change (ROC).
//!
//! MOM[t] = x[t] - x[t-period]
//! ROC[t] = (x[t] - x[t-period]) / x[t-period] * 100
//! Lookback: period.

pub fn momentum(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    for i in period..n {
        result[i] = values[i] - values[i - period];
    }
    result
}

pub fn roc(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    for i in period..n {
        let prev = values[i - period];
        if prev != 0.0 {
            result[i] = (values[i] - prev) / prev * 100.0;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn roc_basic() {
        let result = roc(&[100.0, 110.0, 121.0], 1);
        assert!(result[0].is_nan());
        assert_approx(result[1], 10.0, DEFAULT_EPSILON);
        assert_approx(result[2], 10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_zero_base_is_nan() {
        let result = roc(&[0.0, 5.0], 1);
        assert!(result[1].is_nan());
    }

    #[test]
    fn momentum_is_difference() {
        let result = momentum(&[1.0, 4.0, 9.0, 16.0], 2);
        assert!(result[1].is_nan());
        assert_approx(result[2], 8.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
    }
}
