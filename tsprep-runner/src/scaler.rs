//! Feature scalers fitted on training rows only.
//!
//! Columns are scaled independently. Statistics skip NaN values, so
//! indicator warm-up regions do not poison the fit; NaN inputs stay NaN.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScalerError {
    #[error("scaler used before fit")]
    NotFitted,

    #[error("scaler fitted on {expected} columns, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
}

/// Fit on one set of columns, transform any set of the same width.
pub trait Scaler {
    fn fit(&mut self, columns: &[Vec<f64>]);

    fn width(&self) -> Option<usize>;

    fn transform_column(&self, index: usize, values: &mut [f64]);

    fn transform(&self, columns: &mut [Vec<f64>]) -> Result<(), ScalerError> {
        let width = self.width().ok_or(ScalerError::NotFitted)?;
        if width != columns.len() {
            return Err(ScalerError::WidthMismatch {
                expected: width,
                actual: columns.len(),
            });
        }
        for (i, column) in columns.iter_mut().enumerate() {
            self.transform_column(i, column);
        }
        Ok(())
    }
}

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

/// Zero mean, unit variance (population variance).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    fitted: bool,
}

impl Scaler for StandardScaler {
    fn fit(&mut self, columns: &[Vec<f64>]) {
        self.mean.clear();
        self.scale.clear();
        for column in columns {
            let n = finite(column).count();
            let (mean, scale) = if n == 0 {
                (0.0, 1.0)
            } else {
                let mean = finite(column).sum::<f64>() / n as f64;
                let var = finite(column).map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
                let sd = var.sqrt();
                (mean, if sd > 0.0 { sd } else { 1.0 })
            };
            self.mean.push(mean);
            self.scale.push(scale);
        }
        self.fitted = true;
    }

    fn width(&self) -> Option<usize> {
        self.fitted.then_some(self.mean.len())
    }

    fn transform_column(&self, index: usize, values: &mut [f64]) {
        let (mean, scale) = (self.mean[index], self.scale[index]);
        for v in values {
            *v = (*v - mean) / scale;
        }
    }
}

/// Rescale to [0, 1] using the training min and max.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub range: Vec<f64>,
    fitted: bool,
}

impl Scaler for MinMaxScaler {
    fn fit(&mut self, columns: &[Vec<f64>]) {
        self.min.clear();
        self.range.clear();
        for column in columns {
            let lo = finite(column).fold(f64::INFINITY, f64::min);
            let hi = finite(column).fold(f64::NEG_INFINITY, f64::max);
            let (min, range) = if lo.is_finite() && hi > lo {
                (lo, hi - lo)
            } else if lo.is_finite() {
                (lo, 1.0)
            } else {
                (0.0, 1.0)
            };
            self.min.push(min);
            self.range.push(range);
        }
        self.fitted = true;
    }

    fn width(&self) -> Option<usize> {
        self.fitted.then_some(self.min.len())
    }

    fn transform_column(&self, index: usize, values: &mut [f64]) {
        let (min, range) = (self.min[index], self.range[index]);
        for v in values {
            *v = (*v - min) / range;
        }
    }
}

/// Scaler choice in the run config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalerKind {
    None,
    #[default]
    Standard,
    MinMax,
}

impl ScalerKind {
    /// Fit a scaler of this kind; `None` for `ScalerKind::None`.
    pub fn fit(self, columns: &[Vec<f64>]) -> Option<FittedScaler> {
        match self {
            ScalerKind::None => None,
            ScalerKind::Standard => {
                let mut s = StandardScaler::default();
                s.fit(columns);
                Some(FittedScaler::Standard(s))
            }
            ScalerKind::MinMax => {
                let mut s = MinMaxScaler::default();
                s.fit(columns);
                Some(FittedScaler::MinMax(s))
            }
        }
    }
}

/// A fitted scaler as persisted per strategy and asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FittedScaler {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

impl Scaler for FittedScaler {
    fn fit(&mut self, columns: &[Vec<f64>]) {
        match self {
            FittedScaler::Standard(s) => s.fit(columns),
            FittedScaler::MinMax(s) => s.fit(columns),
        }
    }

    fn width(&self) -> Option<usize> {
        match self {
            FittedScaler::Standard(s) => s.width(),
            FittedScaler::MinMax(s) => s.width(),
        }
    }

    fn transform_column(&self, index: usize, values: &mut [f64]) {
        match self {
            FittedScaler::Standard(s) => s.transform_column(index, values),
            FittedScaler::MinMax(s) => s.transform_column(index, values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn standard_centers_and_scales() {
        let mut s = StandardScaler::default();
        s.fit(&[vec![1.0, 2.0, 3.0, 4.0]]);
        assert_close(s.mean[0], 2.5);
        assert_close(s.scale[0], 1.25f64.sqrt());

        let mut cols = vec![vec![2.5, 4.0]];
        s.transform(&mut cols).unwrap();
        assert_close(cols[0][0], 0.0);
        assert_close(cols[0][1], 1.5 / 1.25f64.sqrt());
    }

    #[test]
    fn nan_ignored_in_fit_and_kept_in_transform() {
        let mut s = StandardScaler::default();
        s.fit(&[vec![f64::NAN, 2.0, 4.0]]);
        assert_close(s.mean[0], 3.0);
        let mut cols = vec![vec![f64::NAN, 3.0]];
        s.transform(&mut cols).unwrap();
        assert!(cols[0][0].is_nan());
        assert_close(cols[0][1], 0.0);
    }

    #[test]
    fn constant_column_does_not_divide_by_zero() {
        let mut s = StandardScaler::default();
        s.fit(&[vec![5.0, 5.0]]);
        let mut cols = vec![vec![5.0, 6.0]];
        s.transform(&mut cols).unwrap();
        assert_eq!(cols[0], vec![0.0, 1.0]);

        let mut m = MinMaxScaler::default();
        m.fit(&[vec![5.0, 5.0]]);
        let mut cols = vec![vec![5.0]];
        m.transform(&mut cols).unwrap();
        assert_eq!(cols[0], vec![0.0]);
    }

    #[test]
    fn minmax_maps_training_range_to_unit() {
        let mut m = MinMaxScaler::default();
        m.fit(&[vec![10.0, 20.0, 15.0]]);
        let mut cols = vec![vec![10.0, 20.0, 25.0]];
        m.transform(&mut cols).unwrap();
        assert_eq!(cols[0], vec![0.0, 1.0, 1.5]);
    }

    #[test]
    fn unfitted_and_width_errors() {
        let s = StandardScaler::default();
        assert_eq!(s.transform(&mut [vec![1.0]]), Err(ScalerError::NotFitted));

        let fitted = ScalerKind::Standard.fit(&[vec![1.0], vec![2.0]]).unwrap();
        assert_eq!(
            fitted.transform(&mut [vec![1.0]]),
            Err(ScalerError::WidthMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn kind_none_fits_nothing() {
        assert!(ScalerKind::None.fit(&[vec![1.0]]).is_none());
    }

    #[test]
    fn fitted_scaler_serializes_with_kind_tag() {
        let fitted = ScalerKind::MinMax.fit(&[vec![0.0, 2.0]]).unwrap();
        let json = serde_json::to_string(&fitted).unwrap();
        assert!(json.contains("\"kind\":\"minmax\""));
        let back: FittedScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fitted);
    }
}
