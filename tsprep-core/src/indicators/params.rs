//! Keyword parameters passed to indicator computations.

use crate::error::PrepError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single keyword parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            ParamValue::Int(v) => v as f64,
            ParamValue::Float(v) => v,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

/// Keyword parameters of one indicator call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy in tests and programmatic strategies.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A window length parameter; must be a whole number >= 1.
    pub fn period(&self, indicator: &str, name: &str, default: usize) -> Result<usize, PrepError> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        let raw = value.as_f64();
        if raw.fract() != 0.0 || raw < 1.0 {
            return Err(PrepError::InvalidParameter {
                indicator: indicator.to_string(),
                param: name.to_string(),
                reason: format!("expected a whole number >= 1, got {value}"),
            });
        }
        Ok(raw as usize)
    }

    /// A real-valued parameter; must be finite.
    pub fn real(&self, indicator: &str, name: &str, default: f64) -> Result<f64, PrepError> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        let raw = value.as_f64();
        if !raw.is_finite() {
            return Err(PrepError::InvalidParameter {
                indicator: indicator.to_string(),
                param: name.to_string(),
                reason: format!("expected a finite number, got {value}"),
            });
        }
        Ok(raw)
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_ints_and_floats() {
        let p: Params = serde_json::from_str(r#"{"timeperiod": 20, "nbdevup": 2.5}"#).unwrap();
        assert_eq!(p.get("timeperiod"), Some(&ParamValue::Int(20)));
        assert_eq!(p.get("nbdevup"), Some(&ParamValue::Float(2.5)));
    }

    #[test]
    fn display_is_template_friendly() {
        assert_eq!(ParamValue::Int(20).to_string(), "20");
        assert_eq!(ParamValue::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn period_defaults_and_validates() {
        let p = Params::new().with("timeperiod", 0i64);
        assert_eq!(Params::new().period("SMA", "timeperiod", 30).unwrap(), 30);
        assert!(matches!(
            p.period("SMA", "timeperiod", 30),
            Err(PrepError::InvalidParameter { .. })
        ));
        let p = Params::new().with("timeperiod", 2.5);
        assert!(p.period("SMA", "timeperiod", 30).is_err());
    }
}
