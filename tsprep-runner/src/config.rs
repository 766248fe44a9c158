//! Run configuration: a TOML file plus environment-provided paths.
//!
//! ```toml
//! [window]
//! window_size = 20
//! stride = 5
//!
//! [label]
//! horizon = 5
//! min_profit = 0.0
//! kind = "linear"
//! excluded_columns = ["volume"]
//! signal_columns = []
//!
//! [split]
//! test_fraction = 0.2
//! seed = 42
//! scaler = "standard"
//!
//! [paths]
//! raw_dataset = "data/raw"
//! ```
//!
//! Every section is optional. `TSPREP_RAW_DATASET_PATH`,
//! `TSPREP_TRAIN_TEST_PATH` and `TSPREP_MODEL_PATH` override `[paths]`;
//! a `.env` file in the working directory is read first.

use crate::scaler::ScalerKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tsprep_core::dataset::FormatOptions;
use tsprep_core::label::ProfitKind;

pub const RAW_DATASET_ENV: &str = "TSPREP_RAW_DATASET_PATH";
pub const TRAIN_TEST_ENV: &str = "TSPREP_TRAIN_TEST_PATH";
pub const MODEL_ENV: &str = "TSPREP_MODEL_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSection {
    pub window_size: usize,
    pub stride: usize,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            window_size: 20,
            stride: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSection {
    pub horizon: usize,
    pub min_profit: f64,
    pub kind: ProfitKind,
    pub excluded_columns: Vec<String>,
    pub signal_columns: Vec<String>,
}

impl Default for LabelSection {
    fn default() -> Self {
        Self {
            horizon: 5,
            min_profit: 0.0,
            kind: ProfitKind::Linear,
            excluded_columns: Vec::new(),
            signal_columns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitSection {
    pub test_fraction: f64,
    pub seed: u64,
    pub scaler: ScalerKind,
}

impl Default for SplitSection {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            scaler: ScalerKind::Standard,
        }
    }
}

/// Curation rules for the asset universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSection {
    /// Minimum rows inside the lookback period.
    pub required_rows: usize,
    pub lookback_days: i64,
    /// Average volume over the lookback period must exceed this.
    pub min_avg_volume: f64,
    /// History kept per asset, counted back from its last bar.
    pub history_years: u32,
}

impl Default for UniverseSection {
    fn default() -> Self {
        Self {
            required_rows: 250,
            lookback_days: 365,
            min_avg_volume: 200_000.0,
            history_years: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub raw_dataset: PathBuf,
    pub train_test: PathBuf,
    pub models: PathBuf,
    pub strategies: PathBuf,
    /// Indicator catalog; the built-in one when absent.
    pub catalog: Option<PathBuf>,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            raw_dataset: PathBuf::from("data/raw"),
            train_test: PathBuf::from("data/train_test"),
            models: PathBuf::from("models"),
            strategies: PathBuf::from("config/strategies.json"),
            catalog: None,
        }
    }
}

/// Complete preparation config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    pub window: WindowSection,
    pub label: LabelSection,
    pub split: SplitSection,
    pub universe: UniverseSection,
    pub paths: PathsSection,
}

impl PrepConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// File (or defaults when `path` is `None`), then `.env`, then process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_path(p)?,
            None => Self::default(),
        };
        dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override `[paths]` from environment variables found by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets = [
            (RAW_DATASET_ENV, &mut self.paths.raw_dataset),
            (TRAIN_TEST_ENV, &mut self.paths.train_test),
            (MODEL_ENV, &mut self.paths.models),
        ];
        for (key, target) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = PathBuf::from(value);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.window_size == 0 || self.window.stride == 0 {
            return Err(ConfigError::Invalid("window_size and stride must be at least 1".into()));
        }
        if self.label.horizon == 0 {
            return Err(ConfigError::Invalid("label horizon must be at least 1".into()));
        }
        let f = self.split.test_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(ConfigError::Invalid(format!("test_fraction must be in (0, 1), got {f}")));
        }
        Ok(())
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            window_size: self.window.window_size,
            stride: self.window.stride,
            horizon: self.label.horizon,
            min_profit: self.label.min_profit,
            kind: self.label.kind,
            excluded_columns: self.label.excluded_columns.clone(),
            signal_columns: self.label.signal_columns.clone(),
        }
    }

    /// Deterministic hash of the effective configuration.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = PrepConfig::from_toml_str("").unwrap();
        assert_eq!(config, PrepConfig::default());
        assert_eq!(config.window.window_size, 20);
        assert_eq!(config.universe.required_rows, 250);
    }

    #[test]
    fn sections_parse() {
        let config = PrepConfig::from_toml_str(
            r#"
            [window]
            window_size = 10
            stride = 2

            [label]
            horizon = 3
            min_profit = 0.01
            kind = "log"
            signal_columns = ["CDLDOJI"]

            [split]
            test_fraction = 0.25
            seed = 7
            scaler = "minmax"

            [paths]
            raw_dataset = "/tmp/raw"
            "#,
        )
        .unwrap();
        assert_eq!(config.window.stride, 2);
        assert_eq!(config.label.kind, ProfitKind::Log);
        assert_eq!(config.split.scaler, ScalerKind::MinMax);
        assert_eq!(config.paths.raw_dataset, PathBuf::from("/tmp/raw"));
        assert_eq!(config.paths.models, PathBuf::from("models"));

        let opts = config.format_options();
        assert_eq!(opts.horizon, 3);
        assert_eq!(opts.signal_columns, vec!["CDLDOJI"]);
    }

    #[test]
    fn env_overrides_paths() {
        let mut config = PrepConfig::default();
        config.apply_env(|key| match key {
            RAW_DATASET_ENV => Some("/data/raw".into()),
            MODEL_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.paths.raw_dataset, PathBuf::from("/data/raw"));
        assert_eq!(config.paths.models, PathBuf::from("models"));
    }

    #[test]
    fn invalid_values_rejected() {
        for bad in [
            "[window]\nstride = 0",
            "[label]\nhorizon = 0",
            "[split]\ntest_fraction = 1.0",
            "[split]\ntest_fraction = 0.0",
        ] {
            assert!(matches!(PrepConfig::from_toml_str(bad), Err(ConfigError::Invalid(_))), "{bad}");
        }
    }

    #[test]
    fn unknown_scaler_is_parse_error() {
        assert!(matches!(
            PrepConfig::from_toml_str("[split]\nscaler = \"robust\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            PrepConfig::from_path(Path::new("/nonexistent/prep.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let a = PrepConfig::default();
        let mut b = PrepConfig::default();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.split.seed = 43;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
