//! Train/test builder.
//!
//! For each strategy, every prepared asset table under `{raw}/{strategy}/` is
//! stripped of identifier and leakage columns, split by label, optionally
//! scaled with a scaler fitted on its train rows only, and accumulated.
//! Outputs:
//! - `{train_test}/{strategy}/train.parquet`, `test.parquet`
//! - `{train_test}/{strategy}/manifest.json`
//! - `{models}/{strategy}/{asset}_scaler.json` per asset when scaling

use crate::config::{ConfigError, PrepConfig};
use crate::scaler::{FittedScaler, Scaler, ScalerError, ScalerKind};
use crate::split::{stratified_split, Split, SplitError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use tsprep_core::export::{read_parquet, ArtifactSink, TableSink};
use tsprep_core::strategy::StrategyCatalog;
use tsprep_core::PrepError;

pub const LABEL_COLUMN: &str = "label";
pub const MANIFEST_NAME: &str = "manifest";

/// Identifier and leakage columns that never reach a model.
const DROPPED_COLUMNS: &[&str] = &[
    "ticker",
    "window_start_date",
    "window_end_date",
    "shape_rows",
    "shape_cols",
    "profitability",
];

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Prep(#[from] PrepError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Scaler(#[from] ScalerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{strategy}/{asset}: feature columns differ from earlier assets")]
    FeatureMismatch { strategy: String, asset: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// True for raw open/high/low values and their flattened `<field>_<k>` forms.
fn is_raw_price_column(name: &str) -> bool {
    let base = match name.rsplit_once('_') {
        Some((base, k)) if !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => name,
    };
    matches!(base, "open" | "high" | "low")
}

fn is_dropped(name: &str) -> bool {
    DROPPED_COLUMNS.contains(&name) || is_raw_price_column(name)
}

fn float_column(frame: &DataFrame, name: &str) -> Result<Vec<f64>, PrepError> {
    let column = frame
        .column(name)
        .map_err(|_| PrepError::MissingColumn { name: name.into() })?
        .cast(&DataType::Float64)
        .map_err(|e| PrepError::Parquet(format!("cast {name} to f64: {e}")))?;
    let values = column
        .f64()
        .map_err(|e| PrepError::Parquet(format!("{name}: {e}")))?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(values)
}

fn label_column(frame: &DataFrame) -> Result<Vec<i32>, PrepError> {
    let column = frame
        .column(LABEL_COLUMN)
        .map_err(|_| PrepError::MissingColumn { name: LABEL_COLUMN.into() })?
        .cast(&DataType::Int32)
        .map_err(|e| PrepError::Parquet(format!("cast label to i32: {e}")))?;
    column
        .i32()
        .map_err(|e| PrepError::Parquet(format!("label: {e}")))?
        .into_iter()
        .map(|v| v.ok_or_else(|| PrepError::Parquet("null label".into())))
        .collect()
}

/// Model-ready rows: feature columns and the 0/1 label.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    pub feature_names: Vec<String>,
    /// Column-major feature values.
    pub columns: Vec<Vec<f64>>,
    pub labels: Vec<i32>,
}

impl SampleTable {
    pub fn new(feature_names: Vec<String>, columns: Vec<Vec<f64>>, labels: Vec<i32>) -> Result<Self, PrepError> {
        if feature_names.len() != columns.len() {
            return Err(PrepError::LengthMismatch {
                name: "feature_names".into(),
                expected: columns.len(),
                actual: feature_names.len(),
            });
        }
        for (name, column) in feature_names.iter().zip(&columns) {
            if column.len() != labels.len() {
                return Err(PrepError::LengthMismatch {
                    name: name.clone(),
                    expected: labels.len(),
                    actual: column.len(),
                });
            }
        }
        Ok(Self {
            feature_names,
            columns,
            labels,
        })
    }

    /// Read a prepared asset table, keeping only feature columns and the label.
    pub fn from_frame(frame: &DataFrame) -> Result<Self, PrepError> {
        let labels = label_column(frame)?;
        let mut feature_names = Vec::new();
        let mut columns = Vec::new();
        for name in frame.get_column_names() {
            let name = name.as_str();
            if name == LABEL_COLUMN || is_dropped(name) {
                continue;
            }
            columns.push(float_column(frame, name)?);
            feature_names.push(name.to_string());
        }
        Self::new(feature_names, columns, labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| indices.iter().map(|&i| c[i]).collect())
                .collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    pub fn to_frame(&self) -> Result<DataFrame, PrepError> {
        let mut columns: Vec<Column> = self
            .feature_names
            .iter()
            .zip(&self.columns)
            .map(|(name, values)| Column::new(name.as_str().into(), values.clone()))
            .collect();
        columns.push(Column::new(LABEL_COLUMN.into(), self.labels.clone()));
        DataFrame::new(columns).map_err(|e| PrepError::Parquet(format!("dataframe creation: {e}")))
    }
}

/// Collects asset samples for one strategy; finalized once.
#[derive(Debug, Default)]
pub struct DatasetAccumulator {
    feature_names: Option<Vec<String>>,
    columns: Vec<Vec<f64>>,
    labels: Vec<i32>,
}

impl DatasetAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `table`. Fails with `false` when its feature columns differ
    /// from the first table pushed.
    pub fn push(&mut self, table: SampleTable) -> bool {
        match &self.feature_names {
            Some(names) if *names != table.feature_names => return false,
            Some(_) => {
                for (acc, column) in self.columns.iter_mut().zip(table.columns) {
                    acc.extend(column);
                }
            }
            None => {
                self.feature_names = Some(table.feature_names);
                self.columns = table.columns;
            }
        }
        self.labels.extend(table.labels);
        true
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn finish(self) -> SampleTable {
        SampleTable {
            feature_names: self.feature_names.unwrap_or_default(),
            columns: self.columns,
            labels: self.labels,
        }
    }
}

/// Where prepared per-asset tables come from.
pub trait AssetTableSource {
    /// Asset names available for `strategy`, sorted.
    fn assets(&self, strategy: &str) -> Result<Vec<String>, BuildError>;

    fn load(&self, strategy: &str, asset: &str) -> Result<DataFrame, BuildError>;
}

/// Reads `{root}/{strategy}/{asset}.parquet`; subdirectories are ignored.
#[derive(Debug, Clone)]
pub struct ParquetDirSource {
    root: PathBuf,
}

impl ParquetDirSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl AssetTableSource for ParquetDirSource {
    fn assets(&self, strategy: &str) -> Result<Vec<String>, BuildError> {
        let dir = self.root.join(strategy);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut assets = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("parquet") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                assets.push(stem.to_string());
            }
        }
        assets.sort();
        Ok(assets)
    }

    fn load(&self, strategy: &str, asset: &str) -> Result<DataFrame, BuildError> {
        let path = self.root.join(strategy).join(format!("{asset}.parquet"));
        Ok(read_parquet(&path)?)
    }
}

/// One asset after split and scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSplit {
    pub train: SampleTable,
    pub test: SampleTable,
    pub scaler: Option<FittedScaler>,
}

/// Summary persisted next to each strategy's train/test tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub strategy: String,
    pub assets: Vec<String>,
    pub feature_columns: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub seed: u64,
    pub test_fraction: f64,
    pub scaler: ScalerKind,
    pub config_hash: String,
}

/// Paths written for one strategy.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub manifest: BuildManifest,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub scaler_paths: Vec<PathBuf>,
}

pub struct TrainTestBuilder<'a> {
    config: &'a PrepConfig,
}

impl<'a> TrainTestBuilder<'a> {
    pub fn new(config: &'a PrepConfig) -> Self {
        Self { config }
    }

    /// Split one asset and fit its scaler on the train rows.
    pub fn split_asset(&self, table: &SampleTable) -> Result<AssetSplit, BuildError> {
        let Split { train, test } =
            stratified_split(&table.labels, self.config.split.test_fraction, self.config.split.seed)?;
        let mut train = table.select(&train);
        let mut test = table.select(&test);

        let scaler = self.config.split.scaler.fit(&train.columns);
        if let Some(scaler) = &scaler {
            scaler.transform(&mut train.columns)?;
            scaler.transform(&mut test.columns)?;
        }
        Ok(AssetSplit { train, test, scaler })
    }

    /// Build train/test tables for one strategy. `None` when no asset
    /// table exists for it.
    pub fn build_strategy(
        &self,
        strategy: &str,
        source: &dyn AssetTableSource,
        tables: &dyn TableSink,
        artifacts: &impl ArtifactSink,
    ) -> Result<Option<BuildOutput>, BuildError> {
        let assets = source.assets(strategy)?;
        if assets.is_empty() {
            warn!(strategy, "no prepared asset tables, skipping");
            return Ok(None);
        }
        info!(strategy, assets = assets.len(), "building train/test sets");

        let paths = &self.config.paths;
        let mut train_acc = DatasetAccumulator::new();
        let mut test_acc = DatasetAccumulator::new();
        let mut scaler_paths = Vec::new();

        for asset in &assets {
            let table = SampleTable::from_frame(&source.load(strategy, asset)?)?;
            let split = self.split_asset(&table)?;
            debug!(strategy, asset = %asset, train = split.train.len(), test = split.test.len(), "split asset");

            if let Some(scaler) = &split.scaler {
                let path = artifacts.persist(scaler, &paths.models.join(strategy), &format!("{asset}_scaler"))?;
                scaler_paths.push(path);
            }
            let mismatch = || BuildError::FeatureMismatch {
                strategy: strategy.to_string(),
                asset: asset.clone(),
            };
            if !train_acc.push(split.train) {
                return Err(mismatch());
            }
            if !test_acc.push(split.test) {
                return Err(mismatch());
            }
        }

        let train = train_acc.finish();
        let test = test_acc.finish();
        let out_dir = paths.train_test.join(strategy);
        let train_path = tables.write(&train.to_frame()?, &out_dir, "train")?;
        let test_path = tables.write(&test.to_frame()?, &out_dir, "test")?;

        let manifest = BuildManifest {
            strategy: strategy.to_string(),
            assets,
            feature_columns: train.feature_names.clone(),
            train_rows: train.len(),
            test_rows: test.len(),
            seed: self.config.split.seed,
            test_fraction: self.config.split.test_fraction,
            scaler: self.config.split.scaler,
            config_hash: self.config.fingerprint()?,
        };
        artifacts.persist(&manifest, &out_dir, MANIFEST_NAME)?;
        info!(strategy, train = manifest.train_rows, test = manifest.test_rows, "train/test sets written");

        Ok(Some(BuildOutput {
            manifest,
            train_path,
            test_path,
            scaler_paths,
        }))
    }

    /// Build every strategy of the catalog, in document order.
    pub fn build(
        &self,
        strategies: &StrategyCatalog,
        source: &dyn AssetTableSource,
        tables: &dyn TableSink,
        artifacts: &impl ArtifactSink,
    ) -> Result<Vec<BuildOutput>, BuildError> {
        let mut outputs = Vec::new();
        for name in strategies.names() {
            if let Some(output) = self.build_strategy(name, source, tables, artifacts)? {
                outputs.push(output);
            }
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> SampleTable {
        SampleTable::new(
            vec!["rsi_5_0".into(), "rsi_5_1".into()],
            vec![
                (0..n).map(|i| i as f64).collect(),
                (0..n).map(|i| (i * 2) as f64).collect(),
            ],
            (0..n).map(|i| i32::from(i % 4 == 0)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn raw_price_columns_recognized() {
        assert!(is_raw_price_column("open_0"));
        assert!(is_raw_price_column("high_19"));
        assert!(is_raw_price_column("low"));
        assert!(!is_raw_price_column("close_3"));
        assert!(!is_raw_price_column("volume_0"));
        assert!(!is_raw_price_column("rsi_14_0"));
        assert!(!is_raw_price_column("open_x"));
    }

    #[test]
    fn from_frame_drops_leakage_columns() {
        let frame = DataFrame::new(vec![
            Column::new("ticker".into(), vec!["PETR4", "PETR4"]),
            Column::new("shape_rows".into(), vec![2u32, 2]),
            Column::new("open_0".into(), vec![1.0, 2.0]),
            Column::new("close_0".into(), vec![1.5, 2.5]),
            Column::new("rsi_5_0".into(), vec![40.0, 60.0]),
            Column::new("profitability".into(), vec![-0.1, 0.2]),
            Column::new("label".into(), vec![0i32, 1]),
        ])
        .unwrap();
        let table = SampleTable::from_frame(&frame).unwrap();
        assert_eq!(table.feature_names, vec!["close_0", "rsi_5_0"]);
        assert_eq!(table.columns[1], vec![40.0, 60.0]);
        assert_eq!(table.labels, vec![0, 1]);
    }

    #[test]
    fn from_frame_requires_label() {
        let frame = DataFrame::new(vec![Column::new("x".into(), vec![1.0])]).unwrap();
        assert!(matches!(SampleTable::from_frame(&frame), Err(PrepError::MissingColumn { .. })));
    }

    #[test]
    fn accumulator_appends_and_rejects_other_schema() {
        let mut acc = DatasetAccumulator::new();
        assert!(acc.push(table(3)));
        assert!(acc.push(table(2)));
        assert_eq!(acc.len(), 5);

        let other = SampleTable::new(vec!["x".into()], vec![vec![1.0]], vec![0]).unwrap();
        assert!(!acc.push(other));

        let out = acc.finish();
        assert_eq!(out.columns[0], vec![0.0, 1.0, 2.0, 0.0, 1.0]);
        assert_eq!(out.labels.len(), 5);
    }

    #[test]
    fn split_asset_without_scaler_keeps_values() {
        let mut config = PrepConfig::default();
        config.split.scaler = ScalerKind::None;
        let builder = TrainTestBuilder::new(&config);
        let t = table(40);
        let split = builder.split_asset(&t).unwrap();
        assert!(split.scaler.is_none());
        assert_eq!(split.train.len() + split.test.len(), 40);
        assert_eq!(split.test.len(), 8);
        for (row, &label) in split.test.labels.iter().enumerate() {
            let i = split.test.columns[0][row] as usize;
            assert_eq!(t.labels[i], label);
        }
    }
}
