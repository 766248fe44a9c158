//! tsprep runner: configuration, price providers, per-asset preparation and
//! train/test building on top of `tsprep-core`.
//!
//! - TOML run config with environment path overrides
//! - CSV and Parquet price providers plus universe curation
//! - Per-asset pipeline: strategies, windows, labels, Parquet export
//! - Stratified split, train-only scalers, strategy-level train/test sets

pub mod builder;
pub mod config;
pub mod data_loader;
pub mod logging;
pub mod prepare;
pub mod scaler;
pub mod split;

pub use builder::{
    AssetSplit, AssetTableSource, BuildError, BuildManifest, BuildOutput, DatasetAccumulator,
    ParquetDirSource, SampleTable, TrainTestBuilder,
};
pub use config::{ConfigError, PrepConfig};
pub use data_loader::{
    open_provider, CsvPriceProvider, LoadError, ParquetPriceProvider, PriceProvider, UniverseFilter,
};
pub use logging::init_logging;
pub use prepare::{prepare_asset, prepare_universe, AssetReport, PrepareOptions};
pub use scaler::{FittedScaler, MinMaxScaler, Scaler, ScalerError, ScalerKind, StandardScaler};
pub use split::{stratified_split, Split, SplitError};
