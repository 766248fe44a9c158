//! Table and artifact sinks.
//!
//! Layout: `{dir}/{name}.parquet` for tables, `{dir}/{name}.json` for
//! artifacts. Both overwrite an existing file. Writes are not atomic: a
//! failure midway can leave a truncated file behind.

use crate::error::PrepError;
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination for tabular datasets.
pub trait TableSink {
    /// Persist `frame` as `name` under `dir` and return the written path.
    fn write(&self, frame: &DataFrame, dir: &Path, name: &str) -> Result<PathBuf, PrepError>;
}

/// Destination for serializable artifacts (fitted scalers, manifests).
pub trait ArtifactSink {
    fn persist<T: Serialize + ?Sized>(&self, value: &T, dir: &Path, name: &str) -> Result<PathBuf, PrepError>;
}

/// `name` with `.{ext}` appended unless it already ends with it. Dots
/// inside the name (`BRK.A`) are kept.
fn normalized_path(dir: &Path, name: &str, ext: &str) -> PathBuf {
    let suffix = format!(".{ext}");
    if name.ends_with(&suffix) {
        dir.join(name)
    } else {
        dir.join(format!("{name}{suffix}"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetSink;

impl TableSink for ParquetSink {
    fn write(&self, frame: &DataFrame, dir: &Path, name: &str) -> Result<PathBuf, PrepError> {
        if frame.height() == 0 {
            return Err(PrepError::EmptyDataset);
        }
        fs::create_dir_all(dir)?;
        let path = normalized_path(dir, name, "parquet");
        let file = fs::File::create(&path)?;
        ParquetWriter::new(file)
            .finish(&mut frame.clone())
            .map_err(|e| PrepError::Parquet(format!("write {}: {e}", path.display())))?;
        info!(path = %path.display(), rows = frame.height(), "exported table");
        Ok(path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArtifactSink;

impl ArtifactSink for JsonArtifactSink {
    fn persist<T: Serialize + ?Sized>(&self, value: &T, dir: &Path, name: &str) -> Result<PathBuf, PrepError> {
        fs::create_dir_all(dir)?;
        let path = normalized_path(dir, name, "json");
        let json = serde_json::to_string_pretty(value).map_err(|e| PrepError::Serialization(e.to_string()))?;
        fs::write(&path, json)?;
        info!(path = %path.display(), "persisted artifact");
        Ok(path)
    }
}

/// Load an artifact written by `JsonArtifactSink`.
pub fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, PrepError> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| PrepError::Serialization(format!("{}: {e}", path.display())))
}

/// Read a whole Parquet file.
pub fn read_parquet(path: &Path) -> Result<DataFrame, PrepError> {
    let file = fs::File::open(path)?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| PrepError::Parquet(format!("read {}: {e}", path.display())))
}
