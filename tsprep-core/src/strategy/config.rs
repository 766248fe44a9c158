//! Strategy documents.
//!
//! A strategy document is a JSON object keyed by strategy name:
//!
//! ```json
//! {
//!   "trend": {
//!     "description": "moving averages and momentum",
//!     "functions": {
//!       "sma_fast": { "function": "SMA", "params": { "timeperiod": 10 } },
//!       "obv":      { "function": "OBV" }
//!     },
//!     "candles": ["CDLDOJI"],
//!     "custom_columns": { "body": "[close]-[open]" }
//!   }
//! }
//! ```
//!
//! Strategy order, call order and custom column order all follow the
//! document. Custom expressions are parsed when the document is loaded.

use super::expr::Expr;
use super::ordered;
use crate::catalog::IndicatorCatalog;
use crate::domain::PRICE_FIELDS;
use crate::error::PrepError;
use crate::indicators::{IndicatorLibrary, Params};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// One indicator call inside a strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Call id, the key in the document's `functions` object.
    pub id: String,
    pub function: String,
    pub params: Option<Params>,
}

impl FunctionCall {
    /// Declared params, or an empty set when the call has none.
    pub fn params(&self) -> Params {
        self.params.clone().unwrap_or_default()
    }
}

/// A derived column computed from an expression over earlier columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomColumn {
    pub name: String,
    pub source: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyDef {
    pub name: String,
    pub description: String,
    pub functions: Vec<FunctionCall>,
    pub candles: Vec<String>,
    pub custom_columns: Vec<CustomColumn>,
}

#[derive(Debug, Deserialize)]
struct RawCall {
    function: String,
    #[serde(default)]
    params: Option<Params>,
}

#[derive(Debug, Deserialize)]
struct RawStrategy {
    #[serde(default)]
    description: String,
    #[serde(deserialize_with = "ordered::deserialize")]
    functions: Vec<(String, RawCall)>,
    #[serde(default)]
    candles: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_optional_ordered")]
    custom_columns: Option<Vec<(String, String)>>,
}

fn deserialize_optional_ordered<'de, D>(deserializer: D) -> Result<Option<Vec<(String, String)>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    ordered::deserialize(deserializer).map(Some)
}

impl StrategyDef {
    fn from_raw(name: String, raw: RawStrategy) -> Result<Self, PrepError> {
        let mut seen = HashSet::new();
        let mut functions = Vec::with_capacity(raw.functions.len());
        for (id, call) in raw.functions {
            if !seen.insert(id.clone()) {
                return Err(PrepError::Config(format!(
                    "strategy '{name}' declares call id '{id}' more than once"
                )));
            }
            functions.push(FunctionCall {
                id,
                function: call.function,
                params: call.params,
            });
        }

        let custom_columns = raw
            .custom_columns
            .unwrap_or_default()
            .into_iter()
            .map(|(column, source)| {
                Expr::parse(&source).map(|expr| CustomColumn {
                    name: column,
                    source,
                    expr,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            description: raw.description,
            functions,
            candles: raw.candles.unwrap_or_default(),
            custom_columns,
        })
    }

    /// Check every call, candle and custom column against the catalog and
    /// library without touching any data.
    ///
    /// Column references in custom expressions must name a price field or a
    /// column produced earlier in the same strategy.
    pub fn validate(&self, catalog: &IndicatorCatalog, library: &dyn IndicatorLibrary) -> Result<(), PrepError> {
        let mut available: HashSet<String> = PRICE_FIELDS.iter().map(|f| f.to_string()).collect();

        for call in &self.functions {
            let spec = catalog
                .get(&call.function)
                .filter(|_| library.supports(&call.function))
                .ok_or_else(|| PrepError::UnknownIndicator {
                    name: call.function.clone(),
                })?;
            let params = call.params();
            spec.check_params(&params)?;
            available.extend(spec.output_names(&params)?);
        }

        for pattern in &self.candles {
            if !library.supports(pattern) {
                return Err(PrepError::UnknownIndicator { name: pattern.clone() });
            }
            available.insert(pattern.clone());
        }

        for column in &self.custom_columns {
            if let Some(missing) = column.expr.columns().into_iter().find(|c| !available.contains(*c)) {
                return Err(PrepError::MissingColumn {
                    name: missing.to_string(),
                });
            }
            available.insert(column.name.clone());
        }

        Ok(())
    }
}

/// All strategies of one document, in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrategyCatalog {
    strategies: Vec<StrategyDef>,
}

impl StrategyCatalog {
    pub fn from_json_str(json: &str) -> Result<Self, PrepError> {
        let invalid = |e: serde_json::Error| PrepError::Config(format!("strategy document: {e}"));
        let mut de = serde_json::Deserializer::from_str(json);
        let raw: Vec<(String, RawStrategy)> = ordered::deserialize(&mut de).map_err(invalid)?;
        de.end().map_err(invalid)?;

        let mut names = HashSet::new();
        let mut strategies = Vec::with_capacity(raw.len());
        for (name, entry) in raw {
            if !names.insert(name.clone()) {
                return Err(PrepError::Config(format!("strategy '{name}' is declared more than once")));
            }
            strategies.push(StrategyDef::from_raw(name, entry)?);
        }
        Ok(Self { strategies })
    }

    pub fn from_path(path: &Path) -> Result<Self, PrepError> {
        if !path.exists() {
            return Err(PrepError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Validate every strategy; the first failure aborts.
    pub fn validate(&self, catalog: &IndicatorCatalog, library: &dyn IndicatorLibrary) -> Result<(), PrepError> {
        self.strategies
            .iter()
            .try_for_each(|s| s.validate(catalog, library))
    }

    pub fn get(&self, name: &str) -> Option<&StrategyDef> {
        self.strategies.iter().find(|s| s.name == name)
    }

    pub fn strategies(&self) -> &[StrategyDef] {
        &self.strategies
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
