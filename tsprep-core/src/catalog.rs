//! Indicator catalog: name → required inputs, parameters and output names.
//!
//! Loaded once per run from a JSON document keyed by category and validated
//! against the indicator library before any strategy runs, so a catalog entry
//! that names a missing function or declares the wrong number of outputs is a
//! startup error rather than a failure halfway through a run.

use crate::domain::is_price_field;
use crate::error::PrepError;
use crate::indicators::{IndicatorLibrary, Params};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../func_defs.json");

/// An output column naming template such as `sma_{timeperiod}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    prefix: String,
    placeholder: Option<String>,
    suffix: String,
}

impl OutputTemplate {
    pub fn parse(template: &str) -> Result<Self, PrepError> {
        let malformed = || PrepError::Config(format!("malformed output template '{template}'"));

        let Some(open) = template.find('{') else {
            if template.contains('}') {
                return Err(malformed());
            }
            return Ok(Self {
                prefix: template.to_string(),
                placeholder: None,
                suffix: String::new(),
            });
        };
        let close = template[open..].find('}').map(|i| open + i).ok_or_else(malformed)?;
        let placeholder = &template[open + 1..close];
        let suffix = &template[close + 1..];
        if placeholder.is_empty() || suffix.contains(['{', '}']) || placeholder.contains('{') {
            return Err(malformed());
        }

        Ok(Self {
            prefix: template[..open].to_string(),
            placeholder: Some(placeholder.to_string()),
            suffix: suffix.to_string(),
        })
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    /// Concrete column name for one call.
    pub fn resolve(&self, indicator: &str, params: &Params) -> Result<String, PrepError> {
        match &self.placeholder {
            None => Ok(self.prefix.clone()),
            Some(name) => {
                let value = params.get(name).ok_or_else(|| PrepError::MissingParameter {
                    indicator: indicator.to_string(),
                    param: name.clone(),
                })?;
                Ok(format!("{}{value}{}", self.prefix, self.suffix))
            }
        }
    }
}

impl fmt::Display for OutputTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.placeholder {
            Some(p) => write!(f, "{}{{{p}}}{}", self.prefix, self.suffix),
            None => f.write_str(&self.prefix),
        }
    }
}

/// Catalog entry for one indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSpec {
    pub name: String,
    pub category: String,
    /// Declared inputs in order: price fields and keyword parameter names.
    pub input_params: Vec<String>,
    pub output_templates: Vec<OutputTemplate>,
}

impl IndicatorSpec {
    /// Price fields passed positionally, in declared order.
    pub fn price_inputs(&self) -> impl Iterator<Item = &str> {
        self.input_params
            .iter()
            .map(String::as_str)
            .filter(|p| is_price_field(p))
    }

    /// Keyword parameters every call must supply.
    pub fn required_kwargs(&self) -> impl Iterator<Item = &str> {
        self.input_params
            .iter()
            .map(String::as_str)
            .filter(|p| !is_price_field(p))
    }

    /// First required keyword parameter missing from `params`.
    pub fn check_params(&self, params: &Params) -> Result<(), PrepError> {
        match self.required_kwargs().find(|p| !params.contains(p)) {
            Some(missing) => Err(PrepError::MissingParameter {
                indicator: self.name.clone(),
                param: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Resolve every output template against the call's parameters.
    pub fn output_names(&self, params: &Params) -> Result<Vec<String>, PrepError> {
        self.output_templates
            .iter()
            .map(|t| t.resolve(&self.name, params))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawSpec {
    input_params: Vec<String>,
    return_values: Vec<String>,
}

/// Immutable registry of indicator specs.
#[derive(Debug, Clone)]
pub struct IndicatorCatalog {
    specs: Vec<IndicatorSpec>,
    index: HashMap<String, usize>,
}

impl IndicatorCatalog {
    pub fn from_json_str(json: &str) -> Result<Self, PrepError> {
        let raw: BTreeMap<String, BTreeMap<String, RawSpec>> =
            serde_json::from_str(json).map_err(|e| PrepError::Config(format!("indicator catalog: {e}")))?;

        let mut specs = Vec::new();
        let mut index = HashMap::new();
        for (category, entries) in raw {
            for (name, entry) in entries {
                if index.contains_key(&name) {
                    return Err(PrepError::Config(format!(
                        "indicator '{name}' is declared in more than one category"
                    )));
                }
                if entry.return_values.is_empty() {
                    return Err(PrepError::Config(format!("indicator '{name}' declares no outputs")));
                }
                let output_templates = entry
                    .return_values
                    .iter()
                    .map(|t| OutputTemplate::parse(t))
                    .collect::<Result<Vec<_>, _>>()?;
                index.insert(name.clone(), specs.len());
                specs.push(IndicatorSpec {
                    name,
                    category: category.clone(),
                    input_params: entry.input_params,
                    output_templates,
                });
            }
        }

        Ok(Self { specs, index })
    }

    pub fn from_path(path: &Path) -> Result<Self, PrepError> {
        if !path.exists() {
            return Err(PrepError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// The catalog shipped with the crate, matching `BuiltinLibrary`.
    pub fn builtin() -> Result<Self, PrepError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Load from `path` if given, else the built-in catalog; then validate.
    pub fn load(path: Option<&Path>, library: &dyn IndicatorLibrary) -> Result<Self, PrepError> {
        let catalog = match path {
            Some(p) => Self::from_path(p)?,
            None => Self::builtin()?,
        };
        catalog.validate(library)?;
        Ok(catalog)
    }

    /// Check every entry against the functions `library` provides.
    pub fn validate(&self, library: &dyn IndicatorLibrary) -> Result<(), PrepError> {
        for spec in &self.specs {
            if !library.supports(&spec.name) {
                return Err(PrepError::UnknownIndicator {
                    name: spec.name.clone(),
                });
            }
            if let Some(actual) = library.output_count(&spec.name) {
                if actual != spec.output_templates.len() {
                    return Err(PrepError::OutputArityMismatch {
                        indicator: spec.name.clone(),
                        expected: spec.output_templates.len(),
                        actual,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&IndicatorSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    pub fn specs(&self) -> &[IndicatorSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
