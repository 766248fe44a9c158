//! Strategy interpreter: turns a price table into one augmented table per
//! strategy.

use super::config::{StrategyCatalog, StrategyDef};
use crate::applicator::IndicatorApplicator;
use crate::domain::FeatureTable;
use crate::error::PrepError;
use crate::indicators::{IndicatorLibrary, Params};
use tracing::{debug, info};

/// Raw candle signals are in [-100, 100]; stored values are in [-1, 1].
pub const CANDLE_SCALE: f64 = 100.0;

/// The augmented table produced for one strategy.
#[derive(Debug, Clone)]
pub struct StrategyOutput<'s> {
    pub name: &'s str,
    pub definition: &'s StrategyDef,
    pub table: FeatureTable,
}

/// Lazily apply every strategy of `strategies` to `table`, in document
/// order.
///
/// Nothing is computed until the iterator is advanced. Each item starts
/// from a fresh copy of `table`; re-running means calling this again.
pub fn run_strategies<'s>(
    strategies: &'s StrategyCatalog,
    applicator: &'s IndicatorApplicator<'s>,
    table: &'s FeatureTable,
) -> impl Iterator<Item = Result<StrategyOutput<'s>, PrepError>> + 's {
    strategies.strategies().iter().map(move |def| {
        apply_strategy(def, applicator, table).map(|augmented| StrategyOutput {
            name: &def.name,
            definition: def,
            table: augmented,
        })
    })
}

/// Run one strategy: indicator calls, then candle patterns, then custom
/// columns.
pub fn apply_strategy(
    def: &StrategyDef,
    applicator: &IndicatorApplicator<'_>,
    table: &FeatureTable,
) -> Result<FeatureTable, PrepError> {
    info!(strategy = %def.name, ticker = table.ticker(), "processing strategy: {}", def.description);

    let mut current = table.clone();
    for call in &def.functions {
        debug!(call = %call.id, function = %call.function, "applying");
        current = applicator.apply(&current, &call.function, &call.params())?;
    }

    if !def.candles.is_empty() {
        current = apply_candles(&current, &def.candles, applicator.library())?;
    }

    for column in &def.custom_columns {
        let values = column.expr.evaluate(&current)?;
        current.set_column(column.name.clone(), values)?;
    }

    Ok(current)
}

fn apply_candles(
    table: &FeatureTable,
    patterns: &[String],
    library: &dyn IndicatorLibrary,
) -> Result<FeatureTable, PrepError> {
    let inputs = ["open", "high", "low", "close"]
        .into_iter()
        .map(|field| table.require_column(field))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = table.clone();
    for pattern in patterns {
        if !library.supports(pattern) {
            return Err(PrepError::UnknownIndicator { name: pattern.clone() });
        }
        let mut series = library.compute(pattern, &inputs, &Params::new())?;
        if series.len() != 1 {
            return Err(PrepError::OutputArityMismatch {
                indicator: pattern.clone(),
                expected: 1,
                actual: series.len(),
            });
        }
        let values = series.remove(0).into_iter().map(|v| v / CANDLE_SCALE).collect();
        out.set_column(pattern.clone(), values)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::IndicatorCatalog;
    use crate::indicators::BuiltinLibrary;
    use chrono::NaiveDate;

    fn prices(n: usize) -> FeatureTable {
        let base = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let dates = (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect();
        let mut t = FeatureTable::new("VALE3", dates);
        t.set_column("open", vec![100.0; n]).unwrap();
        t.set_column("high", vec![105.0; n]).unwrap();
        t.set_column("low", vec![99.0; n]).unwrap();
        t.set_column("close", vec![103.0; n]).unwrap();
        t.set_column("volume", vec![5000.0; n]).unwrap();
        t
    }

    const DOC: &str = r#"{
        "first": {
            "description": "averages",
            "functions": {
                "a": { "function": "SMA", "params": { "timeperiod": 3 } },
                "b": { "function": "EMA", "params": { "timeperiod": 4 } }
            },
            "candles": ["CDLMARUBOZU", "CDLDOJI"],
            "custom_columns": { "body": "[close]-[open]", "gap": "[body]/[close]" }
        },
        "second": {
            "description": "volume only",
            "functions": { "v": { "function": "OBV" } }
        }
    }"#;

    #[test]
    fn yields_one_output_per_strategy_in_order() {
        let strategies = StrategyCatalog::from_json_str(DOC).unwrap();
        let catalog = IndicatorCatalog::builtin().unwrap();
        let lib = BuiltinLibrary::new();
        let applicator = IndicatorApplicator::new(&catalog, &lib);
        let input = prices(10);

        let outputs: Vec<_> = run_strategies(&strategies, &applicator, &input)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].name, "first");
        assert_eq!(outputs[1].name, "second");
        assert_eq!(outputs[1].table.column_names(), vec!["open", "high", "low", "close", "volume", "obv"]);
    }

    #[test]
    fn stages_run_in_order() {
        let strategies = StrategyCatalog::from_json_str(DOC).unwrap();
        let catalog = IndicatorCatalog::builtin().unwrap();
        let lib = BuiltinLibrary::new();
        let applicator = IndicatorApplicator::new(&catalog, &lib);
        let input = prices(10);

        let first = apply_strategy(strategies.get("first").unwrap(), &applicator, &input).unwrap();
        assert_eq!(
            &first.column_names()[5..],
            &["sma_3", "ema_4", "CDLMARUBOZU", "CDLDOJI", "body", "gap"]
        );
        assert_eq!(first.height(), input.height());
        assert_eq!(first.column("body").unwrap()[0], 3.0);
        assert_eq!(first.column("gap").unwrap()[0], 3.0 / 103.0);
    }

    #[test]
    fn candle_signals_are_scaled() {
        let strategies = StrategyCatalog::from_json_str(DOC).unwrap();
        let catalog = IndicatorCatalog::builtin().unwrap();
        let lib = BuiltinLibrary::new();
        let applicator = IndicatorApplicator::new(&catalog, &lib);
        let first = apply_strategy(strategies.get("first").unwrap(), &applicator, &prices(5)).unwrap();
        for col in ["CDLMARUBOZU", "CDLDOJI"] {
            assert!(first
                .column(col)
                .unwrap()
                .iter()
                .all(|v| (-1.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn lazy_until_advanced() {
        let doc = r#"{
            "ok": { "functions": { "s": { "function": "SMA", "params": { "timeperiod": 2 } } } },
            "broken": { "functions": { "r": { "function": "RSI" } } }
        }"#;
        let strategies = StrategyCatalog::from_json_str(doc).unwrap();
        let catalog = IndicatorCatalog::builtin().unwrap();
        let lib = BuiltinLibrary::new();
        let applicator = IndicatorApplicator::new(&catalog, &lib);
        let input = prices(6);

        let mut iter = run_strategies(&strategies, &applicator, &input);
        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(
            iter.next().unwrap(),
            Err(PrepError::MissingParameter { .. })
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn input_table_is_untouched() {
        let strategies = StrategyCatalog::from_json_str(DOC).unwrap();
        let catalog = IndicatorCatalog::builtin().unwrap();
        let lib = BuiltinLibrary::new();
        let applicator = IndicatorApplicator::new(&catalog, &lib);
        let input = prices(8);
        let before = input.clone();
        for out in run_strategies(&strategies, &applicator, &input) {
            out.unwrap();
        }
        assert_eq!(input, before);
    }
}
