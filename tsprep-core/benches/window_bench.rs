//! Criterion benchmarks for the preparation hot paths.
//!
//! 1. Window transposition over a wide augmented table
//! 2. Dataset formatting (windowing + labeling)
//! 3. Strategy interpretation (indicator fold)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tsprep_core::applicator::IndicatorApplicator;
use tsprep_core::catalog::IndicatorCatalog;
use tsprep_core::dataset::{format_dataset, FormatOptions};
use tsprep_core::domain::{FeatureTable, PriceBar, PriceSeries};
use tsprep_core::indicators::BuiltinLibrary;
use tsprep_core::strategy::{apply_strategy, StrategyCatalog};
use tsprep_core::window::transpose_columns;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(n: usize) -> PriceSeries {
    let base = chrono::NaiveDate::from_ymd_opt(2014, 1, 2).unwrap();
    let bars = (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            PriceBar {
                date: base + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0 + (i % 500) as f64,
            }
        })
        .collect();
    PriceSeries::new("BENCH3", bars).unwrap()
}

fn wide_table(series: &PriceSeries, extra: usize) -> FeatureTable {
    let mut table = FeatureTable::from_prices(series);
    let closes = series.closes();
    for k in 0..extra {
        let values = closes.iter().map(|c| c * (1.0 + k as f64 * 0.01)).collect();
        table = table.with_column(format!("f{k}"), values).unwrap();
    }
    table
}

const STRATEGY: &str = r#"{
    "bench": {
        "description": "bench",
        "functions": {
            "a": { "function": "SMA", "params": { "timeperiod": 20 } },
            "b": { "function": "EMA", "params": { "timeperiod": 50 } },
            "c": { "function": "RSI", "params": { "timeperiod": 14 } },
            "d": { "function": "BBANDS", "params": { "timeperiod": 20 } },
            "e": { "function": "ATR", "params": { "timeperiod": 14 } },
            "f": { "function": "MACD", "params": { "fastperiod": 12, "slowperiod": 26, "signalperiod": 9 } }
        },
        "candles": ["CDLDOJI", "CDLHAMMER"],
        "custom_columns": { "spread": "([sma_20] - [ema_50]) / [close]" }
    }
}"#;

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_transpose(c: &mut Criterion) {
    let mut group = c.benchmark_group("transpose_columns");
    let series = make_series(2_500);
    for width in [5, 25, 60] {
        let table = wide_table(&series, width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &table, |b, t| {
            b.iter(|| transpose_columns(black_box(t), 20, 5, None).unwrap())
        });
    }
    group.finish();
}

fn bench_format(c: &mut Criterion) {
    let series = make_series(2_500);
    let table = wide_table(&series, 25);
    let opts = FormatOptions::default();
    c.bench_function("format_dataset_2500x30", |b| {
        b.iter(|| format_dataset(black_box(&series), black_box(&table), &opts).unwrap())
    });
}

fn bench_strategy(c: &mut Criterion) {
    let strategies = StrategyCatalog::from_json_str(STRATEGY).unwrap();
    let catalog = IndicatorCatalog::builtin().unwrap();
    let lib = BuiltinLibrary::new();
    let applicator = IndicatorApplicator::new(&catalog, &lib);
    let table = FeatureTable::from_prices(&make_series(2_500));
    let def = &strategies.strategies()[0];
    c.bench_function("apply_strategy_2500", |b| {
        b.iter(|| apply_strategy(def, &applicator, black_box(&table)).unwrap())
    });
}

criterion_group!(benches, bench_transpose, bench_format, bench_strategy);
criterion_main!(benches);
