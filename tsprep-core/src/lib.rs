//! tsprep core: price series, indicator catalog, strategy interpreter,
//! windowing, labeling and dataset export.
//!
//! Pipeline for one asset:
//! - `FeatureTable::from_prices` turns a `PriceSeries` into a table
//! - `strategy::run_strategies` folds each strategy's indicator calls,
//!   candle patterns and custom columns over it
//! - `dataset::format_dataset` windows the augmented table and labels each
//!   window with the forward return after it
//! - `export::ParquetSink` persists the labeled table

pub mod applicator;
pub mod catalog;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod export;
pub mod indicators;
pub mod label;
pub mod strategy;
pub mod window;

pub use error::PrepError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: shared pipeline types are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PriceSeries>();
        require_sync::<domain::PriceSeries>();
        require_send::<domain::FeatureTable>();
        require_sync::<domain::FeatureTable>();

        require_send::<catalog::IndicatorCatalog>();
        require_sync::<catalog::IndicatorCatalog>();
        require_send::<strategy::StrategyCatalog>();
        require_sync::<strategy::StrategyCatalog>();
        require_send::<indicators::BuiltinLibrary>();
        require_sync::<indicators::BuiltinLibrary>();

        require_send::<window::WindowedTable>();
        require_sync::<window::WindowedTable>();
        require_send::<dataset::LabeledTable>();
        require_sync::<dataset::LabeledTable>();

        require_send::<PrepError>();
        require_sync::<PrepError>();
    }

    /// The applicator only sees the library through the trait object, so any
    /// library implementation can back a catalog.
    #[allow(dead_code)]
    fn applicator_accepts_any_library<'a>(
        catalog: &'a catalog::IndicatorCatalog,
        library: &'a dyn indicators::IndicatorLibrary,
    ) -> applicator::IndicatorApplicator<'a> {
        applicator::IndicatorApplicator::new(catalog, library)
    }
}
