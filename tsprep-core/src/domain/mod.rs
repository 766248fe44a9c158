//! Domain types: raw price history and derived feature tables.

pub mod price;
pub mod table;

pub use price::{is_price_field, Classification, PriceBar, PriceSeries, PRICE_FIELDS};
pub use table::{read_date_column, FeatureColumn, FeatureTable};
