//! Declarative strategies: documents, custom column expressions and the
//! interpreter that folds indicator calls over a price table.

pub mod config;
pub mod expr;
pub mod interpreter;
mod ordered;

pub use config::{CustomColumn, FunctionCall, StrategyCatalog, StrategyDef};
pub use expr::{BinaryOp, Expr};
pub use interpreter::{apply_strategy, run_strategies, StrategyOutput, CANDLE_SCALE};
