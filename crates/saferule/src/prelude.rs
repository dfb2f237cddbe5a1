//! Prelude module for convenient imports
//!
//! ```rust
//! use saferule::prelude::*;
//! ```

pub use crate::rules::{FormulaRecord, RuleEngine, RuleStats, ValueSource};
pub use saferule_formula::{
    describe_error, evaluate, parse_formula, Bindings, Decimal, EvalError, ExpressionHandle,
    FormulaError, FormulaResult, FormulaValue, Limits, ParseError,
};
