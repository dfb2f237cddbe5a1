//! # saferule
//!
//! Safe evaluation of small, user-authored formulas such as pricing and
//! discount rules.
//!
//! Authors write formulas like `price < 100 ? price : price * 0.95` over a
//! declared list of variables. The formula is parsed once into an immutable
//! tree and evaluated against current values as often as needed. The
//! language is closed: arithmetic, comparisons, `&&`/`||` and the ternary
//! conditional, with no way to call out of the evaluator.
//!
//! ## Features
//!
//! - Fail-closed tokenizing: any unexpected character rejects the formula
//! - Decimal arithmetic for exact currency math
//! - Length, token, depth and step limits on every formula
//! - Typed errors with positions and author-facing diagnostics
//! - Thread-safe parse cache and a rule engine for persisted records
//!
//! ## Example
//!
//! ```rust
//! use saferule::prelude::*;
//!
//! let limits = Limits::default();
//! let handle = parse_formula("price * (1 - pct / 100)", &["price", "pct"], &limits).unwrap();
//!
//! let bindings = Bindings::new().with("price", 80).with("pct", 25);
//! let value = evaluate(&handle, &bindings, &limits).unwrap();
//! assert_eq!(value.to_string(), "60");
//! ```

pub mod prelude;
pub mod rules;

pub use rules::{FormulaRecord, RuleEngine, RuleStats, ValueSource};

// Re-export formula types
pub use saferule_formula::{
    describe_error, eval_formula, evaluate, parse_formula, render_diagnostic, tokenize,
    BinaryOperator, BindingValue, Bindings, CacheStats, ConfigError, Decimal, ErrorKind,
    EvalError, Expr, ExpressionHandle, FormulaCache, FormulaError, FormulaResult, FormulaValue,
    LexError, Limits, Operator, ParseError, Token, TokenKind, UnaryOperator,
};
