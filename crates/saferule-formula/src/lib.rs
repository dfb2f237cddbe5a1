//! # saferule-formula
//!
//! Restricted formula language for untrusted, user-authored rules such as
//! pricing discounts.
//!
//! This crate provides:
//! - Fail-closed tokenizing (text → tokens)
//! - Grammar-constrained parsing (tokens → expression tree)
//! - Decimal evaluation against named variable bindings
//! - Length, token, depth and step limits
//! - A concurrent parse cache and author-facing diagnostics
//!
//! The language has numbers, declared variables, `+ - * /`, comparisons,
//! `&& ||` and `?:`. There are no calls, strings, assignments or loops.
//!
//! ## Example
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use saferule_formula::{evaluate, parse_formula, Bindings, FormulaValue, Limits};
//!
//! let limits = Limits::default();
//! let handle = parse_formula(
//!     "price - price * (items > 5 ? 0.05 : items * 0.01)",
//!     &["price", "items"],
//!     &limits,
//! )
//! .unwrap();
//!
//! let bindings = Bindings::new().with("price", 100).with("items", 3);
//! let result = evaluate(&handle, &bindings, &limits).unwrap();
//! assert_eq!(result, FormulaValue::Number(Decimal::from(97)));
//! ```

pub mod ast;
pub mod bindings;
pub mod cache;
pub mod diagnostic;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod lexer;
pub mod limits;
pub mod parser;
pub mod token;
pub mod value;

pub use ast::{BinaryOperator, Expr, UnaryOperator};
pub use bindings::{resolve_variable, BindingValue, Bindings};
pub use cache::{CacheStats, FormulaCache};
pub use diagnostic::{describe_error, render_diagnostic, ErrorKind};
pub use error::{ConfigError, EvalError, FormulaError, FormulaResult, LexError, ParseError};
pub use evaluator::{eval_formula, evaluate, evaluate_expr};
pub use expression::ExpressionHandle;
pub use lexer::tokenize;
pub use limits::Limits;
pub use parser::{is_identifier, parse, parse_formula};
pub use token::{Operator, Token, TokenKind};
pub use value::FormulaValue;

pub use rust_decimal::Decimal;
