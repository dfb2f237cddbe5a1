//! Formula error types
//!
//! Every stage fails fast with its own error enum. [`FormulaError`] wraps the
//! parse and evaluation stages for callers that run the whole pipeline.

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors raised while turning formula text into tokens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A character outside the permitted set
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    /// Formula text longer than the configured maximum
    #[error("formula is {length} characters long (max: {max})")]
    TooLong { length: usize, max: usize },

    /// More tokens than the configured maximum
    #[error("formula has {count} tokens (max: {max})")]
    TooManyTokens { count: usize, max: usize },

    /// A numeric literal that is not a valid decimal
    #[error("malformed number '{text}' at position {position}")]
    MalformedNumber { text: String, position: usize },
}

/// Errors raised while building an expression tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Tokenizing failed
    #[error(transparent)]
    Lex(#[from] LexError),

    /// Parenthesis without a partner
    #[error("unbalanced parentheses at position {position}")]
    UnbalancedParens { position: usize },

    /// `()` with nothing inside
    #[error("empty parentheses at position {position}")]
    EmptyGroup { position: usize },

    /// Nesting or tree depth above the configured maximum
    #[error("formula nesting exceeds maximum depth of {max}")]
    TooDeep { max: usize },

    /// Identifier that is not one of the declared variables
    #[error("unknown variable '{name}' at position {position}")]
    UnknownVariable { name: String, position: usize },

    /// Token that does not fit the grammar at this point
    #[error("unexpected {found} at position {position}")]
    UnexpectedToken { found: String, position: usize },

    /// Formula text without any tokens
    #[error("formula is empty")]
    EmptyFormula,

    /// Declared variable name that is not an identifier
    #[error("invalid variable name '{name}'")]
    InvalidVariableName { name: String },

    /// Variable declared more than once
    #[error("variable '{name}' is declared more than once")]
    DuplicateVariable { name: String },
}

/// Errors raised while evaluating an expression tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Declared variable without a binding
    #[error("no value bound for variable '{name}'")]
    MissingBinding { name: String },

    /// Binding that is NaN, infinite or out of decimal range
    #[error("invalid value {value} bound for variable '{name}'")]
    InvalidBinding { name: String, value: String },

    /// Division with a zero divisor
    #[error("division by zero")]
    DivisionByZero,

    /// Arithmetic result out of decimal range
    #[error("arithmetic overflow")]
    Overflow,

    /// Step counter exceeded the configured budget
    #[error("evaluation exceeded the budget of {max} steps")]
    BudgetExceeded { max: usize },
}

/// Any failure of the parse-then-evaluate pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// Formula text could not be compiled
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Compiled formula could not be evaluated
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<LexError> for FormulaError {
    fn from(err: LexError) -> Self {
        FormulaError::Parse(ParseError::Lex(err))
    }
}

/// Invalid [`Limits`](crate::Limits) configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A limit configured as zero would reject every formula
    #[error("limit '{0}' must be greater than zero")]
    ZeroLimit(&'static str),
}
