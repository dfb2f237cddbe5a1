//! Human-readable diagnostics for formula authors

use crate::error::{EvalError, FormulaError, LexError, ParseError};
use std::fmt;

/// Stable, inspectable classification of every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnexpectedChar,
    TooLong,
    TooManyTokens,
    MalformedNumber,
    UnbalancedParens,
    EmptyGroup,
    TooDeep,
    UnknownVariable,
    UnexpectedToken,
    EmptyFormula,
    InvalidVariableName,
    DuplicateVariable,
    MissingBinding,
    InvalidBinding,
    DivisionByZero,
    Overflow,
    BudgetExceeded,
}

impl ErrorKind {
    /// Kebab-case code, suitable for UIs and logs
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::UnexpectedChar => "unexpected-char",
            ErrorKind::TooLong => "too-long",
            ErrorKind::TooManyTokens => "too-many-tokens",
            ErrorKind::MalformedNumber => "malformed-number",
            ErrorKind::UnbalancedParens => "unbalanced-parens",
            ErrorKind::EmptyGroup => "empty-group",
            ErrorKind::TooDeep => "too-deep",
            ErrorKind::UnknownVariable => "unknown-variable",
            ErrorKind::UnexpectedToken => "unexpected-token",
            ErrorKind::EmptyFormula => "empty-formula",
            ErrorKind::InvalidVariableName => "invalid-variable-name",
            ErrorKind::DuplicateVariable => "duplicate-variable",
            ErrorKind::MissingBinding => "missing-binding",
            ErrorKind::InvalidBinding => "invalid-binding",
            ErrorKind::DivisionByZero => "division-by-zero",
            ErrorKind::Overflow => "overflow",
            ErrorKind::BudgetExceeded => "budget-exceeded",
        }
    }

    fn help(self) -> Option<&'static str> {
        match self {
            ErrorKind::UnexpectedChar => Some(
                "formulas may only contain numbers, declared variables, parentheses, \
                 + - * /, comparisons, && ||, and ? :",
            ),
            ErrorKind::TooLong | ErrorKind::TooManyTokens => Some("shorten the formula"),
            ErrorKind::EmptyGroup => Some("parentheses must contain an expression"),
            ErrorKind::TooDeep => Some(
                "reduce the nesting of parentheses and conditionals, \
                 or split long chains of operators",
            ),
            ErrorKind::UnknownVariable => Some("add the variable to the formula's declared variables"),
            ErrorKind::UnexpectedToken => {
                Some("check for a missing operator, operand, or ':' after '?'")
            }
            ErrorKind::BudgetExceeded => Some("simplify the formula"),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl LexError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LexError::UnexpectedChar { .. } => ErrorKind::UnexpectedChar,
            LexError::TooLong { .. } => ErrorKind::TooLong,
            LexError::TooManyTokens { .. } => ErrorKind::TooManyTokens,
            LexError::MalformedNumber { .. } => ErrorKind::MalformedNumber,
        }
    }

    /// Character offset of the problem, when it has one
    pub fn position(&self) -> Option<usize> {
        match self {
            LexError::UnexpectedChar { position, .. }
            | LexError::MalformedNumber { position, .. } => Some(*position),
            LexError::TooLong { .. } | LexError::TooManyTokens { .. } => None,
        }
    }
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::Lex(err) => err.kind(),
            ParseError::UnbalancedParens { .. } => ErrorKind::UnbalancedParens,
            ParseError::EmptyGroup { .. } => ErrorKind::EmptyGroup,
            ParseError::TooDeep { .. } => ErrorKind::TooDeep,
            ParseError::UnknownVariable { .. } => ErrorKind::UnknownVariable,
            ParseError::UnexpectedToken { .. } => ErrorKind::UnexpectedToken,
            ParseError::EmptyFormula => ErrorKind::EmptyFormula,
            ParseError::InvalidVariableName { .. } => ErrorKind::InvalidVariableName,
            ParseError::DuplicateVariable { .. } => ErrorKind::DuplicateVariable,
        }
    }

    /// Character offset of the problem, when it has one
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Lex(err) => err.position(),
            ParseError::UnbalancedParens { position }
            | ParseError::EmptyGroup { position }
            | ParseError::UnknownVariable { position, .. }
            | ParseError::UnexpectedToken { position, .. } => Some(*position),
            ParseError::TooDeep { .. }
            | ParseError::EmptyFormula
            | ParseError::InvalidVariableName { .. }
            | ParseError::DuplicateVariable { .. } => None,
        }
    }
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::MissingBinding { .. } => ErrorKind::MissingBinding,
            EvalError::InvalidBinding { .. } => ErrorKind::InvalidBinding,
            EvalError::DivisionByZero => ErrorKind::DivisionByZero,
            EvalError::Overflow => ErrorKind::Overflow,
            EvalError::BudgetExceeded { .. } => ErrorKind::BudgetExceeded,
        }
    }
}

impl FormulaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::Parse(err) => err.kind(),
            FormulaError::Eval(err) => err.kind(),
        }
    }

    /// Character offset of the problem; evaluation errors have none
    pub fn position(&self) -> Option<usize> {
        match self {
            FormulaError::Parse(err) => err.position(),
            FormulaError::Eval(_) => None,
        }
    }
}

/// One-paragraph description of an error for formula authors
///
/// ```rust
/// use saferule_formula::{describe_error, parse_formula, FormulaError, Limits};
///
/// let no_vars: [&str; 0] = [];
/// let err = FormulaError::from(parse_formula("1 + ()", &no_vars, &Limits::default()).unwrap_err());
/// assert_eq!(
///     describe_error(&err),
///     "error[empty-group]: empty parentheses at position 4\n  = help: parentheses must contain an expression"
/// );
/// ```
pub fn describe_error(err: &FormulaError) -> String {
    let kind = err.kind();
    let mut out = format!("error[{kind}]: {err}");
    if let Some(help) = kind.help() {
        out.push_str("\n  = help: ");
        out.push_str(help);
    }
    out
}

/// Like [`describe_error`], with the formula text and a caret under the
/// offending position
pub fn render_diagnostic(err: &FormulaError, source: &str) -> String {
    let kind = err.kind();
    let mut out = format!("error[{kind}]: {err}");

    if let Some(position) = err.position() {
        // Whitespace is flattened so the caret lines up
        let line: String = source
            .chars()
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .collect();
        out.push_str("\n  | ");
        out.push_str(&line);
        out.push_str("\n  | ");
        out.push_str(&" ".repeat(position));
        out.push('^');
    }

    if let Some(help) = kind.help() {
        out.push_str("\n  = help: ");
        out.push_str(help);
    }
    out
}
