//! Evaluation results

use rust_decimal::Decimal;
use std::fmt;

/// Value produced by evaluating a formula
///
/// Comparisons and logical operators produce `Boolean`; arithmetic produces
/// `Number`. There is no string, array or object variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum FormulaValue {
    Number(Decimal),
    Boolean(bool),
}

impl FormulaValue {
    /// Numeric view for arithmetic: `true` is 1 and `false` is 0
    pub fn as_number(&self) -> Decimal {
        match self {
            FormulaValue::Number(n) => *n,
            FormulaValue::Boolean(true) => Decimal::ONE,
            FormulaValue::Boolean(false) => Decimal::ZERO,
        }
    }

    /// Nonzero numbers and `true` are truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            FormulaValue::Number(n) => !n.is_zero(),
            FormulaValue::Boolean(b) => *b,
        }
    }

    /// The number, if this is a number
    pub fn number(&self) -> Option<Decimal> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(_) => None,
        }
    }

    /// The boolean, if this is a boolean
    pub fn boolean(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(_) => None,
        }
    }
}

impl From<Decimal> for FormulaValue {
    fn from(value: Decimal) -> Self {
        FormulaValue::Number(value)
    }
}

impl From<bool> for FormulaValue {
    fn from(value: bool) -> Self {
        FormulaValue::Boolean(value)
    }
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaValue::Number(n) => write!(f, "{}", n.normalize()),
            FormulaValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}
