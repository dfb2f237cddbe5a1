//! Variable bindings supplied per evaluation

use crate::error::EvalError;
use ahash::AHashMap;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fmt;

/// A value bound to a variable, as supplied by the caller
///
/// Floats are validated and converted to decimals when the formula is
/// evaluated, so a NaN or infinite binding fails evaluation instead of
/// leaking into the result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingValue {
    Decimal(Decimal),
    Float(f64),
}

impl BindingValue {
    /// Convert to a decimal, failing on NaN, infinities and out-of-range floats
    pub fn to_decimal(self, name: &str) -> Result<Decimal, EvalError> {
        match self {
            BindingValue::Decimal(d) => Ok(d),
            BindingValue::Float(f) if f.is_finite() => {
                Decimal::from_f64(f).ok_or_else(|| invalid(name, f))
            }
            BindingValue::Float(f) => Err(invalid(name, f)),
        }
    }
}

fn invalid(name: &str, value: f64) -> EvalError {
    EvalError::InvalidBinding {
        name: name.to_string(),
        value: value.to_string(),
    }
}

impl From<Decimal> for BindingValue {
    fn from(value: Decimal) -> Self {
        BindingValue::Decimal(value)
    }
}

impl From<f64> for BindingValue {
    fn from(value: f64) -> Self {
        BindingValue::Float(value)
    }
}

impl From<i32> for BindingValue {
    fn from(value: i32) -> Self {
        BindingValue::Decimal(Decimal::from(value))
    }
}

impl From<i64> for BindingValue {
    fn from(value: i64) -> Self {
        BindingValue::Decimal(Decimal::from(value))
    }
}

impl From<u32> for BindingValue {
    fn from(value: u32) -> Self {
        BindingValue::Decimal(Decimal::from(value))
    }
}

impl From<u64> for BindingValue {
    fn from(value: u64) -> Self {
        BindingValue::Decimal(Decimal::from(value))
    }
}

impl fmt::Display for BindingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingValue::Decimal(d) => write!(f, "{d}"),
            BindingValue::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Variable name → value map for one evaluation
///
/// Bindings for names the formula does not declare are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: AHashMap<String, BindingValue>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, returning the previous binding for the name
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<BindingValue>,
    ) -> Option<BindingValue> {
        self.values.insert(name.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<BindingValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<BindingValue> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, BindingValue)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>, V: Into<BindingValue>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.insert(name, value);
        }
        bindings
    }
}

/// Look up a variable and convert its binding to a decimal
pub fn resolve_variable(name: &str, bindings: &Bindings) -> Result<Decimal, EvalError> {
    bindings
        .get(name)
        .ok_or_else(|| EvalError::MissingBinding {
            name: name.to_string(),
        })?
        .to_decimal(name)
}
