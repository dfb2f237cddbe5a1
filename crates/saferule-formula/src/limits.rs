//! Resource limits applied at each stage of the pipeline
//!
//! - `max_formula_length`: checked before tokenizing
//! - `max_token_count`: checked after tokenizing
//! - `max_tree_depth`: checked while parsing
//! - `max_eval_steps`: checked while evaluating

use crate::error::ConfigError;

/// Default maximum formula length, in characters
pub const DEFAULT_MAX_FORMULA_LENGTH: usize = 500;
/// Default maximum number of tokens
pub const DEFAULT_MAX_TOKEN_COUNT: usize = 256;
/// Default maximum nesting / tree depth
pub const DEFAULT_MAX_TREE_DEPTH: usize = 64;
/// Default maximum number of nodes visited during one evaluation
pub const DEFAULT_MAX_EVAL_STEPS: usize = 10_000;

/// Limits for tokenizing, parsing and evaluating a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Limits {
    /// Maximum formula length in characters (default: 500)
    pub max_formula_length: usize,
    /// Maximum number of tokens (default: 256)
    pub max_token_count: usize,
    /// Maximum depth of group nesting and of the expression tree (default: 64)
    pub max_tree_depth: usize,
    /// Maximum number of nodes visited per evaluation (default: 10,000)
    pub max_eval_steps: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_formula_length: DEFAULT_MAX_FORMULA_LENGTH,
            max_token_count: DEFAULT_MAX_TOKEN_COUNT,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            max_eval_steps: DEFAULT_MAX_EVAL_STEPS,
        }
    }
}

impl Limits {
    /// Create limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_formula_length(mut self, max: usize) -> Self {
        self.max_formula_length = max;
        self
    }

    pub fn with_max_token_count(mut self, max: usize) -> Self {
        self.max_token_count = max;
        self
    }

    pub fn with_max_tree_depth(mut self, max: usize) -> Self {
        self.max_tree_depth = max;
        self
    }

    pub fn with_max_eval_steps(mut self, max: usize) -> Self {
        self.max_eval_steps = max;
        self
    }

    /// Check that every limit admits at least one formula
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("max_formula_length", self.max_formula_length),
            ("max_token_count", self.max_token_count),
            ("max_tree_depth", self.max_tree_depth),
            ("max_eval_steps", self.max_eval_steps),
        ];
        match checks.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::ZeroLimit(name)),
            None => Ok(()),
        }
    }
}
