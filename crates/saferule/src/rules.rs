//! Rule engine over persisted formula records
//!
//! Evaluates formula records against a value source, with parse caching and
//! per-run statistics.
//!
//! # Example
//!
//! ```rust
//! use saferule::prelude::*;
//! use std::collections::HashMap;
//!
//! let engine = RuleEngine::new(Limits::default()).unwrap();
//! let record = FormulaRecord::new("price < 100 ? price : price * 0.95", ["price"]);
//!
//! let mut store = HashMap::new();
//! store.insert("price".to_string(), 200.0);
//!
//! let price = engine.evaluate(&record, &store).unwrap();
//! assert_eq!(price.to_string(), "190");
//! ```

use saferule_formula::{
    BindingValue, Bindings, ConfigError, Decimal, ExpressionHandle, FormulaCache, FormulaError,
    FormulaResult, FormulaValue, Limits, ParseError,
};
use std::collections::HashMap;
use std::hash::BuildHasher;

/// A formula as persisted by the authoring side
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FormulaRecord {
    /// Formula source text
    pub formula_text: String,
    /// Variables the formula may reference, in declaration order
    pub dependent_keys: Vec<String>,
}

impl FormulaRecord {
    pub fn new<I, S>(formula_text: impl Into<String>, dependent_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formula_text: formula_text.into(),
            dependent_keys: dependent_keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// Source of current variable values, such as a product data store
pub trait ValueSource {
    /// Current value for `key`, or `None` if the store has no value
    fn value(&self, key: &str) -> Option<BindingValue>;
}

impl ValueSource for Bindings {
    fn value(&self, key: &str) -> Option<BindingValue> {
        self.get(key)
    }
}

impl<S: BuildHasher> ValueSource for HashMap<String, f64, S> {
    fn value(&self, key: &str) -> Option<BindingValue> {
        self.get(key).copied().map(BindingValue::from)
    }
}

impl<S: BuildHasher> ValueSource for HashMap<String, Decimal, S> {
    fn value(&self, key: &str) -> Option<BindingValue> {
        self.get(key).copied().map(BindingValue::from)
    }
}

/// Statistics from an [`RuleEngine::evaluate_all`] run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleStats {
    /// Number of records processed
    pub records: usize,
    /// Number of records that produced a value
    pub evaluated: usize,
    /// Number of records whose formula failed to parse
    pub parse_errors: usize,
    /// Number of records whose formula failed to evaluate
    pub eval_errors: usize,
    /// Number of parses served from the cache during the run
    pub cache_hits: u64,
}

impl RuleStats {
    /// Total number of failed records
    pub fn failed(&self) -> usize {
        self.parse_errors + self.eval_errors
    }
}

/// Evaluates formula records, caching parsed formulas across calls
///
/// Failures are returned to the caller, never replaced by a default value.
/// What to display when a rule fails is the caller's decision.
#[derive(Debug)]
pub struct RuleEngine {
    cache: FormulaCache,
}

impl RuleEngine {
    /// Create an engine, rejecting limits that would refuse every formula
    pub fn new(limits: Limits) -> Result<Self, ConfigError> {
        limits.validate()?;
        Ok(Self {
            cache: FormulaCache::new(limits),
        })
    }

    /// Bound the number of cached formulas
    pub fn with_cache_capacity(self, max_entries: usize) -> Self {
        Self {
            cache: self.cache.with_max_entries(max_entries),
        }
    }

    pub fn limits(&self) -> &Limits {
        self.cache.limits()
    }

    pub fn cache(&self) -> &FormulaCache {
        &self.cache
    }

    /// Parse a record's formula, or fetch it from the cache
    pub fn compile(&self, record: &FormulaRecord) -> Result<ExpressionHandle, ParseError> {
        self.cache
            .get_or_parse(&record.formula_text, &record.dependent_keys)
    }

    /// Gather bindings for a record's dependent keys
    ///
    /// Keys the source has no value for stay unbound.
    pub fn bindings_for(&self, record: &FormulaRecord, source: &impl ValueSource) -> Bindings {
        record
            .dependent_keys
            .iter()
            .filter_map(|key| source.value(key).map(|value| (key.clone(), value)))
            .collect()
    }

    /// Evaluate one record against current values
    pub fn evaluate(
        &self,
        record: &FormulaRecord,
        source: &impl ValueSource,
    ) -> FormulaResult<FormulaValue> {
        let handle = self.compile(record)?;
        let bindings = self.bindings_for(record, source);
        Ok(saferule_formula::evaluate(
            &handle,
            &bindings,
            self.limits(),
        )?)
    }

    /// Evaluate every record, returning per-record results in input order
    pub fn evaluate_all(
        &self,
        records: &[FormulaRecord],
        source: &impl ValueSource,
    ) -> (Vec<FormulaResult<FormulaValue>>, RuleStats) {
        let hits_before = self.cache.stats().hits;
        let mut stats = RuleStats {
            records: records.len(),
            ..Default::default()
        };

        let results: Vec<_> = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let result = self.evaluate(record, source);
                match &result {
                    Ok(_) => stats.evaluated += 1,
                    Err(err) => {
                        match err {
                            FormulaError::Parse(_) => stats.parse_errors += 1,
                            FormulaError::Eval(_) => stats.eval_errors += 1,
                        }
                        tracing::warn!(index, kind = %err.kind(), error = %err, "rule failed");
                    }
                }
                result
            })
            .collect();

        stats.cache_hits = self.cache.stats().hits.saturating_sub(hits_before);
        tracing::debug!(
            records = stats.records,
            evaluated = stats.evaluated,
            failed = stats.failed(),
            "rules evaluated"
        );
        (results, stats)
    }
}
