//! Parse cache keyed by formula text and declared variables
//!
//! Parsing happens outside any lock; the result is inserted only if no
//! other thread got there first. Two threads racing on the same formula may
//! both parse it, but they end up sharing one handle.

use crate::error::ParseError;
use crate::expression::ExpressionHandle;
use crate::limits::Limits;
use crate::parser::parse_formula;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    formula: String,
    variables: Vec<String>,
}

impl CacheKey {
    fn new<S: AsRef<str>>(formula: &str, variables: &[S]) -> Self {
        Self {
            formula: formula.to_string(),
            variables: variables.iter().map(|v| v.as_ref().to_string()).collect(),
        }
    }
}

/// Hit/miss counters of a [`FormulaCache`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe cache of parsed formulas
///
/// Failed parses are never cached.
#[derive(Debug)]
pub struct FormulaCache {
    entries: DashMap<CacheKey, ExpressionHandle, ahash::RandomState>,
    limits: Limits,
    max_entries: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for FormulaCache {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl FormulaCache {
    /// Create an unbounded cache that parses with `limits`
    pub fn new(limits: Limits) -> Self {
        Self {
            entries: DashMap::with_hasher(ahash::RandomState::new()),
            limits,
            max_entries: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Stop storing new entries once `max` formulas are cached
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Return the cached handle for this formula, parsing it on a miss
    pub fn get_or_parse<S: AsRef<str>>(
        &self,
        formula: &str,
        variables: &[S],
    ) -> Result<ExpressionHandle, ParseError> {
        let key = CacheKey::new(formula, variables);

        if let Some(entry) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(length = formula.len(), "formula cache hit");
            return Ok(entry.value().clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(length = formula.len(), "formula cache miss");
        let handle = parse_formula(formula, variables, &self.limits)?;

        if self
            .max_entries
            .is_some_and(|max| self.entries.len() >= max)
        {
            tracing::debug!(entries = self.entries.len(), "formula cache full, not storing");
            return Ok(handle);
        }

        let entry = self.entries.entry(key).or_insert(handle);
        Ok(entry.value().clone())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached formula
    pub fn clear(&self) {
        self.entries.clear();
    }
}
