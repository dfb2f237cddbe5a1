//! Compiled formula handle

use crate::ast::Expr;
use std::fmt;
use std::sync::Arc;

/// A parsed formula, ready to be evaluated any number of times
///
/// Cloning is cheap: the tree is shared and never mutated, so a handle can
/// be evaluated from several threads at once.
#[derive(Clone, PartialEq, Eq)]
pub struct ExpressionHandle {
    inner: Arc<Compiled>,
}

#[derive(PartialEq, Eq)]
struct Compiled {
    source: String,
    variables: Vec<String>,
    root: Expr,
    depth: usize,
    node_count: usize,
}

impl ExpressionHandle {
    pub(crate) fn new(source: &str, variables: Vec<String>, root: Expr) -> Self {
        let depth = root.depth();
        let node_count = root.node_count();
        Self {
            inner: Arc::new(Compiled {
                source: source.to_string(),
                variables,
                root,
                depth,
                node_count,
            }),
        }
    }

    /// Formula text this handle was parsed from
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Declared variables, in slot order
    pub fn variables(&self) -> &[String] {
        &self.inner.variables
    }

    pub fn root(&self) -> &Expr {
        &self.inner.root
    }

    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count
    }

    /// Whether two handles share the same compiled tree
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ExpressionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionHandle")
            .field("source", &self.inner.source)
            .field("variables", &self.inner.variables)
            .field("nodes", &self.inner.node_count)
            .finish()
    }
}

impl fmt::Display for ExpressionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.root, f)
    }
}
