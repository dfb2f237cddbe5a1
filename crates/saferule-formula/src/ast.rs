//! Formula Abstract Syntax Tree types
//!
//! The set of node variants is closed: numbers, variable references, unary
//! negation, binary operators and the ternary conditional. Nothing in the
//! tree can call out of the evaluator.

use rust_decimal::Decimal;
use std::fmt;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Numeric literal
    Number(Decimal),

    /// Declared variable, resolved through its slot in the declaration list
    Variable { name: String, slot: usize },

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },

    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
}

impl Expr {
    pub(crate) fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub(crate) fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub(crate) fn ternary(condition: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Expr::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Number(_) | Expr::Variable { .. } => 1,
            Expr::UnaryOp { operand, .. } => 1 + operand.node_count(),
            Expr::BinaryOp { left, right, .. } => 1 + left.node_count() + right.node_count(),
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => 1 + condition.node_count() + then_branch.node_count() + else_branch.node_count(),
        }
    }

    /// Length of the longest root-to-leaf path (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        match self {
            Expr::Number(_) | Expr::Variable { .. } => 1,
            Expr::UnaryOp { operand, .. } => 1 + operand.depth(),
            Expr::BinaryOp { left, right, .. } => 1 + left.depth().max(right.depth()),
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                1 + condition
                    .depth()
                    .max(then_branch.depth())
                    .max(else_branch.depth())
            }
        }
    }
}

/// Fully parenthesized rendering, which parses back to the same tree
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n.normalize()),
            Expr::Variable { name, .. } => f.write_str(name),
            Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand,
            } => write!(f, "-({operand})"),
            Expr::BinaryOp { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "({condition} ? {then_branch} : {else_branch})"),
        }
    }
}
