//! Formula evaluator
//!
//! Walks an expression tree to produce a [`FormulaValue`]. Evaluation is a
//! pure function of the tree, the bindings and the limits.

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::bindings::{resolve_variable, Bindings};
use crate::error::{EvalError, FormulaResult};
use crate::expression::ExpressionHandle;
use crate::limits::Limits;
use crate::parser::parse_formula;
use crate::value::FormulaValue;
use rust_decimal::Decimal;

/// Evaluate a parsed formula against a set of bindings
///
/// Every declared variable must be bound, even ones a short-circuit would
/// skip.
///
/// # Example
/// ```rust
/// use rust_decimal::Decimal;
/// use saferule_formula::{evaluate, parse_formula, Bindings, FormulaValue, Limits};
///
/// let limits = Limits::default();
/// let handle = parse_formula("price * 0.9", &["price"], &limits).unwrap();
/// let bindings = Bindings::new().with("price", 50);
/// assert_eq!(
///     evaluate(&handle, &bindings, &limits).unwrap(),
///     FormulaValue::Number(Decimal::from(45))
/// );
/// ```
pub fn evaluate(
    handle: &ExpressionHandle,
    bindings: &Bindings,
    limits: &Limits,
) -> Result<FormulaValue, EvalError> {
    let slots = handle
        .variables()
        .iter()
        .map(|name| resolve_variable(name, bindings))
        .collect::<Result<Vec<_>, _>>()?;

    evaluate_expr(handle.root(), &slots, limits)
}

/// Evaluate a bare tree whose variable slots are already resolved
pub fn evaluate_expr(
    expr: &Expr,
    slots: &[Decimal],
    limits: &Limits,
) -> Result<FormulaValue, EvalError> {
    let mut evaluator = Evaluator {
        slots,
        max_steps: limits.max_eval_steps,
        steps: 0,
    };
    let value = evaluator.eval(expr)?;
    tracing::trace!(steps = evaluator.steps, %value, "formula evaluated");
    Ok(value)
}

/// Parse and evaluate in one call
pub fn eval_formula<S: AsRef<str>>(
    formula: &str,
    variables: &[S],
    bindings: &Bindings,
    limits: &Limits,
) -> FormulaResult<FormulaValue> {
    let handle = parse_formula(formula, variables, limits)?;
    Ok(evaluate(&handle, bindings, limits)?)
}

struct Evaluator<'a> {
    slots: &'a [Decimal],
    max_steps: usize,
    steps: usize,
}

impl Evaluator<'_> {
    fn step(&mut self) -> Result<(), EvalError> {
        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(EvalError::BudgetExceeded {
                max: self.max_steps,
            });
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<FormulaValue, EvalError> {
        self.step()?;

        match expr {
            Expr::Number(n) => Ok(FormulaValue::Number(*n)),

            Expr::Variable { name, slot } => self
                .slots
                .get(*slot)
                .map(|value| FormulaValue::Number(*value))
                .ok_or_else(|| EvalError::MissingBinding { name: name.clone() }),

            Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand,
            } => {
                let value = self.eval(operand)?;
                Ok(FormulaValue::Number(-value.as_number()))
            }

            Expr::BinaryOp { op, left, right } => self.eval_binary_op(*op, left, right),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }
        }
    }

    fn eval_binary_op(
        &mut self,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
    ) -> Result<FormulaValue, EvalError> {
        // Logical operators short-circuit
        match op {
            BinaryOperator::And => {
                let result = self.eval(left)?.is_truthy() && self.eval(right)?.is_truthy();
                return Ok(FormulaValue::Boolean(result));
            }
            BinaryOperator::Or => {
                let result = self.eval(left)?.is_truthy() || self.eval(right)?.is_truthy();
                return Ok(FormulaValue::Boolean(result));
            }
            _ => {}
        }

        let l = self.eval(left)?.as_number();
        let r = self.eval(right)?.as_number();

        let value = match op {
            // Arithmetic operators
            BinaryOperator::Add => FormulaValue::Number(l.checked_add(r).ok_or(EvalError::Overflow)?),
            BinaryOperator::Subtract => {
                FormulaValue::Number(l.checked_sub(r).ok_or(EvalError::Overflow)?)
            }
            BinaryOperator::Multiply => {
                FormulaValue::Number(l.checked_mul(r).ok_or(EvalError::Overflow)?)
            }
            BinaryOperator::Divide => {
                if r.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                FormulaValue::Number(l.checked_div(r).ok_or(EvalError::Overflow)?)
            }

            // Comparison operators
            BinaryOperator::Equal => FormulaValue::Boolean(l == r),
            BinaryOperator::NotEqual => FormulaValue::Boolean(l != r),
            BinaryOperator::LessThan => FormulaValue::Boolean(l < r),
            BinaryOperator::LessEqual => FormulaValue::Boolean(l <= r),
            BinaryOperator::GreaterThan => FormulaValue::Boolean(l > r),
            BinaryOperator::GreaterEqual => FormulaValue::Boolean(l >= r),

            BinaryOperator::And => FormulaValue::Boolean(!l.is_zero() && !r.is_zero()),
            BinaryOperator::Or => FormulaValue::Boolean(!l.is_zero() || !r.is_zero()),
        };

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormulaError;
    use pretty_assertions::assert_eq;

    fn eval(formula: &str) -> FormulaResult<FormulaValue> {
        let no_vars: [&str; 0] = [];
        eval_formula(formula, &no_vars, &Bindings::new(), &Limits::default())
    }

    fn eval_with(formula: &str, bindings: &Bindings) -> FormulaResult<FormulaValue> {
        let mut names: Vec<&str> = bindings.iter().map(|(name, _)| name).collect();
        names.sort_unstable();
        eval_formula(formula, &names, bindings, &Limits::default())
    }

    fn number(n: i64) -> FormulaValue {
        FormulaValue::Number(Decimal::from(n))
    }

    #[test]
    fn test_evaluate_number() {
        assert_eq!(eval("42").unwrap(), number(42));
        assert_eq!(
            eval("3.14").unwrap(),
            FormulaValue::Number(Decimal::new(314, 2))
        );
        assert_eq!(eval("100 * .99").unwrap(), number(99));
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1+2").unwrap(), number(3));
        assert_eq!(eval("10-3").unwrap(), number(7));
        assert_eq!(eval("4*5").unwrap(), number(20));
        assert_eq!(eval("20/4").unwrap(), number(5));
        assert_eq!(
            eval("1/4").unwrap(),
            FormulaValue::Number(Decimal::new(25, 2))
        );
    }

    #[test]
    fn test_decimal_arithmetic_is_exact() {
        assert_eq!(eval("0.1 + 0.2 == 0.3").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(
            eval("19.99 * 3").unwrap(),
            FormulaValue::Number(Decimal::new(5997, 2))
        );
    }

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(eval("1+2*3").unwrap(), number(7));
        assert_eq!(eval("(1+2)*3").unwrap(), number(9));
        assert_eq!(eval("2+3*4-5").unwrap(), number(9));
        assert_eq!(eval("8-4-2").unwrap(), number(2));
        assert_eq!(eval("16/4/2").unwrap(), number(2));
    }

    #[test]
    fn test_evaluate_unary() {
        assert_eq!(eval("-5").unwrap(), number(-5));
        assert_eq!(eval("3 - -5").unwrap(), number(8));
        assert_eq!(eval("-(2 * 3)").unwrap(), number(-6));
    }

    #[test]
    fn test_evaluate_comparison() {
        assert_eq!(eval("1<2").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("1>2").unwrap(), FormulaValue::Boolean(false));
        assert_eq!(eval("5==5").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("5!=5").unwrap(), FormulaValue::Boolean(false));
        assert_eq!(eval("5<=5").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("4>=5").unwrap(), FormulaValue::Boolean(false));
        assert_eq!(eval("1.0 == 1").unwrap(), FormulaValue::Boolean(true));
    }

    #[test]
    fn test_evaluate_logical() {
        assert_eq!(eval("1 && 0").unwrap(), FormulaValue::Boolean(false));
        assert_eq!(eval("1 && 2").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("0 || 0").unwrap(), FormulaValue::Boolean(false));
        assert_eq!(eval("0 || 3").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(
            eval("1 < 2 && 3 > 2").unwrap(),
            FormulaValue::Boolean(true)
        );
    }

    #[test]
    fn test_logical_short_circuit() {
        // The right-hand side would fail if it were evaluated
        assert_eq!(eval("0 && 1/0").unwrap(), FormulaValue::Boolean(false));
        assert_eq!(eval("1 || 1/0").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(
            eval("1 && 1/0"),
            Err(FormulaError::Eval(EvalError::DivisionByZero))
        );
    }

    #[test]
    fn test_evaluate_ternary() {
        assert_eq!(eval("1 ? 2 : 3").unwrap(), number(2));
        assert_eq!(eval("0 ? 2 : 3").unwrap(), number(3));
        assert_eq!(eval("1 > 2 ? 2 : 3").unwrap(), number(3));
        assert_eq!(eval("0 ? 1 : 0 ? 2 : 3").unwrap(), number(3));
        // Only the selected branch runs
        assert_eq!(eval("1 ? 5 : 1/0").unwrap(), number(5));
    }

    #[test]
    fn test_boolean_operands_coerce() {
        assert_eq!(eval("(1 < 2) + 1").unwrap(), number(2));
        assert_eq!(eval("(1 > 2) * 10").unwrap(), number(0));
        assert_eq!(eval("(2 > 1) == 1").unwrap(), FormulaValue::Boolean(true));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            eval("5 / 0"),
            Err(FormulaError::Eval(EvalError::DivisionByZero))
        );
        assert_eq!(
            eval("5 / (2 - 2)"),
            Err(FormulaError::Eval(EvalError::DivisionByZero))
        );
    }

    #[test]
    fn test_overflow() {
        let max = "79228162514264337593543950335";
        assert_eq!(
            eval(&format!("{max} + 1")),
            Err(FormulaError::Eval(EvalError::Overflow))
        );
        assert_eq!(
            eval(&format!("{max} * 2")),
            Err(FormulaError::Eval(EvalError::Overflow))
        );
    }

    #[test]
    fn test_evaluate_variables() {
        let bindings = Bindings::new().with("price", 200).with("rate", 0.25);
        assert_eq!(eval_with("price * rate", &bindings).unwrap(), number(50));
        assert_eq!(
            eval_with("price > 100 && rate < 1", &bindings).unwrap(),
            FormulaValue::Boolean(true)
        );
    }

    #[test]
    fn test_missing_binding_even_when_short_circuited() {
        let limits = Limits::default();
        let handle = parse_formula("0 && unused", &["unused"], &limits).unwrap();
        assert_eq!(
            evaluate(&handle, &Bindings::new(), &limits),
            Err(EvalError::MissingBinding {
                name: "unused".into()
            })
        );
    }

    #[test]
    fn test_invalid_binding() {
        let limits = Limits::default();
        let handle = parse_formula("x + 1", &["x"], &limits).unwrap();
        let bindings = Bindings::new().with("x", f64::NAN);
        assert_eq!(
            evaluate(&handle, &bindings, &limits),
            Err(EvalError::InvalidBinding {
                name: "x".into(),
                value: "NaN".into()
            })
        );
    }

    #[test]
    fn test_budget_exceeded() {
        let limits = Limits::default().with_max_eval_steps(4);
        let no_vars: [&str; 0] = [];
        // 1+2 visits three nodes
        assert!(eval_formula("1+2", &no_vars, &Bindings::new(), &limits).is_ok());
        // 1+2+3 visits five nodes
        assert_eq!(
            eval_formula("1+2+3", &no_vars, &Bindings::new(), &limits),
            Err(FormulaError::Eval(EvalError::BudgetExceeded { max: 4 }))
        );
    }

    #[test]
    fn test_short_circuit_saves_steps() {
        let limits = Limits::default().with_max_eval_steps(3);
        let no_vars: [&str; 0] = [];
        // Root, left operand and nothing else
        assert_eq!(
            eval_formula("0 && (1+2+3+4)", &no_vars, &Bindings::new(), &limits).unwrap(),
            FormulaValue::Boolean(false)
        );
    }

    #[test]
    fn test_evaluate_expr_with_unresolved_slot() {
        let expr = Expr::Variable {
            name: "x".into(),
            slot: 3,
        };
        assert_eq!(
            evaluate_expr(&expr, &[], &Limits::default()),
            Err(EvalError::MissingBinding { name: "x".into() })
        );
    }
}
