//! Formula parser
//!
//! A recursive descent parser over the token stream with a fixed precedence
//! ladder. Parentheses are matched up front, so empty and unbalanced groups
//! are reported as such wherever they appear. Nesting depth and tree depth
//! are tracked while the tree is built, so hostile input fails with
//! [`ParseError::TooDeep`] instead of exhausting the stack.

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::ParseError;
use crate::expression::ExpressionHandle;
use crate::lexer::{parse_number, tokenize};
use crate::limits::Limits;
use crate::token::{Operator, Token, TokenKind};
use ahash::AHashMap;

/// Parse formula text into a reusable, immutable expression handle
///
/// Every identifier in the formula must be one of `variables`.
///
/// # Example
/// ```rust
/// use saferule_formula::{parse_formula, Limits};
///
/// let handle = parse_formula("price < 100 ? price : price * 0.95", &["price"], &Limits::default()).unwrap();
/// assert_eq!(handle.variables(), ["price"]);
/// ```
pub fn parse_formula<S: AsRef<str>>(
    formula: &str,
    variables: &[S],
    limits: &Limits,
) -> Result<ExpressionHandle, ParseError> {
    let result = tokenize(formula, variables, limits)
        .map_err(ParseError::from)
        .and_then(|tokens| parse(&tokens, variables, limits));

    match result {
        Ok(root) => {
            tracing::trace!(
                nodes = root.node_count(),
                variables = variables.len(),
                "formula parsed"
            );
            let variables = variables.iter().map(|v| v.as_ref().to_string()).collect();
            Ok(ExpressionHandle::new(formula, variables, root))
        }
        Err(err) => {
            tracing::debug!(length = formula.len(), error = %err, "formula rejected");
            Err(err)
        }
    }
}

/// Parse a token stream into an expression tree
pub fn parse<S: AsRef<str>>(
    tokens: &[Token],
    variables: &[S],
    limits: &Limits,
) -> Result<Expr, ParseError> {
    let slots = declare_variables(variables)?;

    if tokens.is_empty() {
        return Err(ParseError::EmptyFormula);
    }

    check_parens(tokens)?;

    let mut parser = FormulaParser::new(tokens, slots, limits.max_tree_depth);
    let node = parser.parse_ternary()?;

    // Make sure we consumed all tokens
    if parser.current().is_some() {
        return Err(parser.unexpected());
    }

    Ok(node.expr)
}

/// Match parentheses before descent
///
/// `()` is an [`ParseError::EmptyGroup`] at the `(`. A `)` with nothing to
/// close, or a `(` still open at the end, is [`ParseError::UnbalancedParens`]
/// at that paren (the innermost one when several are left open).
fn check_parens(tokens: &[Token]) -> Result<(), ParseError> {
    let mut open = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => {
                if tokens.get(i + 1).map(|t| t.kind) == Some(TokenKind::RParen) {
                    return Err(ParseError::EmptyGroup {
                        position: token.position,
                    });
                }
                open.push(token.position);
            }
            TokenKind::RParen => {
                if open.pop().is_none() {
                    return Err(ParseError::UnbalancedParens {
                        position: token.position,
                    });
                }
            }
            _ => {}
        }
    }

    match open.last() {
        Some(&position) => Err(ParseError::UnbalancedParens { position }),
        None => Ok(()),
    }
}

/// Map each declared variable to its slot, rejecting bad or repeated names
fn declare_variables<S: AsRef<str>>(variables: &[S]) -> Result<AHashMap<&str, usize>, ParseError> {
    let mut slots = AHashMap::with_capacity(variables.len());
    for (slot, name) in variables.iter().enumerate() {
        let name = name.as_ref();
        if !is_identifier(name) {
            return Err(ParseError::InvalidVariableName {
                name: name.to_string(),
            });
        }
        if slots.insert(name, slot).is_some() {
            return Err(ParseError::DuplicateVariable {
                name: name.to_string(),
            });
        }
    }
    Ok(slots)
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Subtree together with its depth
struct Node {
    expr: Expr,
    depth: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, depth: 1 }
    }
}

/// Formula parser
struct FormulaParser<'t, 'v> {
    tokens: &'t [Token],
    pos: usize,
    slots: AHashMap<&'v str, usize>,
    max_depth: usize,
    /// Current nesting of groups and ternary branches
    nesting: usize,
}

impl<'t, 'v> FormulaParser<'t, 'v> {
    fn new(tokens: &'t [Token], slots: AHashMap<&'v str, usize>, max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            slots,
            max_depth,
            nesting: 0,
        }
    }

    // === Token access ===

    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn consume(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.current_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Character offset just past the last token
    fn end_position(&self) -> usize {
        self.tokens
            .last()
            .map_or(0, |t| t.position + t.text.chars().count())
    }

    fn unexpected(&self) -> ParseError {
        match self.current() {
            Some(token) => ParseError::UnexpectedToken {
                found: token.describe(),
                position: token.position,
            },
            None => ParseError::UnexpectedToken {
                found: "end of formula".into(),
                position: self.end_position(),
            },
        }
    }

    // === Depth tracking ===

    fn enter(&mut self) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting > self.max_depth {
            return Err(ParseError::TooDeep {
                max: self.max_depth,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn node(&self, expr: Expr, child_depth: usize) -> Result<Node, ParseError> {
        let depth = child_depth + 1;
        if depth > self.max_depth {
            return Err(ParseError::TooDeep {
                max: self.max_depth,
            });
        }
        Ok(Node { expr, depth })
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Ternary: ? :  (right associative)
    // 2. Logical or: ||
    // 3. Logical and: &&
    // 4. Equality: ==, !=
    // 5. Relational: <, <=, >, >=
    // 6. Additive: +, -
    // 7. Multiplicative: *, /
    // 8. Unary: -
    // 9. Primary: numbers, variables, parentheses

    fn parse_ternary(&mut self) -> Result<Node, ParseError> {
        self.enter()?;
        let condition = self.parse_logical_or()?;

        if !self.eat(TokenKind::Question) {
            self.leave();
            return Ok(condition);
        }

        let then_branch = self.parse_ternary()?;
        if !self.eat(TokenKind::Colon) {
            return Err(self.unexpected());
        }
        let else_branch = self.parse_ternary()?;

        let child_depth = condition
            .depth
            .max(then_branch.depth)
            .max(else_branch.depth);
        let node = self.node(
            Expr::ternary(condition.expr, then_branch.expr, else_branch.expr),
            child_depth,
        )?;
        self.leave();
        Ok(node)
    }

    fn parse_logical_or(&mut self) -> Result<Node, ParseError> {
        self.parse_left_assoc(Self::parse_logical_and, |op| match op {
            Operator::OrOr => Some(BinaryOperator::Or),
            _ => None,
        })
    }

    fn parse_logical_and(&mut self) -> Result<Node, ParseError> {
        self.parse_left_assoc(Self::parse_equality, |op| match op {
            Operator::AndAnd => Some(BinaryOperator::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Result<Node, ParseError> {
        self.parse_left_assoc(Self::parse_relational, |op| match op {
            Operator::EqualEqual => Some(BinaryOperator::Equal),
            Operator::NotEqual => Some(BinaryOperator::NotEqual),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Node, ParseError> {
        self.parse_left_assoc(Self::parse_additive, |op| match op {
            Operator::Less => Some(BinaryOperator::LessThan),
            Operator::LessEqual => Some(BinaryOperator::LessEqual),
            Operator::Greater => Some(BinaryOperator::GreaterThan),
            Operator::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Node, ParseError> {
        self.parse_left_assoc(Self::parse_multiplicative, |op| match op {
            Operator::Plus => Some(BinaryOperator::Add),
            Operator::Minus => Some(BinaryOperator::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Node, ParseError> {
        self.parse_left_assoc(Self::parse_unary, |op| match op {
            Operator::Star => Some(BinaryOperator::Multiply),
            Operator::Slash => Some(BinaryOperator::Divide),
            _ => None,
        })
    }

    /// `operand ( OP operand )*`, folded to the left
    fn parse_left_assoc(
        &mut self,
        operand: fn(&mut Self) -> Result<Node, ParseError>,
        operator: fn(Operator) -> Option<BinaryOperator>,
    ) -> Result<Node, ParseError> {
        let mut left = operand(self)?;

        loop {
            let op = match self.current_kind() {
                Some(TokenKind::Operator(op)) => match operator(op) {
                    Some(op) => op,
                    None => break,
                },
                _ => break,
            };

            self.consume();
            let right = operand(self)?;
            let child_depth = left.depth.max(right.depth);
            left = self.node(Expr::binary(op, left.expr, right.expr), child_depth)?;
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        if self.eat(TokenKind::Operator(Operator::Minus)) {
            let operand = self.parse_primary()?;
            return self.node(
                Expr::unary(UnaryOperator::Negate, operand.expr),
                operand.depth,
            );
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let token = match self.current() {
            Some(token) => token,
            None => return Err(self.unexpected()),
        };

        match token.kind {
            TokenKind::Number => {
                self.consume();
                let value = parse_number(&token.text).ok_or_else(|| ParseError::UnexpectedToken {
                    found: token.describe(),
                    position: token.position,
                })?;
                Ok(Node::leaf(Expr::Number(value)))
            }

            TokenKind::Identifier => {
                self.consume();
                let slot = self.slots.get(token.text.as_str()).copied().ok_or_else(|| {
                    ParseError::UnknownVariable {
                        name: token.text.clone(),
                        position: token.position,
                    }
                })?;
                Ok(Node::leaf(Expr::Variable {
                    name: token.text.clone(),
                    slot,
                }))
            }

            TokenKind::LParen => self.parse_group(),

            _ => Err(self.unexpected()),
        }
    }

    /// Parentheses are already known to be balanced and non-empty
    fn parse_group(&mut self) -> Result<Node, ParseError> {
        self.consume();
        let inner = self.parse_ternary()?;

        if !self.eat(TokenKind::RParen) {
            return Err(self.unexpected());
        }
        Ok(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    const NO_VARS: [&str; 0] = [];

    fn parse_str(formula: &str, vars: &[&str]) -> Result<Expr, ParseError> {
        parse_formula(formula, vars, &Limits::default()).map(|h| h.root().clone())
    }

    fn num(n: i64) -> Expr {
        Expr::Number(Decimal::from(n))
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_str("42", &[]).unwrap(), num(42));
        assert_eq!(
            parse_str("3.14", &[]).unwrap(),
            Expr::Number(Decimal::new(314, 2))
        );
        assert_eq!(
            parse_str(".99", &[]).unwrap(),
            Expr::Number(Decimal::new(99, 2))
        );
    }

    #[test]
    fn test_parse_precedence() {
        // Should parse as 1+(2*3) due to precedence
        assert_eq!(
            parse_str("1+2*3", &[]).unwrap(),
            Expr::binary(
                BinaryOperator::Add,
                num(1),
                Expr::binary(BinaryOperator::Multiply, num(2), num(3))
            )
        );
    }

    #[test]
    fn test_parse_left_associative() {
        assert_eq!(
            parse_str("8 - 4 - 2", &[]).unwrap(),
            Expr::binary(
                BinaryOperator::Subtract,
                Expr::binary(BinaryOperator::Subtract, num(8), num(4)),
                num(2)
            )
        );
    }

    #[test]
    fn test_parse_logical_precedence() {
        // || binds looser than &&, which binds looser than comparisons
        let expr = parse_str("1 < 2 || 3 == 4 && 5", &[]).unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOperator::Or,
                Expr::binary(BinaryOperator::LessThan, num(1), num(2)),
                Expr::binary(
                    BinaryOperator::And,
                    Expr::binary(BinaryOperator::Equal, num(3), num(4)),
                    num(5)
                )
            )
        );
    }

    #[test]
    fn test_parse_ternary_right_associative() {
        assert_eq!(
            parse_str("1 ? 2 : 3 ? 4 : 5", &[]).unwrap(),
            Expr::ternary(num(1), num(2), Expr::ternary(num(3), num(4), num(5)))
        );
    }

    #[test]
    fn test_parse_variables_bind_slots() {
        let expr = parse_str("b - a", &["a", "b"]).unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOperator::Subtract,
                Expr::Variable {
                    name: "b".into(),
                    slot: 1
                },
                Expr::Variable {
                    name: "a".into(),
                    slot: 0
                }
            )
        );
    }

    #[test]
    fn test_parse_unary() {
        assert_eq!(
            parse_str("-5", &[]).unwrap(),
            Expr::unary(UnaryOperator::Negate, num(5))
        );
        assert_eq!(
            parse_str("2 * -(1 + 1)", &[]).unwrap(),
            Expr::binary(
                BinaryOperator::Multiply,
                num(2),
                Expr::unary(
                    UnaryOperator::Negate,
                    Expr::binary(BinaryOperator::Add, num(1), num(1))
                )
            )
        );
    }

    #[test]
    fn test_parse_double_negation_rejected() {
        assert_eq!(
            parse_str("--5", &[]),
            Err(ParseError::UnexpectedToken {
                found: "'-'".into(),
                position: 1
            })
        );
    }

    #[test]
    fn test_parse_parentheses() {
        assert_eq!(
            parse_str("(1+2)*3", &[]).unwrap(),
            Expr::binary(
                BinaryOperator::Multiply,
                Expr::binary(BinaryOperator::Add, num(1), num(2)),
                num(3)
            )
        );
    }

    #[test]
    fn test_empty_formula() {
        assert_eq!(parse_str("", &[]), Err(ParseError::EmptyFormula));
        assert_eq!(parse_str("   ", &[]), Err(ParseError::EmptyFormula));
    }

    #[test]
    fn test_empty_group() {
        assert_eq!(
            parse_str("1 + ()", &[]),
            Err(ParseError::EmptyGroup { position: 4 })
        );
        assert_eq!(
            parse_str("1 ()", &[]),
            Err(ParseError::EmptyGroup { position: 2 })
        );
        assert_eq!(
            parse_str("(())", &[]),
            Err(ParseError::EmptyGroup { position: 1 })
        );
    }

    #[test]
    fn test_call_syntax_rejected() {
        // Declared names cannot be invoked: there is no call syntax
        assert_eq!(
            parse_str("alert()", &["alert"]),
            Err(ParseError::EmptyGroup { position: 5 })
        );
        assert_eq!(
            parse_str("alert(1)", &["alert"]),
            Err(ParseError::UnexpectedToken {
                found: "'('".into(),
                position: 5
            })
        );
    }

    #[test]
    fn test_unbalanced_parens() {
        assert_eq!(
            parse_str("(1 + 2", &[]),
            Err(ParseError::UnbalancedParens { position: 0 })
        );
        assert_eq!(
            parse_str("1 + 2)", &[]),
            Err(ParseError::UnbalancedParens { position: 5 })
        );
        assert_eq!(
            parse_str(")", &[]),
            Err(ParseError::UnbalancedParens { position: 0 })
        );
        assert_eq!(
            parse_str("((1)", &[]),
            Err(ParseError::UnbalancedParens { position: 0 })
        );
        assert_eq!(
            parse_str("(1) + 2)", &[]),
            Err(ParseError::UnbalancedParens { position: 7 })
        );
    }

    #[test]
    fn test_formula_ends_inside_group() {
        assert_eq!(
            parse_str("(1 +", &[]),
            Err(ParseError::UnbalancedParens { position: 0 })
        );
        assert_eq!(
            parse_str("(1 ? 2", &[]),
            Err(ParseError::UnbalancedParens { position: 0 })
        );
        assert_eq!(
            parse_str("2 * ((1", &[]),
            Err(ParseError::UnbalancedParens { position: 5 })
        );
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(
            parse_str("price * rate", &["price", "rat"]),
            Err(ParseError::UnknownVariable {
                name: "rate".into(),
                position: 8
            })
        );
        // Prefix of a declared name is not that name
        assert_eq!(
            parse_str("pric", &["price"]),
            Err(ParseError::UnknownVariable {
                name: "pric".into(),
                position: 0
            })
        );
    }

    #[test]
    fn test_unexpected_tokens() {
        assert_eq!(
            parse_str("1 +", &[]),
            Err(ParseError::UnexpectedToken {
                found: "end of formula".into(),
                position: 3
            })
        );
        assert_eq!(
            parse_str("1 2", &[]),
            Err(ParseError::UnexpectedToken {
                found: "number '2'".into(),
                position: 2
            })
        );
        assert_eq!(
            parse_str("1 ? 2", &[]),
            Err(ParseError::UnexpectedToken {
                found: "end of formula".into(),
                position: 5
            })
        );
        assert_eq!(
            parse_str("(1 +)", &[]),
            Err(ParseError::UnexpectedToken {
                found: "')'".into(),
                position: 4
            })
        );
    }

    #[test]
    fn test_lex_errors_surface() {
        assert!(matches!(
            parse_str("alert(1)", &[]),
            Err(ParseError::Lex(crate::LexError::UnexpectedChar {
                ch: 'a',
                position: 0
            }))
        ));
    }

    #[test]
    fn test_invalid_declarations() {
        assert_eq!(
            parse_str("1", &["1abc"]),
            Err(ParseError::InvalidVariableName {
                name: "1abc".into()
            })
        );
        assert_eq!(
            parse_str("1", &[""]),
            Err(ParseError::InvalidVariableName { name: "".into() })
        );
        assert_eq!(
            parse_str("x", &["x", "x"]),
            Err(ParseError::DuplicateVariable { name: "x".into() })
        );
    }

    #[test]
    fn test_nesting_too_deep() {
        let limits = Limits::default().with_max_tree_depth(4);
        let formula = "((((1))))";
        assert_eq!(
            parse_formula(formula, &NO_VARS, &limits).map(|_| ()),
            Err(ParseError::TooDeep { max: 4 })
        );
        assert!(parse_formula("(((1)))", &NO_VARS, &limits).is_ok());
    }

    #[test]
    fn test_tree_too_deep() {
        // Left-deep chain of additions without any parentheses
        let limits = Limits::default().with_max_tree_depth(4);
        assert!(parse_formula("1+1+1+1", &NO_VARS, &limits).is_ok());
        assert_eq!(
            parse_formula("1+1+1+1+1", &NO_VARS, &limits).map(|_| ()),
            Err(ParseError::TooDeep { max: 4 })
        );
    }

    #[test]
    fn test_ten_thousand_parens() {
        let formula = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let limits = Limits::default()
            .with_max_formula_length(30_000)
            .with_max_token_count(30_000);
        assert_eq!(
            parse_formula(&formula, &NO_VARS, &limits).map(|_| ()),
            Err(ParseError::TooDeep { max: 64 })
        );
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("price"));
        assert!(is_identifier("_x1"));
        assert!(is_identifier("numberPreviousItemsPurchased"));
        assert!(!is_identifier("9lives"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("prix€"));
    }
}
