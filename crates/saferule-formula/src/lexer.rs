//! Formula tokenizer
//!
//! Fail-closed scanner: every character of the input must belong to the
//! permitted set, otherwise the whole formula is rejected. Letters are only
//! permitted when they occur in one of the allowed variable names.

use crate::error::LexError;
use crate::limits::Limits;
use crate::token::{Operator, Token, TokenKind};
use ahash::AHashSet;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Tokenize formula text
///
/// # Example
/// ```rust
/// use saferule_formula::{tokenize, Limits, TokenKind};
///
/// let tokens = tokenize("price * 0.9", &["price"], &Limits::default()).unwrap();
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[0].kind, TokenKind::Identifier);
/// ```
pub fn tokenize<S: AsRef<str>>(
    formula: &str,
    allowed_variables: &[S],
    limits: &Limits,
) -> Result<Vec<Token>, LexError> {
    let length = formula.chars().count();
    if length > limits.max_formula_length {
        return Err(LexError::TooLong {
            length,
            max: limits.max_formula_length,
        });
    }

    let allowed: AHashSet<char> = allowed_variables
        .iter()
        .flat_map(|name| name.as_ref().chars())
        .collect();

    let tokens = Lexer::new(formula, allowed).run()?;

    if tokens.len() > limits.max_token_count {
        return Err(LexError::TooManyTokens {
            count: tokens.len(),
            max: limits.max_token_count,
        });
    }

    Ok(tokens)
}

/// Parse the text of a number token into a decimal
///
/// Accepts `12`, `12.5`, `12.` and `.5`.
pub(crate) fn parse_number(text: &str) -> Option<Decimal> {
    let mut normalized = String::with_capacity(text.len() + 2);
    if text.starts_with('.') {
        normalized.push('0');
    }
    normalized.push_str(text);
    if text.ends_with('.') {
        normalized.push('0');
    }
    Decimal::from_str(&normalized).ok()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    allowed: AHashSet<char>,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(input: &str, allowed: AHashSet<char>) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            allowed,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            self.scan_token(c)?;
        }
        Ok(self.tokens)
    }

    fn scan_token(&mut self, c: char) -> Result<(), LexError> {
        let start = self.pos;

        // Single-character tokens
        let single = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '?' => Some(TokenKind::Question),
            ':' => Some(TokenKind::Colon),
            '+' => Some(TokenKind::Operator(Operator::Plus)),
            '-' => Some(TokenKind::Operator(Operator::Minus)),
            '*' => Some(TokenKind::Operator(Operator::Star)),
            '/' => Some(TokenKind::Operator(Operator::Slash)),
            _ => None,
        };
        if let Some(kind) = single {
            self.single(kind);
            return Ok(());
        }

        // Operators of one or two characters
        match c {
            '<' => {
                let op = self.with_optional_eq(Operator::Less, Operator::LessEqual);
                self.push_operator(op, start);
                return Ok(());
            }
            '>' => {
                let op = self.with_optional_eq(Operator::Greater, Operator::GreaterEqual);
                self.push_operator(op, start);
                return Ok(());
            }
            '=' => return self.pair('=', Operator::EqualEqual),
            '!' => return self.pair('=', Operator::NotEqual),
            '&' => return self.pair('&', Operator::AndAnd),
            '|' => return self.pair('|', Operator::OrOr),
            _ => {}
        }

        if c.is_ascii_digit() || c == '.' {
            return self.scan_number();
        }

        if (c.is_ascii_alphabetic() || c == '_') && self.allowed.contains(&c) {
            return self.scan_identifier();
        }

        Err(LexError::UnexpectedChar {
            ch: c,
            position: start,
        })
    }

    fn scan_number(&mut self) -> Result<(), LexError> {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if text == "." || parse_number(&text).is_none() {
            return Err(LexError::MalformedNumber {
                text,
                position: start,
            });
        }

        self.tokens.push(Token::new(TokenKind::Number, text, start));
        Ok(())
    }

    fn scan_identifier(&mut self) -> Result<(), LexError> {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            if !c.is_ascii_digit() && !self.allowed.contains(&c) {
                return Err(LexError::UnexpectedChar {
                    ch: c,
                    position: self.pos,
                });
            }
            self.pos += 1;
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        self.tokens.push(Token::new(TokenKind::Identifier, text, start));
        Ok(())
    }

    // === Helper methods ===

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 1;
        let text = self.chars[start].to_string();
        self.tokens.push(Token::new(kind, text, start));
    }

    fn with_optional_eq(&mut self, bare: Operator, with_eq: Operator) -> Operator {
        if self.peek_at(1) == Some('=') {
            self.pos += 2;
            with_eq
        } else {
            self.pos += 1;
            bare
        }
    }

    /// Two-character operator whose first character is meaningless alone
    fn pair(&mut self, second: char, op: Operator) -> Result<(), LexError> {
        let start = self.pos;
        if self.peek_at(1) != Some(second) {
            return Err(LexError::UnexpectedChar {
                ch: self.chars[start],
                position: start,
            });
        }
        self.pos += 2;
        self.push_operator(op, start);
        Ok(())
    }

    fn push_operator(&mut self, op: Operator, start: usize) {
        self.tokens
            .push(Token::new(TokenKind::Operator(op), op.as_str(), start));
    }
}
