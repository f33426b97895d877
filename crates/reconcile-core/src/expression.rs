//! A small boolean/string expression language evaluated against a
//! [`LabelSet`], used for context criteria, rule filters, and allocation
//! keys.
//!
//! Grammar (informal):
//!
//! ```text
//! expr       := or_expr
//! or_expr    := and_expr ( "||" and_expr )*
//! and_expr   := unary ( "&&" unary )*
//! unary      := "!" unary | atom
//! atom       := "(" expr ")" | comparison | identifier | "true" | "false"
//! comparison := identifier ( "==" | "!=" ) string_literal
//! identifier := label key (bare word, dots and hyphens allowed)
//! ```
//!
//! A bare identifier is truthy iff the label exists and is non-empty —
//! this is what lets allocation-key expressions simply name a label to use
//! its value as the allocation suffix (see [`Expression::evaluate_string`]).

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{codes, ErrorCategory, ReconcileError};
use crate::labels::LabelSet;

/// A parsed expression, compiled once and evaluated many times.
#[derive(Clone, Debug)]
pub struct Expression {
    source: Arc<str>,
    ast: Node,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    True,
    False,
    Ident(String),
    Eq(String, String),
    NotEq(String, String),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

impl Expression {
    pub fn parse(source: impl Into<Arc<str>>) -> Result<Self, ReconcileError> {
        let source: Arc<str> = source.into();
        let mut parser = Parser::new(&source);
        let ast = parser.parse_expr()?;
        parser.expect_end()?;
        Ok(Self { source, ast })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate_bool(&self, labels: &LabelSet) -> Result<bool, ReconcileError> {
        eval(&self.ast, labels)
    }

    /// Evaluates the expression as a label reference and returns its value,
    /// used for allocation-key expressions that must yield a string, not a
    /// boolean. Only a bare identifier expression is valid here.
    pub fn evaluate_string(&self, labels: &LabelSet) -> Result<String, ReconcileError> {
        match &self.ast {
            Node::Ident(key) => labels.get(key).map(str::to_owned).ok_or_else(|| {
                ReconcileError::new(
                    codes::EXPRESSION_EVAL_FAILED,
                    ErrorCategory::ExpressionError,
                    format!("label '{key}' not present for allocation key expression"),
                )
            }),
            _ => Err(ReconcileError::new(
                codes::EXPRESSION_EVAL_FAILED,
                ErrorCategory::ExpressionError,
                format!(
                    "expression '{}' is not a bare label reference",
                    self.source
                ),
            )),
        }
    }
}

fn eval(node: &Node, labels: &LabelSet) -> Result<bool, ReconcileError> {
    Ok(match node {
        Node::True => true,
        Node::False => false,
        Node::Ident(key) => labels.get(key).map(|v| !v.is_empty()).unwrap_or(false),
        Node::Eq(key, value) => labels.get(key) == Some(value.as_str()),
        Node::NotEq(key, value) => labels.get(key) != Some(value.as_str()),
        Node::Not(inner) => !eval(inner, labels)?,
        Node::And(lhs, rhs) => eval(lhs, labels)? && eval(rhs, labels)?,
        Node::Or(lhs, rhs) => eval(lhs, labels)? || eval(rhs, labels)?,
    })
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse_expr(&mut self) -> Result<Node, ReconcileError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Node, ReconcileError> {
        let mut lhs = self.parse_and()?;
        loop {
            self.skip_ws();
            if self.consume_token("||") {
                let rhs = self.parse_and()?;
                lhs = Node::Or(Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Node, ReconcileError> {
        let mut lhs = self.parse_unary()?;
        loop {
            self.skip_ws();
            if self.consume_token("&&") {
                let rhs = self.parse_unary()?;
                lhs = Node::And(Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Node, ReconcileError> {
        self.skip_ws();
        if self.consume_token("!") {
            return Ok(Node::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Node, ReconcileError> {
        self.skip_ws();
        if self.consume_token("(") {
            let inner = self.parse_expr()?;
            self.skip_ws();
            if !self.consume_token(")") {
                return Err(self.error("expected ')'"));
            }
            return Ok(inner);
        }

        let ident = self.parse_ident()?;
        self.skip_ws();
        if self.consume_token("==") {
            let value = self.parse_string_literal()?;
            return Ok(Node::Eq(ident, value));
        }
        if self.consume_token("!=") {
            let value = self.parse_string_literal()?;
            return Ok(Node::NotEq(ident, value));
        }
        match ident.as_str() {
            "true" => Ok(Node::True),
            "false" => Ok(Node::False),
            _ => Ok(Node::Ident(ident)),
        }
    }

    fn parse_ident(&mut self) -> Result<String, ReconcileError> {
        self.skip_ws();
        let start = self.pos;
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() {
            let c = bytes[self.pos] as char;
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' || c == ':' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error("expected identifier"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn parse_string_literal(&mut self) -> Result<String, ReconcileError> {
        self.skip_ws();
        let bytes = self.src.as_bytes();
        if self.pos >= bytes.len() || (bytes[self.pos] != b'"' && bytes[self.pos] != b'\'') {
            return Err(self.error("expected string literal"));
        }
        let quote = bytes[self.pos];
        self.pos += 1;
        let start = self.pos;
        while self.pos < bytes.len() && bytes[self.pos] != quote {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return Err(self.error("unterminated string literal"));
        }
        let value = self.src[start..self.pos].to_string();
        self.pos += 1;
        Ok(value)
    }

    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src.as_bytes()[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn consume_token(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.src[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect_end(&mut self) -> Result<(), ReconcileError> {
        self.skip_ws();
        if self.pos != self.src.len() {
            return Err(self.error("trailing input"));
        }
        Ok(())
    }

    fn error(&self, message: &str) -> ReconcileError {
        ReconcileError::new(
            codes::EXPRESSION_EVAL_FAILED,
            ErrorCategory::ExpressionError,
            format!("failed to parse expression '{}': {} (at {})", self.src, message, self.pos),
        )
    }
}

/// A require-any/require-none criteria predicate, the building block for
/// context selection and rule filters.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    pub require_any: Vec<Expression>,
    pub require_none: Vec<Expression>,
}

impl Criteria {
    pub fn allows(
        &self,
        labels: &LabelSet,
        cache: Option<&mut ExpressionCache>,
    ) -> Result<bool, ReconcileError> {
        let mut owned_cache;
        let cache = match cache {
            Some(c) => c,
            None => {
                owned_cache = ExpressionCache::new();
                &mut owned_cache
            }
        };

        if !self.require_any.is_empty() {
            let mut any_true = false;
            for expr in &self.require_any {
                if cache.eval_bool(expr, labels)? {
                    any_true = true;
                    break;
                }
            }
            if !any_true {
                return Ok(false);
            }
        }

        for expr in &self.require_none {
            if cache.eval_bool(expr, labels)? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Memoizes `(expression text, label-set fingerprint) -> bool` for the
/// lifetime of a single resolve pass.
#[derive(Default)]
pub struct ExpressionCache {
    entries: HashMap<(Arc<str>, u64), bool>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eval_bool(
        &mut self,
        expr: &Expression,
        labels: &LabelSet,
    ) -> Result<bool, ReconcileError> {
        let key = (Arc::from(expr.source()), fingerprint(labels));
        if let Some(cached) = self.entries.get(&key) {
            return Ok(*cached);
        }
        let value = expr.evaluate_bool(labels)?;
        self.entries.insert(key, value);
        Ok(value)
    }
}

/// FNV-1a hash over the sorted `(key, value)` pairs of a label set, used as
/// the "params-fingerprint" half of the expression cache key.
fn fingerprint(labels: &LabelSet) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET;
    for (k, v) in labels.iter() {
        for byte in k.as_bytes().iter().chain(&[0u8]).chain(v.as_bytes()) {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}
