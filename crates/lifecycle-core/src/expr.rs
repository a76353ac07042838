//! # Expression Module
//!
//! The rule language shared by the stage and health classifiers.
//!
//! ```text
//! expression := clause ( "AND" clause )*
//! clause     := name op literal
//! name       := [A-Za-z0-9_.]+
//! op         := "==" | ">=" | "<=" | ">" | "<"
//! ```
//!
//! `AND` is case-insensitive and must be surrounded by whitespace. There is
//! no OR, no negation and no grouping.
//!
//! ## Fail-Closed Evaluation
//!
//! Expressions are parsed once into [`Expression`]. Text that does not fit
//! the grammar becomes [`Expr::Malformed`], which never matches. A clause
//! naming a variable absent from the [`Bindings`] is false, and so is a
//! numeric variable compared against a non-numeric literal. Nothing in this
//! module returns an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance used by `==` on numeric variables.
pub const EQUALITY_EPSILON: f64 = 0.001;

// =============================================================================
// OPERATORS & LITERALS
// =============================================================================

/// Comparison operators supported in a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
}

impl CompareOp {
    /// Operator tokens, two-character tokens first so `>=` is not read as `>`.
    const TOKENS: [(&'static str, CompareOp); 5] = [
        (">=", CompareOp::Ge),
        ("<=", CompareOp::Le),
        ("==", CompareOp::Eq),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
    ];

    /// Split a leading operator token off `input`.
    fn strip_prefix(input: &str) -> Option<(CompareOp, &str)> {
        Self::TOKENS
            .iter()
            .find_map(|(token, op)| input.strip_prefix(token).map(|rest| (*op, rest)))
    }

    /// Get the operator token.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
        }
    }

    /// Apply the operator to two numbers.
    #[must_use]
    pub fn compare(&self, actual: f64, expected: f64) -> bool {
        match self {
            CompareOp::Eq => (actual - expected).abs() < EQUALITY_EPSILON,
            CompareOp::Ge => actual >= expected,
            CompareOp::Le => actual <= expected,
            CompareOp::Gt => actual > expected,
            CompareOp::Lt => actual < expected,
        }
    }
}

/// Right-hand side of a clause: the raw token plus its numeric reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    raw: String,
    number: Option<f64>,
}

impl Literal {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            number: raw.parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// The literal exactly as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The literal read as a finite number, if it is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        self.number
    }
}

// =============================================================================
// BINDINGS
// =============================================================================

/// A named value an expression can reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Number(f64),
    Text(String),
}

/// Named values visible to an expression.
///
/// Uses `BTreeMap` for deterministic iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: BTreeMap<String, Binding>,
}

impl Bindings {
    /// Create an empty set of bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a numeric variable.
    #[must_use]
    pub fn with_number(mut self, name: &str, value: f64) -> Self {
        self.values.insert(name.to_string(), Binding::Number(value));
        self
    }

    /// Bind a text variable.
    #[must_use]
    pub fn with_text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values
            .insert(name.to_string(), Binding::Text(value.into()));
        self
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.values.get(name)
    }
}

// =============================================================================
// SYNTAX TREE
// =============================================================================

/// A single `name op literal` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub name: String,
    pub op: CompareOp,
    pub literal: Literal,
}

impl Comparison {
    /// Parse one clause. Returns `None` if it does not fit the grammar.
    fn parse(clause: &str) -> Option<Self> {
        let clause = clause.trim();
        let name_len = clause
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(clause.len());
        if name_len == 0 {
            return None;
        }

        let (name, rest) = clause.split_at(name_len);
        let (op, rest) = CompareOp::strip_prefix(rest.trim_start())?;
        let literal = rest.trim();
        if literal.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            op,
            literal: Literal::new(literal),
        })
    }

    /// Evaluate against bindings. Unknown variables are false.
    ///
    /// Text variables only support `==`, compared case-sensitively with the
    /// raw literal.
    #[must_use]
    pub fn evaluate(&self, bindings: &Bindings) -> bool {
        match bindings.get(&self.name) {
            Some(Binding::Number(actual)) => self
                .literal
                .as_number()
                .is_some_and(|expected| self.op.compare(*actual, expected)),
            Some(Binding::Text(actual)) => {
                self.op == CompareOp::Eq && actual == self.literal.as_str()
            }
            None => false,
        }
    }
}

/// Parsed form of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A single clause.
    Comparison(Comparison),
    /// Two or more clauses that must all hold.
    Conjunction(Vec<Comparison>),
    /// Text outside the grammar. Never matches.
    Malformed,
}

impl Expr {
    fn parse(source: &str) -> Self {
        let mut clauses = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for token in source.split_whitespace() {
            if token.eq_ignore_ascii_case("AND") {
                clauses.push(current.join(" "));
                current.clear();
            } else {
                current.push(token);
            }
        }
        clauses.push(current.join(" "));

        let parsed: Option<Vec<Comparison>> =
            clauses.iter().map(|c| Comparison::parse(c)).collect();

        match parsed {
            Some(mut comparisons) if comparisons.len() == 1 => {
                comparisons.pop().map_or(Expr::Malformed, Expr::Comparison)
            }
            Some(comparisons) => Expr::Conjunction(comparisons),
            None => Expr::Malformed,
        }
    }

    fn evaluate(&self, bindings: &Bindings) -> bool {
        match self {
            Expr::Comparison(comparison) => comparison.evaluate(bindings),
            Expr::Conjunction(clauses) => clauses.iter().all(|c| c.evaluate(bindings)),
            Expr::Malformed => false,
        }
    }
}

// =============================================================================
// EXPRESSION
// =============================================================================

/// A rule expression: its source text and its parsed form.
///
/// Serializes as the source string, so rule files round-trip verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Expression {
    source: String,
    expr: Expr,
}

impl Expression {
    /// Parse an expression. Never fails; see [`Expr::Malformed`].
    #[must_use]
    pub fn parse(source: &str) -> Self {
        Self {
            source: source.to_string(),
            expr: Expr::parse(source),
        }
    }

    /// The text the expression was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed form.
    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// True if the source is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }

    /// Evaluate against bindings.
    #[must_use]
    pub fn evaluate(&self, bindings: &Bindings) -> bool {
        self.expr.evaluate(bindings)
    }
}

impl From<String> for Expression {
    fn from(source: String) -> Self {
        Self::parse(&source)
    }
}

impl From<&str> for Expression {
    fn from(source: &str) -> Self {
        Self::parse(source)
    }
}

impl From<Expression> for String {
    fn from(expression: Expression) -> Self {
        expression.source
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse and evaluate in one step.
#[must_use]
pub fn evaluate(expression: &str, bindings: &Bindings) -> bool {
    Expression::parse(expression).evaluate(bindings)
}

// =============================================================================
// TESTS
// =============================================================================
