//! Expression tree produced by the filter compiler.

use serde_json::Map;
use std::fmt;

use super::value::Value;

/// Root filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Field comparison: `distance gt 100`
    Comparison {
        field: String,
        op: CompareOp,
        value: Value,
    },

    /// Boolean combination: `(expr1) and (expr2)`
    Combination {
        op: Combinator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// Comparison operator between a field and a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq, // eq
    Ne, // ne
    Gt, // gt
    Lt, // lt
}

/// Boolean connective between two expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And, // and
    Or,  // or
}

/// Anything that may follow a left operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    Compare(CompareOp),
    Combine(Combinator),
}

impl CompareOp {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "gt" => Some(CompareOp::Gt),
            "lt" => Some(CompareOp::Lt),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Lt => "lt",
        }
    }

    /// Operator key in a query document.
    pub fn document_key(self) -> &'static str {
        match self {
            CompareOp::Eq => "$eq",
            CompareOp::Ne => "$ne",
            CompareOp::Gt => "$gt",
            CompareOp::Lt => "$lt",
        }
    }
}

impl Combinator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "and" => Some(Combinator::And),
            "or" => Some(Combinator::Or),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Combinator::And => "and",
            Combinator::Or => "or",
        }
    }

    pub fn document_key(self) -> &'static str {
        match self {
            Combinator::And => "$and",
            Combinator::Or => "$or",
        }
    }
}

impl Connective {
    pub fn from_token(token: &str) -> Option<Self> {
        CompareOp::from_token(token)
            .map(Connective::Compare)
            .or_else(|| Combinator::from_token(token).map(Connective::Combine))
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Fully parenthesized query text that compiles back to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Comparison { field, op, value } => write!(f, "{} {} {}", field, op, value),
            // Chains fold to the left, so a combination on the left needs no parentheses.
            Expr::Combination { op, left, right } => match left.as_ref() {
                Expr::Combination { .. } => write!(f, "{} {} ({})", left, op, right),
                Expr::Comparison { .. } => write!(f, "({}) {} ({})", left, op, right),
            },
        }
    }
}

impl Expr {
    pub fn comparison(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Expr::Comparison {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn combination(op: Combinator, left: Expr, right: Expr) -> Self {
        Expr::Combination {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Translate the tree into a nested query document:
    /// `{"$and": [{"distance": {"$gt": 100.0}}, ...]}`.
    pub fn to_document(&self) -> serde_json::Value {
        let mut doc = Map::new();
        match self {
            Expr::Comparison { field, op, value } => {
                let mut predicate = Map::new();
                predicate.insert(op.document_key().to_string(), value.to_json());
                doc.insert(field.clone(), serde_json::Value::Object(predicate));
            }
            Expr::Combination { op, left, right } => {
                doc.insert(
                    op.document_key().to_string(),
                    serde_json::Value::Array(vec![left.to_document(), right.to_document()]),
                );
            }
        }
        serde_json::Value::Object(doc)
    }

    /// Number of comparison leaves.
    pub fn comparisons(&self) -> usize {
        match self {
            Expr::Comparison { .. } => 1,
            Expr::Combination { left, right, .. } => left.comparisons() + right.comparisons(),
        }
    }
}
