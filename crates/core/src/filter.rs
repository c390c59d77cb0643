// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed predicate language for listing filters.
//!
//! The string grammar lives outside the core; callers build the AST
//! directly. Evaluation is over a [`FieldSource`], so the same expressions
//! filter agents, hosts, or anything else exposing named string fields.

use serde::{Deserialize, Serialize};

/// Anything with named string-valued fields.
pub trait FieldSource {
    /// Returns the field's value, or `None` if the field does not exist.
    fn field(&self, name: &str) -> Option<String>;
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Contains,
    StartsWith,
}

/// A boolean expression over named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterExpr {
    /// Matches everything.
    True,
    Cmp {
        field: String,
        op: FilterOp,
        value: String,
    },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::Cmp {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        FilterExpr::Cmp {
            field: field.into(),
            op: FilterOp::Contains,
            value: value.into(),
        }
    }

    /// Evaluate against a field source. A missing field compares as the
    /// empty string, so `Ne` matches and `Eq` does not.
    pub fn matches<S: FieldSource>(&self, source: &S) -> bool {
        match self {
            FilterExpr::True => true,
            FilterExpr::Cmp { field, op, value } => {
                let actual = source.field(field).unwrap_or_default();
                match op {
                    FilterOp::Eq => actual == *value,
                    FilterOp::Ne => actual != *value,
                    FilterOp::Contains => actual.contains(value.as_str()),
                    FilterOp::StartsWith => actual.starts_with(value.as_str()),
                }
            }
            FilterExpr::And(exprs) => exprs.iter().all(|e| e.matches(source)),
            FilterExpr::Or(exprs) => exprs.iter().any(|e| e.matches(source)),
            FilterExpr::Not(expr) => !expr.matches(source),
        }
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
