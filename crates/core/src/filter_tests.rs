// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

struct Fields(HashMap<&'static str, &'static str>);

impl FieldSource for Fields {
    fn field(&self, name: &str) -> Option<String> {
        self.0.get(name).map(|v| v.to_string())
    }
}

fn agent() -> Fields {
    Fields(HashMap::from([
        ("name", "demo"),
        ("state", "RUNNING"),
        ("provider", "docker"),
    ]))
}

#[test]
fn true_matches_everything() {
    assert!(FilterExpr::True.matches(&agent()));
}

#[yare::parameterized(
    eq_hit = { FilterOp::Eq, "RUNNING", true },
    eq_miss = { FilterOp::Eq, "STOPPED", false },
    ne = { FilterOp::Ne, "STOPPED", true },
    contains = { FilterOp::Contains, "RUN", true },
    starts_with = { FilterOp::StartsWith, "RUN", true },
    starts_with_miss = { FilterOp::StartsWith, "ING", false },
)]
fn comparison_operators(op: FilterOp, value: &str, expected: bool) {
    let expr = FilterExpr::Cmp {
        field: "state".into(),
        op,
        value: value.into(),
    };
    assert_eq!(expr.matches(&agent()), expected);
}

#[test]
fn missing_field_compares_as_empty() {
    assert!(!FilterExpr::eq("missing", "x").matches(&agent()));
    let ne = FilterExpr::Cmp {
        field: "missing".into(),
        op: FilterOp::Ne,
        value: "x".into(),
    };
    assert!(ne.matches(&agent()));
}

#[test]
fn boolean_composition() {
    let expr = FilterExpr::And(vec![
        FilterExpr::eq("provider", "docker"),
        FilterExpr::Or(vec![
            FilterExpr::eq("state", "RUNNING"),
            FilterExpr::eq("state", "WAITING"),
        ]),
        FilterExpr::Not(Box::new(FilterExpr::eq("name", "other"))),
    ]);
    assert!(expr.matches(&agent()));
}

#[test]
fn serde_round_trip() {
    let expr = FilterExpr::And(vec![
        FilterExpr::eq("name", "demo"),
        FilterExpr::contains("state", "RUN"),
    ]);
    let json = serde_json::to_string(&expr).unwrap();
    let back: FilterExpr = serde_json::from_str(&json).unwrap();
    assert_eq!(back, expr);
}
