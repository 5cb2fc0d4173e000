//! End-to-end pipeline scenarios run against `Expr::evaluate()`, mirroring
//! the worked examples used to pin down the compiler's contract.

use crate::error::Error;
use crate::expr::Expr;
use crate::predicate::Predicate;
use crate::scope::{Queryable, Queryables, Scope};
use crate::value::{Kind, Wire};

fn scope() -> Scope {
    let mut q = Queryables::new();
    q.insert("index".into(), Some(Queryable::new(Kind::Datetime64)));
    q.insert("string".into(), None);
    q.insert("A".into(), Some(Queryable::new(Kind::Integer)));
    q.insert("cat".into(), Some(Queryable::category(vec!["x".into(), "y".into(), "z".into()])));
    Scope::new(q)
}

#[test]
fn scenario_1_ordering_comparison_is_a_pure_condition() {
    let e = Expr::from_text("index >= \"2013-01-01\"", scope(), None);
    let (cond, filt) = e.evaluate().unwrap();
    assert_eq!(cond.as_deref(), Some("(index >= 1356998400000000000)"));
    assert!(filt.is_empty());
}

#[test]
fn scenario_2_equality_on_unindexed_field_is_a_pure_filter() {
    let e = Expr::from_text("string == \"bar\"", scope(), None);
    let (cond, filt) = e.evaluate().unwrap();
    assert!(cond.is_none());
    assert_eq!(filt, vec![("string".to_string(), Predicate::in_set(vec![Wire::Str("bar".into())]))]);
}

#[test]
fn scenario_3_inverting_a_multi_value_equality_condition_is_rejected() {
    let e = Expr::from_text("~(A == [1,2,3])", scope(), None);
    let err = e.evaluate().unwrap_err();
    assert!(matches!(err, Error::UnsupportedUnary { .. }));
}

#[test]
fn scenario_4_category_equality_coerces_to_its_ordered_position() {
    let e = Expr::from_text("cat == \"y\"", scope(), None);
    let (cond, filt) = e.evaluate().unwrap();
    assert_eq!(cond.as_deref(), Some("(cat == 1)"));
    assert!(filt.is_empty());
}

#[test]
fn scenario_5_equality_over_threshold_falls_back_to_a_filter() {
    let values: Vec<String> = (1..=40).map(|i| i.to_string()).collect();
    let src = format!("A == [{}]", values.join(","));
    let e = Expr::from_text(&src, scope(), None);
    let (cond, filt) = e.evaluate().unwrap();
    assert!(cond.is_none());
    assert_eq!(filt.len(), 1);
    assert_eq!(filt[0].0, "A");
    assert_eq!(filt[0].1.values.len(), 40);
}

#[test]
fn scenario_6_disjunction_with_an_unindexed_branch_cannot_be_pushed_down() {
    let locals = [
        ("t1".to_string(), crate::scope::ScopeValue::Str("2013-01-01".into())),
        ("t2".to_string(), crate::scope::ScopeValue::Str("2014-01-01".into())),
    ]
    .into_iter()
    .collect();
    let scope = Scope::with_locals(scope().queryables().clone(), locals);
    let e = Expr::from_text("(index >= t1 & index <= t2) | string == \"bar\"", scope, None);
    let (cond, filt) = e.evaluate().unwrap();
    assert!(cond.is_none());
    assert_eq!(filt, vec![("string".to_string(), Predicate::in_set(vec![Wire::Str("bar".into())]))]);
}

#[test]
fn invariant_evaluate_is_idempotent() {
    let e = Expr::from_text("index >= \"2013-01-01\" & string == \"bar\"", scope(), None);
    let first = e.evaluate().unwrap();
    let second = e.evaluate().unwrap();
    assert_eq!(first, second);
}

#[test]
fn invariant_double_invert_of_filter_is_identity() {
    let e = Expr::from_text("~(~(string == \"bar\"))", scope(), None);
    let (_, filt) = e.evaluate().unwrap();
    assert_eq!(filt, vec![("string".to_string(), Predicate::in_set(vec![Wire::Str("bar".into())]))]);
}

#[test]
fn invariant_boolean_tree_of_pure_conditions_has_null_filter() {
    let e = Expr::from_text("index >= \"2013-01-01\" & index <= \"2014-01-01\"", scope(), None);
    let (cond, filt) = e.evaluate().unwrap();
    assert!(cond.is_some());
    assert!(filt.is_empty());
}
