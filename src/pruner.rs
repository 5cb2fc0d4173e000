//! Classifies each comparison leaf as a pushdown condition or a residual
//! filter, then prunes the boolean tree bottom-up, collapsing same-role
//! subtrees and folding away `~` by inversion or by dropping to null.

use tracing::debug;

use crate::error::{Error, Result};
use crate::predicate::Predicate;
use crate::scope::Queryables;
use crate::typed_ast::{Op, Side, TypedExpr};
use crate::value::{convert_value, Literal, TermValue, Wire, MAX_SELECTORS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Condition,
    Filter,
}

/// The result of pruning one subtree under a single role. `JointFilter` is
/// a structural marker for "two filters combined by a boolean operator" -
/// it carries no representable predicate and is a design-time error if it
/// survives to the root.
#[derive(Debug, Clone, PartialEq)]
pub enum Pruned {
    Null,
    Condition(String),
    Filter(String, Predicate),
    JointFilter(Box<Pruned>, Box<Pruned>),
}

pub fn prune(expr: &TypedExpr, role: Role, queryables: &Queryables, encoding: Option<&str>) -> Result<Pruned> {
    match expr {
        TypedExpr::BinOp { op, lhs, rhs } if op.is_bool() => {
            let left = prune(lhs, role, queryables, encoding)?;
            let right = prune(rhs, role, queryables, encoding)?;
            Ok(combine(left, right, *op, role))
        }
        TypedExpr::BinOp { op, lhs, rhs } => classify(role, lhs, *op, rhs, queryables, encoding),
        TypedExpr::Unary { operand } => {
            let child = prune(operand, role, queryables, encoding)?;
            match (role, child) {
                (Role::Condition, Pruned::Condition(c)) => {
                    Err(Error::UnsupportedUnary { reason: format!("cannot invert a pushdown condition ({c})") })
                }
                (Role::Condition, _) => Ok(Pruned::Null),
                (Role::Filter, Pruned::Filter(col, pred)) => Ok(Pruned::Filter(col, pred.invert())),
                (Role::Filter, _) => Ok(Pruned::Null),
            }
        }
        TypedExpr::Term { .. } | TypedExpr::Constant { .. } => {
            Err(Error::UnsupportedConstruct { what: "a term cannot appear outside of a comparison".into() })
        }
    }
}

fn combine(left: Pruned, right: Pruned, op: Op, role: Role) -> Pruned {
    match (left, right) {
        (Pruned::Null, Pruned::Null) => Pruned::Null,
        // A disjunction cannot safely drop a branch that has no condition:
        // applying only the other branch's condition would exclude rows
        // that satisfy the dropped branch. Conjunction absorption stays
        // sound because the dropped branch still gets enforced by the
        // filter-role pass over the same tree.
        (Pruned::Null, _) | (_, Pruned::Null) if role == Role::Condition && op == Op::Or => Pruned::Null,
        (Pruned::Null, x) | (x, Pruned::Null) => x,
        (Pruned::Condition(a), Pruned::Condition(b)) if role == Role::Condition => {
            Pruned::Condition(format!("({a} {} {b})", op.symbol()))
        }
        (a, b) => {
            debug!("[PRUNE] joint {role:?} node: {op:?}({a:?}, {b:?})");
            Pruned::JointFilter(Box::new(a), Box::new(b))
        }
    }
}

fn classify(role: Role, lhs: &TypedExpr, op: Op, rhs: &TypedExpr, queryables: &Queryables, encoding: Option<&str>) -> Result<Pruned> {
    let name = match lhs {
        TypedExpr::Term { name, side: Side::Left } => name,
        other => return Err(Error::UnsupportedConstruct { what: format!("left-hand side is not a term: {other:?}") }),
    };
    let values = match rhs {
        TypedExpr::Constant { values } => values,
        other => return Err(Error::UnsupportedConstruct { what: format!("right-hand side is not a constant: {other:?}") }),
    };

    let descriptor = queryables.get(name).ok_or_else(|| Error::InvalidQueryTerm { field: name.clone() })?;

    debug!("[CLASSIFY] {name} {} <{} value(s)> role={role:?}", op.symbol(), values.len());

    match descriptor {
        None => {
            // Valid but un-indexed: only equality/inequality is ever
            // filterable, and it is never pushable as a condition.
            if !matches!(op, Op::Eq | Op::Ne) {
                return Err(Error::NonIndexablePredicate { field: name.clone(), op: op.symbol().into() });
            }
            match role {
                Role::Condition => Ok(Pruned::Null),
                Role::Filter => {
                    let wire_values = values.iter().map(Wire::from_literal_raw).collect();
                    Ok(Pruned::Filter(name.clone(), predicate_for(op, wire_values)))
                }
            }
        }
        Some(qd) => match op {
            Op::Eq | Op::Ne => {
                if values.len() > MAX_SELECTORS {
                    match role {
                        Role::Condition => Ok(Pruned::Null),
                        Role::Filter => {
                            let wire_values = values.iter().map(Wire::from_literal_raw).collect();
                            Ok(Pruned::Filter(name.clone(), predicate_for(op, wire_values)))
                        }
                    }
                } else {
                    match role {
                        Role::Filter => Ok(Pruned::Null),
                        Role::Condition => {
                            let converted = coerce_all(values, qd, name)?;
                            Ok(Pruned::Condition(format_equality(name, op, &converted, encoding)))
                        }
                    }
                }
            }
            _ => match role {
                Role::Filter => Ok(Pruned::Null),
                Role::Condition => {
                    let first = values.first().ok_or_else(|| Error::InvalidCondition { expr: name.clone() })?;
                    let tv = convert_value(first, qd).map_err(|e| with_field(e, name))?;
                    Ok(Pruned::Condition(format!("({name} {} {})", op.symbol(), tv.converted.tostring(encoding))))
                }
            },
        },
    }
}

fn with_field(err: Error, field: &str) -> Error {
    match err {
        Error::ValueCoercion { reason, .. } => Error::ValueCoercion { field: field.to_string(), reason },
        other => other,
    }
}

fn coerce_all(values: &[Literal], qd: &crate::scope::Queryable, field: &str) -> Result<Vec<TermValue>> {
    values.iter().map(|v| convert_value(v, qd).map_err(|e| with_field(e, field))).collect()
}

fn predicate_for(op: Op, values: Vec<Wire>) -> Predicate {
    if op == Op::Ne {
        Predicate::not_in_set(values)
    } else {
        Predicate::in_set(values)
    }
}

fn format_equality(name: &str, op: Op, values: &[TermValue], encoding: Option<&str>) -> String {
    if values.len() == 1 {
        format!("({name} {} {})", op.symbol(), values[0].converted.tostring(encoding))
    } else {
        let parts: Vec<String> = values.iter().map(|v| format!("{name} {} {}", op.symbol(), v.converted.tostring(encoding))).collect();
        format!("({})", parts.join(" | "))
    }
}

/// Flattens a pruned Filter role's tree into the final triple list. A
/// surviving `JointFilter` at any depth is unrepresentable.
pub fn finalize_filters(pruned: Pruned) -> Result<Vec<(String, Predicate)>> {
    match pruned {
        Pruned::Null => Ok(Vec::new()),
        Pruned::Filter(col, pred) => Ok(vec![(col, pred)]),
        Pruned::Condition(c) => Err(Error::InvalidFilter { expr: c }),
        Pruned::JointFilter(..) => Err(Error::JointFilterCollapse),
    }
}

pub fn finalize_condition(pruned: Pruned) -> Result<Option<String>> {
    match pruned {
        Pruned::Null => Ok(None),
        Pruned::Condition(c) => Ok(Some(c)),
        Pruned::Filter(col, _) => Err(Error::InvalidCondition { expr: col }),
        Pruned::JointFilter(..) => Err(Error::InvalidCondition { expr: "joint filter".into() }),
    }
}
