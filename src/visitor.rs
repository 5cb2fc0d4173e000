//! Lowers the raw AST from [`crate::parser`] into the typed AST consumed by
//! [`crate::pruner`], resolving free variables against a [`Scope`] along
//! the way.

use tracing::debug;

use crate::ast::{BoolOp, CmpOp, RawLiteral, RawNode};
use crate::error::{Error, Result};
use crate::scope::{Scope, ScopeValue};
use crate::typed_ast::{Op, Side, TypedExpr};
use crate::value::Literal;

fn cmp_to_op(op: CmpOp) -> Op {
    match op {
        CmpOp::Eq => Op::Eq,
        CmpOp::Ne => Op::Ne,
        CmpOp::Lt => Op::Lt,
        CmpOp::Le => Op::Le,
        CmpOp::Gt => Op::Gt,
        CmpOp::Ge => Op::Ge,
    }
}

fn raw_literal_to_value(lit: &RawLiteral) -> Literal {
    match lit {
        RawLiteral::Int(i) => Literal::Int(*i),
        RawLiteral::Float(f) => Literal::Float(*f),
        RawLiteral::Str(s) => Literal::Str(s.clone()),
    }
}

fn scope_value_to_literal(v: &ScopeValue) -> Option<Literal> {
    match v {
        ScopeValue::Int(i) => Some(Literal::Int(*i)),
        ScopeValue::Float(f) => Some(Literal::Float(*f)),
        ScopeValue::Bool(b) => Some(Literal::Str(b.to_string())),
        ScopeValue::Str(s) => Some(Literal::Str(s.clone())),
        ScopeValue::Sequence(_) => None,
    }
}

/// Lowers a full boolean expression tree.
pub fn lower_bool(raw: &RawNode, scope: &Scope) -> Result<TypedExpr> {
    match raw {
        RawNode::BoolOp { op, left, right } => {
            let op = match op {
                BoolOp::And => Op::And,
                BoolOp::Or => Op::Or,
            };
            Ok(TypedExpr::BinOp { op, lhs: Box::new(lower_bool(left, scope)?), rhs: Box::new(lower_bool(right, scope)?) })
        }
        RawNode::Invert(inner) => Ok(TypedExpr::Unary { operand: Box::new(lower_bool(inner, scope)?) }),
        RawNode::Compare { op, left, right } => {
            let lhs = lower_term(left, scope)?;
            let rhs = lower_value(right, scope)?;
            Ok(TypedExpr::BinOp { op: cmp_to_op(*op), lhs: Box::new(lhs), rhs: Box::new(rhs) })
        }
        RawNode::In { left, values } => {
            let lhs = lower_term(left, scope)?;
            let rhs = lower_value(values, scope)?;
            Ok(TypedExpr::BinOp { op: Op::Eq, lhs: Box::new(lhs), rhs: Box::new(rhs) })
        }
        _ => Err(Error::UnsupportedConstruct { what: "expression is not a boolean predicate".into() }),
    }
}

/// Lowers the left-hand side of a comparison. Must resolve to a queryable
/// name - anything else is a parse-time error (invariant: the left side
/// always names a queryable).
fn lower_term(raw: &RawNode, scope: &Scope) -> Result<TypedExpr> {
    match raw {
        RawNode::Name(name) => {
            if !scope.is_queryable(name) {
                debug!("[RESOLVE] {name:?} is not a queryable field");
                return Err(Error::UndefinedName { name: name.clone() });
            }
            debug!("[RESOLVE] {name:?} resolved as left-hand queryable term");
            Ok(TypedExpr::Term { name: name.clone(), side: Side::Left })
        }
        // `x.x` is the degenerate attribute case: base and attribute share
        // the same name, so it resolves to the base name itself.
        RawNode::Attribute { base, attr } => match base.as_ref() {
            RawNode::Name(name) if name == attr => lower_term(base, scope),
            _ => Err(Error::UnsupportedConstruct { what: "attribute access on the left-hand side".into() }),
        },
        _ => Err(Error::UnsupportedConstruct { what: "left-hand side must be a field name".into() }),
    }
}

/// Lowers the right-hand side of a comparison into a conformed `Constant`.
fn lower_value(raw: &RawNode, scope: &Scope) -> Result<TypedExpr> {
    Ok(TypedExpr::Constant { values: lower_value_list(raw, scope)? })
}

fn lower_value_list(raw: &RawNode, scope: &Scope) -> Result<Vec<Literal>> {
    match raw {
        RawNode::Literal(lit) => Ok(vec![raw_literal_to_value(lit)]),
        RawNode::UnaryMinus(inner) => {
            let mut values = lower_value_list(inner, scope)?;
            for v in values.iter_mut() {
                *v = match v {
                    Literal::Int(i) => Literal::Int(-*i),
                    Literal::Float(f) => Literal::Float(-*f),
                    Literal::Str(s) => return Err(Error::UnsupportedConstruct { what: format!("cannot negate string literal {s:?}") }),
                };
            }
            Ok(values)
        }
        RawNode::UnaryPlus(_) => Err(Error::UnsupportedUnary { reason: "unary '+' is not a supported operator".into() }),
        RawNode::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.extend(lower_value_list(item, scope)?);
            }
            Ok(out)
        }
        RawNode::Name(name) => match scope.resolve(name) {
            Some(ScopeValue::Sequence(seq)) => {
                debug!("[RESOLVE] {name:?} resolved to a host sequence of {} value(s)", seq.len());
                seq.iter()
                    .map(|v| scope_value_to_literal(v).ok_or_else(|| Error::UnsupportedConstruct { what: "nested sequence value".into() }))
                    .collect()
            }
            Some(scalar) => {
                debug!("[RESOLVE] {name:?} resolved to a host scalar");
                scope_value_to_literal(scalar)
                    .map(|v| vec![v])
                    .ok_or_else(|| Error::UnsupportedConstruct { what: "unresolvable scope value".into() })
            }
            // Lenient fallback: an unresolved bare name is treated as its
            // own literal string, matching the original's Term machinery
            // which always yields *some* value even for names unknown to
            // the host scope.
            None => {
                debug!("[RESOLVE] {name:?} did not resolve; falling back to literal string");
                Ok(vec![Literal::Str(name.clone())])
            }
        },
        RawNode::Attribute { base, attr } => {
            if let RawNode::Name(name) = base.as_ref() {
                if name == attr {
                    return lower_value_list(base, scope);
                }
                let compound = format!("{name}.{attr}");
                if let Some(v) = scope.resolve(&compound) {
                    return match v {
                        ScopeValue::Sequence(seq) => seq
                            .iter()
                            .map(|v| scope_value_to_literal(v).ok_or_else(|| Error::UnsupportedConstruct { what: "nested sequence value".into() }))
                            .collect(),
                        other => scope_value_to_literal(other)
                            .map(|v| vec![v])
                            .ok_or_else(|| Error::UnsupportedConstruct { what: "unresolvable scope value".into() }),
                    };
                }
            }
            Err(Error::UnsupportedConstruct { what: "attribute access did not resolve to a known value".into() })
        }
        RawNode::Subscript { base, index } => {
            let name = match base.as_ref() {
                RawNode::Name(n) => n,
                _ => return Err(Error::UnsupportedConstruct { what: "subscript base must be a name".into() }),
            };
            let idx = match index.as_ref() {
                RawNode::Literal(RawLiteral::Int(i)) => *i,
                _ => return Err(Error::UnsupportedConstruct { what: "subscript index must be a static integer literal".into() }),
            };
            match scope.resolve(name) {
                Some(ScopeValue::Sequence(seq)) => {
                    let pos = if idx >= 0 { idx as usize } else { (seq.len() as i64 + idx) as usize };
                    seq.get(pos)
                        .and_then(scope_value_to_literal)
                        .map(|v| vec![v])
                        .ok_or_else(|| Error::UnsupportedConstruct { what: format!("subscript index {idx} out of range") })
                }
                _ => Err(Error::UnsupportedConstruct { what: format!("{name} is not a subscriptable host value") }),
            }
        }
        _ => Err(Error::UnsupportedConstruct { what: "unsupported right-hand side expression".into() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::scope::{Queryable, Queryables};
    use crate::value::Kind;
    use std::collections::HashMap;

    fn scope_with(names: &[(&str, Kind)]) -> Scope {
        let mut q = Queryables::new();
        for (name, kind) in names {
            q.insert((*name).to_string(), Some(Queryable::new(*kind)));
        }
        Scope::new(q)
    }

    #[test]
    fn undefined_lhs_name_is_an_error() {
        let scope = scope_with(&[]);
        let raw = parse("ghost == 1").unwrap();
        assert!(matches!(lower_bool(&raw, &scope), Err(Error::UndefinedName { .. })));
    }

    #[test]
    fn unresolved_rhs_name_falls_back_to_literal_string() {
        let scope = scope_with(&[("string", Kind::String)]);
        let raw = parse("string == bar").unwrap();
        let typed = lower_bool(&raw, &scope).unwrap();
        match typed {
            TypedExpr::BinOp { rhs, .. } => match *rhs {
                TypedExpr::Constant { values } => assert_eq!(values, vec![Literal::Str("bar".into())]),
                other => panic!("expected Constant, got {other:?}"),
            },
            other => panic!("expected BinOp, got {other:?}"),
        }
    }

    #[test]
    fn resolved_rhs_name_uses_scope_value() {
        let mut q = Queryables::new();
        q.insert("index".into(), Some(Queryable::new(Kind::Datetime64)));
        let mut locals = HashMap::new();
        locals.insert("t1".to_string(), ScopeValue::Int(5));
        let scope = Scope::with_locals(q, locals);
        let raw = parse("index >= t1").unwrap();
        let typed = lower_bool(&raw, &scope).unwrap();
        match typed {
            TypedExpr::BinOp { rhs, .. } => match *rhs {
                TypedExpr::Constant { values } => assert_eq!(values, vec![Literal::Int(5)]),
                other => panic!("expected Constant, got {other:?}"),
            },
            other => panic!("expected BinOp, got {other:?}"),
        }
    }

    #[test]
    fn in_rewrite_conforms_into_a_single_constant() {
        let scope = scope_with(&[("A", Kind::Integer)]);
        let raw = parse("A in [1,2,3]").unwrap();
        let typed = lower_bool(&raw, &scope).unwrap();
        match typed {
            TypedExpr::BinOp { op: Op::Eq, rhs, .. } => match *rhs {
                TypedExpr::Constant { values } => assert_eq!(values.len(), 3),
                other => panic!("expected Constant, got {other:?}"),
            },
            other => panic!("expected Eq BinOp, got {other:?}"),
        }
    }

    #[test]
    fn unary_minus_folds_into_negative_constant() {
        let scope = scope_with(&[("A", Kind::Integer)]);
        let raw = parse("A == -5").unwrap();
        let typed = lower_bool(&raw, &scope).unwrap();
        match typed {
            TypedExpr::BinOp { rhs, .. } => match *rhs {
                TypedExpr::Constant { values } => assert_eq!(values, vec![Literal::Int(-5)]),
                other => panic!("expected Constant, got {other:?}"),
            },
            other => panic!("expected BinOp, got {other:?}"),
        }
    }

    #[test]
    fn unary_plus_is_rejected() {
        let scope = scope_with(&[("A", Kind::Integer)]);
        let raw = parse("A == +5").unwrap();
        assert!(matches!(lower_bool(&raw, &scope), Err(Error::UnsupportedUnary { .. })));
    }
}
