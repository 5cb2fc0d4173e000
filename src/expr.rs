//! The compiler's public driver: normalizes legacy call shapes into query
//! text, then runs the lex/parse/lower/prune pipeline to produce a pushdown
//! condition string and a residual filter plan.

use tracing::warn;

use crate::error::Result;
use crate::parser::parse;
use crate::predicate::Predicate;
use crate::pruner::{finalize_condition, finalize_filters, prune, Role};
use crate::scope::Scope;
use crate::visitor::lower_bool;

/// Every call shape the host may hand the compiler. Only `Text` reflects
/// the grammar directly; the others are legacy shapes normalized into text
/// up front, each logging a deprecation warning the way the host is meant
/// to surface to its own callers.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    Text(String),
    Seq(Vec<Where>),
    /// `(field, op, value)`
    Triple(String, String, String),
    /// `(field, value)`, operator implied to be `==`
    Pair(String, String),
}

const OPERATOR_TOKENS: &[&str] = &["==", "!=", "<=", ">=", "<", ">", "&", "|", "~", "="];

/// Heuristic used by hosts deciding whether a bare string names a single
/// column (pass through untouched) or should be compiled as an expression.
pub fn maybe_expression(s: &str) -> bool {
    OPERATOR_TOKENS.iter().any(|op| s.contains(op)) || s.contains(" in ")
}

fn normalize_op(op: &str) -> &str {
    if op == "=" {
        "=="
    } else {
        op
    }
}

fn normalize(where_: &Where) -> String {
    match where_ {
        Where::Text(s) => s.clone(),
        Where::Seq(items) => {
            let parts: Vec<String> = items.iter().map(|w| format!("({})", normalize(w))).collect();
            parts.join(" & ")
        }
        Where::Triple(field, op, value) => {
            warn!("[NORMALIZE] legacy (field, op, value) call shape is deprecated: ({field:?}, {op:?}, {value:?})");
            format!("{field} {} {value}", normalize_op(op))
        }
        Where::Pair(field, value) => {
            warn!("[NORMALIZE] legacy (field, value) call shape is deprecated: ({field:?}, {value:?})");
            format!("{field} == {value}")
        }
    }
}

pub struct Expr {
    pub text: String,
    pub scope: Scope,
    pub encoding: Option<String>,
}

impl Expr {
    pub fn new(where_: Where, scope: Scope, encoding: Option<String>) -> Self {
        Expr { text: normalize(&where_), scope, encoding }
    }

    pub fn from_text(text: impl Into<String>, scope: Scope, encoding: Option<String>) -> Self {
        Expr { text: text.into(), scope, encoding }
    }

    /// Runs the full pipeline and returns the pushdown condition string (if
    /// any term is indexable) and the residual filter plan (if any term is
    /// not).
    pub fn evaluate(&self) -> Result<(Option<String>, Vec<(String, Predicate)>)> {
        let raw = parse(&self.text)?;
        let typed = lower_bool(&raw, &self.scope)?;
        let queryables = self.scope.queryables();
        let encoding = self.encoding.as_deref();

        let condition_tree = prune(&typed, Role::Condition, queryables, encoding)?;
        let condition = finalize_condition(condition_tree)?;

        let filter_tree = prune(&typed, Role::Filter, queryables, encoding)?;
        let filters = finalize_filters(filter_tree)?;

        Ok((condition, filters))
    }
}
