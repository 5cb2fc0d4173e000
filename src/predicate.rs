//! The residual filter predicate: a plain tagged struct rather than an
//! opaque closure, so a host can serialize it, invert it, and introspect
//! its value set without ever invoking it.

use serde::{Deserialize, Serialize};

use crate::value::Wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    InSet,
    NotInSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub kind: PredicateKind,
    pub values: Vec<Wire>,
}

impl Predicate {
    pub fn in_set(values: Vec<Wire>) -> Self {
        Predicate { kind: PredicateKind::InSet, values }
    }

    pub fn not_in_set(values: Vec<Wire>) -> Self {
        Predicate { kind: PredicateKind::NotInSet, values }
    }

    pub fn invert(&self) -> Predicate {
        let kind = match self.kind {
            PredicateKind::InSet => PredicateKind::NotInSet,
            PredicateKind::NotInSet => PredicateKind::InSet,
        };
        Predicate { kind, values: self.values.clone() }
    }

    /// Convenience evaluator for a single residual value; not required by
    /// the core contract but useful to hosts and tests alike.
    pub fn matches(&self, value: &Wire) -> bool {
        let present = self.values.contains(value);
        match self.kind {
            PredicateKind::InSet => present,
            PredicateKind::NotInSet => !present,
        }
    }
}
