//! Lexical name scope plus the queryables side-table.
//!
//! A [`Scope`] is a chain of local-variable mappings walked front-to-back
//! (innermost first) for resolving free variables on the right-hand side of
//! a comparison, and a flat `queryables` side-table describing which
//! left-hand-side names name indexable columns (and how to coerce values
//! for them). The two are kept separate rather than merged into one chained
//! map: queryables describe *columns*, locals describe *host variables*,
//! and a name can appear in only one without ambiguity.

use std::collections::HashMap;

use crate::value::Kind;

/// A modifier on a queryable's [`Kind`] that changes how literal values are
/// coerced against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meta {
    /// Values are looked up by name in an ordered category table and
    /// coerced to the integer position of the match.
    Category,
}

/// Describes one indexable (or at least known) column.
#[derive(Debug, Clone, PartialEq)]
pub struct Queryable {
    pub kind: Kind,
    pub meta: Option<Meta>,
    /// Ordered category labels, present when `meta == Some(Meta::Category)`.
    pub metadata: Option<Vec<String>>,
}

impl Queryable {
    pub fn new(kind: Kind) -> Self {
        Queryable { kind, meta: None, metadata: None }
    }

    pub fn category(metadata: Vec<String>) -> Self {
        Queryable { kind: Kind::String, meta: Some(Meta::Category), metadata: Some(metadata) }
    }
}

/// A value a host variable can resolve to. `Sequence` supports the single
/// level of static subscripting the grammar allows (`name[3]`).
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Sequence(Vec<ScopeValue>),
}

/// Queryable descriptors keyed by column name. A present key with a `None`
/// value means "this name is a known, valid field, but it is not indexed" -
/// distinct from an absent key, which means the name is undefined.
pub type Queryables = HashMap<String, Option<Queryable>>;

#[derive(Debug, Clone, Default)]
pub struct Scope {
    locals: Vec<HashMap<String, ScopeValue>>,
    queryables: Queryables,
}

impl Scope {
    pub fn new(queryables: Queryables) -> Self {
        Scope { locals: Vec::new(), queryables }
    }

    pub fn with_locals(queryables: Queryables, locals: HashMap<String, ScopeValue>) -> Self {
        Scope { locals: vec![locals], queryables }
    }

    /// Pushes a new innermost scope level in front of the chain.
    pub fn push_locals(&mut self, locals: HashMap<String, ScopeValue>) {
        self.locals.insert(0, locals);
    }

    /// Walks the local chain front-to-back and returns the first match.
    pub fn resolve(&self, name: &str) -> Option<&ScopeValue> {
        self.locals.iter().find_map(|level| level.get(name))
    }

    pub fn is_queryable(&self, name: &str) -> bool {
        self.queryables.contains_key(name)
    }

    pub fn queryable(&self, name: &str) -> Option<&Queryable> {
        self.queryables.get(name).and_then(|o| o.as_ref())
    }

    pub fn queryables(&self) -> &Queryables {
        &self.queryables
    }
}
