//! Structured error kinds for the query-expression compiler.
//!
//! Every stage of the pipeline (lexing, parsing, lowering, value coercion,
//! classification, pruning) reports failures through this single enum so a
//! host can match on the kind rather than scrape a message string.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("syntax error at position {pos}: {message}")]
    Syntax { message: String, pos: usize },

    #[error("name {name:?} is not defined")]
    UndefinedName { name: String },

    #[error("query term on field {field:?} is not valid")]
    InvalidQueryTerm { field: String },

    #[error("passing a filterable condition to a non-indexed field {field:?} with operator {op}")]
    NonIndexablePredicate { field: String, op: String },

    #[error("cannot process expression: not a valid condition ({expr})")]
    InvalidCondition { expr: String },

    #[error("cannot process expression: not a valid filter ({expr})")]
    InvalidFilter { expr: String },

    #[error("unsupported unary operation: {reason}")]
    UnsupportedUnary { reason: String },

    #[error("unable to collapse joint filters into a single residual predicate")]
    JointFilterCollapse,

    #[error("unsupported construct: {what}")]
    UnsupportedConstruct { what: String },

    #[error("cannot coerce value for field {field:?}: {reason}")]
    ValueCoercion { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
