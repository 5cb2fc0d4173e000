//! Typed AST produced by [`crate::visitor`] lowering.
//!
//! A tagged enum replaces the source framework's class hierarchy of Term
//! subtypes: there is exactly one shape for "a name on one side of a
//! comparison" and one for "a conformed list of literal values," and the
//! role-directed behavior lives in [`crate::pruner`] as plain pattern
//! matching instead of virtual dispatch.

use crate::value::Literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl Op {
    pub fn is_bool(self) -> bool {
        matches!(self, Op::And | Op::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::And => "&",
            Op::Or => "|",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedExpr {
    /// A name on one side of a comparison. Only `Side::Left` is ever
    /// emitted by the visitor - an unresolved right-hand name is folded
    /// into a literal string `Constant` instead (see design note in
    /// `visitor::lower_value`).
    Term { name: String, side: Side },
    /// A conformed set of literal values: always non-empty, always a
    /// single element unless the source was a list literal or an `in`
    /// rewrite.
    Constant { values: Vec<Literal> },
    BinOp { op: Op, lhs: Box<TypedExpr>, rhs: Box<TypedExpr> },
    /// The `~` operator. Always wraps a boolean sub-expression.
    Unary { operand: Box<TypedExpr> },
}
