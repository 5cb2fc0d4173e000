//! Recursive-descent parser over the token stream from [`crate::lexer`].
//!
//! Precedence, loosest to tightest: `|`, `&`, comparisons (and `in`),
//! unary `~`, atoms (with trailing `.attr` / `[index]`, and leading unary
//! `-`/`+` on literals).

use tracing::debug;

use crate::ast::{BoolOp, CmpOp, RawLiteral, RawNode};
use crate::error::{Error, Result};
use crate::lexer::{lex, TKind, Token};

struct Cursor {
    toks: Vec<Token>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> &TKind {
        &self.toks[self.pos].kind
    }

    fn peek_pos(&self) -> usize {
        self.toks[self.pos].pos
    }

    fn advance(&mut self) -> TKind {
        let k = self.toks[self.pos].kind.clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        k
    }

    fn expect(&mut self, kind: &TKind) -> Result<()> {
        if self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(Error::Syntax { message: format!("expected {kind:?}, found {:?}", self.peek()), pos: self.peek_pos() })
        }
    }
}

pub fn parse(src: &str) -> Result<RawNode> {
    debug!("[PARSE] {src:?}");
    let toks = lex(src)?;
    let mut cur = Cursor { toks, pos: 0 };
    let node = parse_or(&mut cur)?;
    if cur.peek() != &TKind::End {
        return Err(Error::Syntax { message: format!("unexpected trailing token {:?}", cur.peek()), pos: cur.peek_pos() });
    }
    debug!("[PARSE] built raw AST: {node:?}");
    Ok(node)
}

fn parse_or(cur: &mut Cursor) -> Result<RawNode> {
    let mut node = parse_and(cur)?;
    while cur.peek() == &TKind::Pipe {
        cur.advance();
        let rhs = parse_and(cur)?;
        node = RawNode::BoolOp { op: BoolOp::Or, left: Box::new(node), right: Box::new(rhs) };
    }
    Ok(node)
}

fn parse_and(cur: &mut Cursor) -> Result<RawNode> {
    let mut node = parse_unary_bool(cur)?;
    while cur.peek() == &TKind::Amp {
        cur.advance();
        let rhs = parse_unary_bool(cur)?;
        node = RawNode::BoolOp { op: BoolOp::And, left: Box::new(node), right: Box::new(rhs) };
    }
    Ok(node)
}

fn parse_unary_bool(cur: &mut Cursor) -> Result<RawNode> {
    if cur.peek() == &TKind::Tilde {
        cur.advance();
        let inner = parse_unary_bool(cur)?;
        return Ok(RawNode::Invert(Box::new(inner)));
    }
    parse_comparison(cur)
}

fn parse_comparison(cur: &mut Cursor) -> Result<RawNode> {
    if cur.peek() == &TKind::LParen {
        // Could be a parenthesized boolean sub-expression.
        let save = cur.pos;
        cur.advance();
        if let Ok(inner) = parse_or(cur) {
            if cur.peek() == &TKind::RParen {
                cur.advance();
                return Ok(inner);
            }
        }
        cur.pos = save;
    }

    let left = parse_operand(cur)?;

    if let TKind::Ident(name) = cur.peek() {
        if name == "in" {
            cur.advance();
            let values = parse_operand(cur)?;
            return Ok(RawNode::In { left: Box::new(left), values: Box::new(values) });
        }
    }

    let op = match cur.peek() {
        TKind::Eq2 | TKind::Eq1 => CmpOp::Eq,
        TKind::Ne => CmpOp::Ne,
        TKind::Lt => CmpOp::Lt,
        TKind::Le => CmpOp::Le,
        TKind::Gt => CmpOp::Gt,
        TKind::Ge => CmpOp::Ge,
        _ => {
            return Err(Error::Syntax { message: "expected a comparison operator".into(), pos: cur.peek_pos() });
        }
    };
    cur.advance();
    let right = parse_operand(cur)?;
    Ok(RawNode::Compare { op, left: Box::new(left), right: Box::new(right) })
}

fn parse_operand(cur: &mut Cursor) -> Result<RawNode> {
    match cur.peek() {
        TKind::Minus => {
            cur.advance();
            let inner = parse_operand(cur)?;
            Ok(RawNode::UnaryMinus(Box::new(inner)))
        }
        TKind::Plus => {
            cur.advance();
            let inner = parse_operand(cur)?;
            Ok(RawNode::UnaryPlus(Box::new(inner)))
        }
        _ => parse_postfix(cur),
    }
}

fn parse_postfix(cur: &mut Cursor) -> Result<RawNode> {
    let mut node = parse_primary(cur)?;
    loop {
        match cur.peek() {
            TKind::Dot => {
                cur.advance();
                let attr = match cur.advance() {
                    TKind::Ident(name) => name,
                    other => return Err(Error::Syntax { message: format!("expected attribute name, found {other:?}"), pos: cur.peek_pos() }),
                };
                node = RawNode::Attribute { base: Box::new(node), attr };
            }
            TKind::LBracket => {
                cur.advance();
                let index = parse_operand(cur)?;
                cur.expect(&TKind::RBracket)?;
                node = RawNode::Subscript { base: Box::new(node), index: Box::new(index) };
            }
            _ => break,
        }
    }
    Ok(node)
}

fn parse_primary(cur: &mut Cursor) -> Result<RawNode> {
    match cur.advance() {
        TKind::Ident(name) => Ok(RawNode::Name(name)),
        TKind::Int(v) => Ok(RawNode::Literal(RawLiteral::Int(v))),
        TKind::Float(v) => Ok(RawNode::Literal(RawLiteral::Float(v))),
        TKind::Str(v) => Ok(RawNode::Literal(RawLiteral::Str(v))),
        TKind::LParen => {
            let inner = parse_operand(cur)?;
            cur.expect(&TKind::RParen)?;
            Ok(inner)
        }
        TKind::LBracket => {
            let mut items = Vec::new();
            if cur.peek() != &TKind::RBracket {
                loop {
                    items.push(parse_operand(cur)?);
                    if cur.peek() == &TKind::Comma {
                        cur.advance();
                        continue;
                    }
                    break;
                }
            }
            cur.expect(&TKind::RBracket)?;
            Ok(RawNode::List(items))
        }
        other => Err(Error::Syntax { message: format!("unexpected token {other:?}"), pos: cur.peek_pos() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_comparison() {
        let node = parse("index >= \"2013-01-01\"").unwrap();
        assert!(matches!(node, RawNode::Compare { op: CmpOp::Ge, .. }));
    }

    #[test]
    fn parses_conjunction_and_disjunction_precedence() {
        // `|` must bind looser than `&`.
        let node = parse("a == 1 & b == 2 | c == 3").unwrap();
        match node {
            RawNode::BoolOp { op: BoolOp::Or, left, .. } => {
                assert!(matches!(*left, RawNode::BoolOp { op: BoolOp::And, .. }));
            }
            other => panic!("expected top-level Or, got {other:?}"),
        }
    }

    #[test]
    fn parses_in_as_membership_node() {
        let node = parse("A in [1,2,3]").unwrap();
        assert!(matches!(node, RawNode::In { .. }));
    }

    #[test]
    fn parses_unary_invert_over_parenthesized_group() {
        let node = parse("~(columns == ['A','B'])").unwrap();
        assert!(matches!(node, RawNode::Invert(_)));
    }

    #[test]
    fn parses_attribute_and_subscript_chain() {
        let node = parse("x == df.index[3]").unwrap();
        match node {
            RawNode::Compare { right, .. } => {
                assert!(matches!(*right, RawNode::Subscript { .. }));
            }
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_operator() {
        assert!(parse("index 3").is_err());
    }
}
