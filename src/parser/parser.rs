//! pest-based parser lowering source text into the arena syntax tree.

use bumpalo::Bump;
use lazy_static::lazy_static;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser as _;
use pest_derive::Parser;

use super::error::ParseError;
use super::parsed_expr::{BinaryOp, Expr, Literal, UnaryOp};

lazy_static! {
    // Note: precedence is defined lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        // Logical operators.
        .op(Op::infix(Rule::or_op, Assoc::Left))            // `or`
        .op(Op::infix(Rule::and_op, Assoc::Left))           // `and`
        .op(Op::prefix(Rule::not_op))                       // `not`

        // Comparisons and membership.
        .op(
            Op::infix(Rule::eq, Assoc::Left) |
            Op::infix(Rule::ne, Assoc::Left) |
            Op::infix(Rule::le, Assoc::Left) |
            Op::infix(Rule::ge, Assoc::Left) |
            Op::infix(Rule::lt, Assoc::Left) |
            Op::infix(Rule::gt, Assoc::Left) |
            Op::infix(Rule::in_op, Assoc::Left)
        )                                                   // `==`, `!=`, `<=`, `>=`, `<`, `>`, `in`

        // Arithmetic operators.
        .op(
            Op::infix(Rule::add, Assoc::Left) |
            Op::infix(Rule::sub, Assoc::Left)
        )                                                   // `+`, `-`
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left) |
            Op::infix(Rule::rem, Assoc::Left)
        )                                                   // `*`, `/`, `%`
        .op(Op::prefix(Rule::neg))                          // `-`

        // Postfix operators.
        .op(Op::postfix(Rule::call_op))                     // `()`
        ;
}

#[derive(Parser)]
#[grammar = "parser/expression.pest"]
pub struct ExpressionParser;

/// Parse one expression into the arena.
pub fn parse<'a>(arena: &'a Bump, source: &str) -> Result<&'a Expr<'a>, ParseError> {
    let mut pairs =
        ExpressionParser::parse(Rule::main, source).map_err(|e| ParseError::Syntax {
            message: e.to_string(),
        })?;
    let main = pairs.next().expect("main rule matched");
    let expression = main
        .into_inner()
        .next()
        .expect("main wraps one expression");
    parse_expr(arena, expression)
}

fn parse_expr<'a>(arena: &'a Bump, pair: Pair<'_, Rule>) -> Result<&'a Expr<'a>, ParseError> {
    match pair.as_rule() {
        Rule::expression => climb(arena, pair.into_inner()),

        Rule::integer => {
            let text = pair.as_str();
            let value: i64 = text.parse().map_err(|_| ParseError::IntLiteral {
                literal: text.to_owned(),
            })?;
            Ok(arena.alloc(Expr::Literal(Literal::Int(value))))
        }

        Rule::boolean => {
            let value = pair.as_str() == "true";
            Ok(arena.alloc(Expr::Literal(Literal::Bool(value))))
        }

        Rule::string => {
            let inner = pair.into_inner().next().expect("string wraps its body");
            let text = unescape(inner.as_str())?;
            Ok(arena.alloc(Expr::Literal(Literal::Str(arena.alloc_str(&text)))))
        }

        Rule::ident => Ok(arena.alloc(Expr::Ident(arena.alloc_str(pair.as_str())))),

        Rule::list => {
            let mut elements = Vec::new();
            for elem in pair.into_inner() {
                elements.push(parse_expr(arena, elem)?);
            }
            let elements = arena.alloc_slice_copy(&elements);
            Ok(arena.alloc(Expr::List(elements)))
        }

        rule => unreachable!("primary rule {:?} has no lowering", rule),
    }
}

fn climb<'a>(arena: &'a Bump, pairs: Pairs<'_, Rule>) -> Result<&'a Expr<'a>, ParseError> {
    PRATT_PARSER
        .map_primary(|primary| parse_expr(arena, primary))
        .map_prefix(|op, rhs| {
            let operand = rhs?;
            let op = match op.as_rule() {
                Rule::neg => UnaryOp::Neg,
                Rule::not_op => UnaryOp::Not,
                rule => unreachable!("prefix rule {:?}", rule),
            };
            Ok(&*arena.alloc(Expr::Unary { op, operand }))
        })
        .map_postfix(|lhs, op| {
            let lhs = lhs?;
            match op.as_rule() {
                Rule::call_op => {
                    let Expr::Ident(name) = lhs else {
                        return Err(ParseError::CallTarget);
                    };
                    let mut args = Vec::new();
                    for arg in op.into_inner() {
                        args.push(parse_expr(arena, arg)?);
                    }
                    let args = arena.alloc_slice_copy(&args);
                    Ok(&*arena.alloc(Expr::Call { name, args }))
                }
                rule => unreachable!("postfix rule {:?}", rule),
            }
        })
        .map_infix(|lhs, op, rhs| {
            let left = lhs?;
            let right = rhs?;
            let op = match op.as_rule() {
                Rule::or_op => BinaryOp::Or,
                Rule::and_op => BinaryOp::And,
                Rule::in_op => BinaryOp::In,
                Rule::eq => BinaryOp::Eq,
                Rule::ne => BinaryOp::Ne,
                Rule::le => BinaryOp::Le,
                Rule::ge => BinaryOp::Ge,
                Rule::lt => BinaryOp::Lt,
                Rule::gt => BinaryOp::Gt,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                Rule::rem => BinaryOp::Rem,
                rule => unreachable!("infix rule {:?}", rule),
            };
            Ok(&*arena.alloc(Expr::Binary { op, left, right }))
        })
        .parse(pairs)
}

fn unescape(raw: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => {
                return Err(ParseError::BadEscape {
                    sequence: other.to_string(),
                })
            }
            None => {
                return Err(ParseError::BadEscape {
                    sequence: String::new(),
                })
            }
        }
    }
    Ok(out)
}
