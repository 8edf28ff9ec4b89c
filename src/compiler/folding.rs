//! Constant folding over the parsed tree.
//!
//! Pure builtin forms with literal operands are reduced before layout:
//! arithmetic, comparisons, the boolean connectives, membership over literal
//! lists, and `if` with a literal predicate. `false and x` / `true or x`
//! reduce without looking at `x`. Anything that could fail at runtime
//! (division or remainder by zero) is left in place so the failure surfaces
//! during evaluation, and calls to registered operators are never folded
//! (they may be impure).

use bumpalo::Bump;

use crate::parser::{BinaryOp, Expr, Literal, UnaryOp};

pub(crate) fn fold<'a>(arena: &'a Bump, expr: &'a Expr<'a>) -> &'a Expr<'a> {
    match expr {
        Expr::Literal(_) | Expr::Ident(_) => expr,

        Expr::Unary { op, operand } => {
            let operand = fold(arena, operand);
            match (op, operand) {
                (UnaryOp::Neg, Expr::Literal(Literal::Int(n))) => {
                    arena.alloc(Expr::Literal(Literal::Int(n.wrapping_neg())))
                }
                (UnaryOp::Not, Expr::Literal(Literal::Bool(b))) => {
                    arena.alloc(Expr::Literal(Literal::Bool(!b)))
                }
                _ => arena.alloc(Expr::Unary { op: *op, operand }),
            }
        }

        Expr::Binary { op, left, right } => {
            let left = fold(arena, left);
            let right = fold(arena, right);
            fold_binary(arena, *op, left, right)
        }

        Expr::Call { name, args } => {
            let folded: Vec<&Expr<'_>> = args.iter().map(|a| fold(arena, a)).collect();
            if *name == "if" && folded.len() == 3 {
                if let Expr::Literal(Literal::Bool(pred)) = folded[0] {
                    return if *pred { folded[1] } else { folded[2] };
                }
            }
            arena.alloc(Expr::Call {
                name,
                args: arena.alloc_slice_copy(&folded),
            })
        }

        Expr::List(elements) => {
            let folded: Vec<&Expr<'_>> = elements.iter().map(|e| fold(arena, e)).collect();
            arena.alloc(Expr::List(arena.alloc_slice_copy(&folded)))
        }
    }
}

fn fold_binary<'a>(
    arena: &'a Bump,
    op: BinaryOp,
    left: &'a Expr<'a>,
    right: &'a Expr<'a>,
) -> &'a Expr<'a> {
    use BinaryOp::*;
    use Literal::*;

    // Connectives reduce on the left operand alone.
    if let Expr::Literal(Bool(l)) = left {
        match (op, l) {
            (And, false) => return left,
            (And, true) => return right,
            (Or, true) => return left,
            (Or, false) => return right,
            _ => {}
        }
    }

    let (Expr::Literal(l), Expr::Literal(r)) = (left, right) else {
        return arena.alloc(Expr::Binary { op, left, right });
    };

    let folded = match (op, l, r) {
        (Add, Int(a), Int(b)) => Some(Int(a.wrapping_add(*b))),
        (Sub, Int(a), Int(b)) => Some(Int(a.wrapping_sub(*b))),
        (Mul, Int(a), Int(b)) => Some(Int(a.wrapping_mul(*b))),
        (Div, Int(a), Int(b)) if *b != 0 => Some(Int(a.wrapping_div(*b))),
        (Rem, Int(a), Int(b)) if *b != 0 => Some(Int(a.wrapping_rem(*b))),
        (Lt, Int(a), Int(b)) => Some(Bool(a < b)),
        (Le, Int(a), Int(b)) => Some(Bool(a <= b)),
        (Gt, Int(a), Int(b)) => Some(Bool(a > b)),
        (Ge, Int(a), Int(b)) => Some(Bool(a >= b)),
        (Lt, Str(a), Str(b)) => Some(Bool(a < b)),
        (Le, Str(a), Str(b)) => Some(Bool(a <= b)),
        (Gt, Str(a), Str(b)) => Some(Bool(a > b)),
        (Ge, Str(a), Str(b)) => Some(Bool(a >= b)),
        (Eq, a, b) => Some(Bool(a == b)),
        (Ne, a, b) => Some(Bool(a != b)),
        _ => None,
    };

    match folded {
        Some(lit) => arena.alloc(Expr::Literal(lit)),
        None => arena.alloc(Expr::Binary { op, left, right }),
    }
}
