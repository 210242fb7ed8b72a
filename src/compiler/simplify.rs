//! Expression normalization
//!
//! `simplify` rewrites a parameter expression into a canonical form so that
//! semantically equal indices such as `1+i` and `i+1` become structurally
//! identical. Arithmetic is checked: an operation that would overflow or
//! divide by zero is left unfolded.

use crate::ast::{BinOp, Expr};

/// Normalize `expr`
///
/// # Rewrites
/// - constant folding
/// - `x+0`, `x-0`, `x*1`, `x/1`, `x<<0`, `x>>0` become `x`; `x*0` becomes `0`
/// - `x-c` becomes `x+(-c)`
/// - a literal operand of `+` or `*` moves to the right
/// - nested literal offsets are combined: `(x+1)+2` becomes `x+3`
///
/// The result is a fixpoint: simplifying it again changes nothing.
pub fn simplify(expr: &Expr) -> Expr {
    match expr {
        Expr::Literal(_) | Expr::Variable(_) => expr.clone(),
        Expr::Sequence(lhs, rhs) => Expr::seq(simplify(lhs), simplify(rhs)),
        Expr::Range(lo, hi) => Expr::range(simplify(lo), simplify(hi)),
        Expr::Binary { op, lhs, rhs } => rewrite(*op, simplify(lhs), simplify(rhs)),
    }
}

fn rewrite(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    if let (Expr::Literal(a), Expr::Literal(b)) = (&lhs, &rhs) {
        return match op.apply(*a, *b) {
            Ok(value) => Expr::Literal(value),
            Err(_) => Expr::binary(op, lhs, rhs),
        };
    }

    match (op, lhs, rhs) {
        (BinOp::Sub, lhs, Expr::Literal(0)) => lhs,
        (BinOp::Sub, lhs, Expr::Literal(c)) => match c.checked_neg() {
            Some(neg) => rewrite(BinOp::Add, lhs, Expr::Literal(neg)),
            None => Expr::binary(BinOp::Sub, lhs, Expr::Literal(c)),
        },
        (op @ (BinOp::Add | BinOp::Mul), lit @ Expr::Literal(_), other) => rewrite(op, other, lit),
        (BinOp::Add, lhs, Expr::Literal(0)) => lhs,
        (BinOp::Mul, lhs, Expr::Literal(1)) => lhs,
        (BinOp::Mul, _, Expr::Literal(0)) => Expr::Literal(0),
        (op @ (BinOp::Add | BinOp::Mul), lhs, Expr::Literal(b)) => reassociate(op, lhs, b),
        (BinOp::Div, lhs, Expr::Literal(1)) => lhs,
        (BinOp::Shl | BinOp::Shr, lhs, Expr::Literal(0)) => lhs,
        (op, lhs, rhs) => Expr::binary(op, lhs, rhs),
    }
}

/// `(x op a) op b` becomes `x op (a op b)` when `a op b` does not overflow.
fn reassociate(op: BinOp, lhs: Expr, b: i64) -> Expr {
    match lhs {
        Expr::Binary {
            op: inner,
            lhs: x,
            rhs,
        } if inner == op => match *rhs {
            Expr::Literal(a) => match op.apply(a, b) {
                Ok(folded) => rewrite(op, *x, Expr::Literal(folded)),
                Err(_) => Expr::binary(op, Expr::binary(op, *x, Expr::Literal(a)), Expr::Literal(b)),
            },
            rhs => Expr::binary(op, Expr::binary(op, *x, rhs), Expr::Literal(b)),
        },
        lhs => Expr::binary(op, lhs, Expr::Literal(b)),
    }
}
