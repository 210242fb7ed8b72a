//! Conservative overlap analysis
//!
//! Two parameter expressions overlap when they may denote a common index
//! under some binding of their free variables. The analysis only answers
//! "disjoint" when it can prove it; every other case counts as overlap.

use crate::ast::{BinOp, Expr, Node, Role};

/// May-alias test on two optional parameters
///
/// An absent parameter on either side overlaps everything.
///
/// # Rules
/// - constants overlap iff they evaluate to the same value
/// - a constant and a range with constant bounds overlap iff the constant
///   lies inside the (inclusive) range
/// - two ranges with constant bounds overlap iff the intervals intersect
/// - two sequences overlap iff both components overlap
/// - `i+a` and `i+b` for the same variable `i` and distinct literals are
///   disjoint; any other variable use overlaps
pub fn is_overlapped(a: Option<&Expr>, b: Option<&Expr>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => overlap(a, b),
        _ => true,
    }
}

fn overlap(a: &Expr, b: &Expr) -> bool {
    match (a, b) {
        (Expr::Sequence(a1, a2), Expr::Sequence(b1, b2)) => overlap(a1, b1) && overlap(a2, b2),
        (Expr::Range(alo, ahi), Expr::Range(blo, bhi)) => {
            match (bounds(alo, ahi), bounds(blo, bhi)) {
                (Some((alo, ahi)), Some((blo, bhi))) => alo <= bhi && blo <= ahi,
                _ => true,
            }
        }
        (Expr::Range(lo, hi), point) | (point, Expr::Range(lo, hi)) => {
            match (bounds(lo, hi), point.const_value()) {
                (Some((lo, hi)), Some(value)) => lo <= value && value <= hi,
                _ => true,
            }
        }
        (Expr::Sequence(..), _) | (_, Expr::Sequence(..)) => true,
        _ => {
            if let (Some(x), Some(y)) = (a.const_value(), b.const_value()) {
                return x == y;
            }
            match (offset(a), offset(b)) {
                (Some((va, ca)), Some((vb, cb))) if va == vb => ca == cb,
                _ => true,
            }
        }
    }
}

fn bounds(lo: &Expr, hi: &Expr) -> Option<(i64, i64)> {
    Some((lo.const_value()?, hi.const_value()?))
}

/// Decompose `e` into `var + offset` when it has that shape.
fn offset(e: &Expr) -> Option<(&str, i64)> {
    match e {
        Expr::Variable(name) => Some((name.as_str(), 0)),
        Expr::Binary { op: BinOp::Add, lhs, rhs } => {
            if let Some(c) = rhs.const_value() {
                let (var, k) = offset(lhs)?;
                Some((var, k.checked_add(c)?))
            } else {
                let c = lhs.const_value()?;
                let (var, k) = offset(rhs)?;
                Some((var, k.checked_add(c)?))
            }
        }
        Expr::Binary { op: BinOp::Sub, lhs, rhs } => {
            let c = rhs.const_value()?;
            let (var, k) = offset(lhs)?;
            Some((var, k.checked_sub(c)?))
        }
        _ => None,
    }
}

/// Whether two local actions may use the same channel
///
/// The channel of a `Send` is its receivers, that of a `Recv` its sender;
/// direction is ignored. An unknown sender overlaps every channel.
/// Anything other than a `Send` or `Recv` has no channel.
pub fn channels_overlap(a: &Node, b: &Node) -> bool {
    channels_overlap_with(a, b, None)
}

/// [`channels_overlap`] where a peer named `wildcard` overlaps any peer
pub(crate) fn channels_overlap_with(a: &Node, b: &Node, wildcard: Option<&str>) -> bool {
    let (Some(left), Some(right)) = (peers(a), peers(b)) else {
        return false;
    };
    left.iter().any(|l| {
        right.iter().any(|r| match (l, r) {
            (Some(l), Some(r)) => {
                is_wildcard(l, wildcard) || is_wildcard(r, wildcard) || l.overlaps(r)
            }
            _ => true,
        })
    })
}

fn peers(node: &Node) -> Option<Vec<Option<&Role>>> {
    match node {
        Node::Send(i) => Some(i.receivers.iter().map(Some).collect()),
        Node::Recv(i) => Some(vec![i.sender.as_ref()]),
        _ => None,
    }
}

fn is_wildcard(role: &Role, wildcard: Option<&str>) -> bool {
    wildcard.is_some_and(|w| role.name() == w)
}
