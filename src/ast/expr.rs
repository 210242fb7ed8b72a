//! Symbolic integer expressions used as role and loop parameters
//!
//! Expressions index parameterised roles (`Worker[i+1]`), size payload
//! arrays and bound `foreach` loops. They carry no binding environment of
//! their own: free variables are bound by an enclosing loop or recursion.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display, Formatter};

/// Variable bindings used by [`Expr::evaluate`].
pub type Bindings = HashMap<String, i64>;

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
}

impl BinOp {
    /// Apply the operator with overflow and division checks.
    pub fn apply(self, lhs: i64, rhs: i64) -> Result<i64, ExprError> {
        let value = match self {
            BinOp::Add => lhs.checked_add(rhs),
            BinOp::Sub => lhs.checked_sub(rhs),
            BinOp::Mul => lhs.checked_mul(rhs),
            BinOp::Div | BinOp::Mod if rhs == 0 => return Err(ExprError::DivisionByZero),
            BinOp::Div => lhs.checked_div(rhs),
            BinOp::Mod => lhs.checked_rem(rhs),
            BinOp::Shl => u32::try_from(rhs).ok().and_then(|s| lhs.checked_shl(s)),
            BinOp::Shr => u32::try_from(rhs).ok().and_then(|s| lhs.checked_shr(s)),
        };
        value.ok_or(ExprError::Overflow { op: self, lhs, rhs })
    }

    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

/// Errors raised while evaluating an expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("Variable {0} is not bound")]
    Unbound(String),

    #[error("Arithmetic overflow in {lhs} {sym} {rhs}", sym = .op.symbol())]
    Overflow { op: BinOp, lhs: i64, rhs: i64 },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Expression {0} does not denote a single integer")]
    NotScalar(String),
}

/// Parameter expression
///
/// `Range` is inclusive on both ends and stands for "any index in this
/// range". `Sequence` juxtaposes two parameter dimensions (`i,j`).
///
/// # Examples
///
/// ```
/// use sesstype::ast::Expr;
///
/// // Worker[1..N]
/// let all = Expr::range(Expr::lit(1), Expr::var("N"));
/// // Worker[i+1]
/// let next = Expr::add(Expr::var("i"), Expr::lit(1));
///
/// assert_eq!(all.to_string(), "1..N");
/// assert_eq!(next.to_string(), "i+1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    Literal(i64),
    Variable(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Sequence(Box<Expr>, Box<Expr>),
    Range(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn lit(value: i64) -> Self {
        Expr::Literal(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Add, lhs, rhs)
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Sub, lhs, rhs)
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Mul, lhs, rhs)
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Div, lhs, rhs)
    }

    pub fn rem(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Mod, lhs, rhs)
    }

    pub fn shl(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Shl, lhs, rhs)
    }

    pub fn shr(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinOp::Shr, lhs, rhs)
    }

    pub fn seq(lhs: Expr, rhs: Expr) -> Self {
        Expr::Sequence(Box::new(lhs), Box::new(rhs))
    }

    pub fn range(lo: Expr, hi: Expr) -> Self {
        Expr::Range(Box::new(lo), Box::new(hi))
    }

    /// Plain structural equality.
    ///
    /// No normalization happens here, so `1+N` is not identical to `N+1`.
    /// Run both sides through [`crate::compiler::simplify`] first for a
    /// semantic comparison.
    pub fn is_identical(&self, other: &Expr) -> bool {
        self == other
    }

    /// Conservative may-alias test, see [`crate::compiler::overlap`].
    pub fn is_overlapped(&self, other: &Expr) -> bool {
        crate::compiler::overlap::is_overlapped(Some(self), Some(other))
    }

    /// Names of all variables occurring in the expression.
    pub fn free_vars(&self) -> BTreeSet<&str> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars<'a>(&'a self, vars: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(name) => {
                vars.insert(name.as_str());
            }
            Expr::Binary { lhs, rhs, .. } | Expr::Sequence(lhs, rhs) | Expr::Range(lhs, rhs) => {
                lhs.collect_vars(vars);
                rhs.collect_vars(vars);
            }
        }
    }

    /// True if no variable occurs in the expression.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Literal(_) => true,
            Expr::Variable(_) => false,
            Expr::Binary { lhs, rhs, .. } | Expr::Sequence(lhs, rhs) | Expr::Range(lhs, rhs) => {
                lhs.is_constant() && rhs.is_constant()
            }
        }
    }

    /// Value of a variable-free scalar expression.
    ///
    /// Returns `None` for ranges, sequences, expressions with variables and
    /// arithmetic that overflows or divides by zero.
    pub fn const_value(&self) -> Option<i64> {
        self.evaluate(&Bindings::new()).ok()
    }

    /// Evaluate a scalar expression under `bindings`.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<i64, ExprError> {
        match self {
            Expr::Literal(value) => Ok(*value),
            Expr::Variable(name) => bindings
                .get(name)
                .copied()
                .ok_or_else(|| ExprError::Unbound(name.clone())),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.evaluate(bindings)?;
                let rhs = rhs.evaluate(bindings)?;
                op.apply(lhs, rhs)
            }
            Expr::Sequence(..) | Expr::Range(..) => Err(ExprError::NotScalar(self.to_string())),
        }
    }

    /// Normalized copy of this expression.
    pub fn simplified(&self) -> Expr {
        crate::compiler::simplify::simplify(self)
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Sequence(..) => 0,
            Expr::Range(..) => 1,
            Expr::Binary { op, .. } => match op {
                BinOp::Shl | BinOp::Shr => 2,
                BinOp::Add | BinOp::Sub => 3,
                BinOp::Mul | BinOp::Div | BinOp::Mod => 4,
            },
            Expr::Literal(_) | Expr::Variable(_) => 5,
        }
    }

    fn fmt_operand(&self, f: &mut Formatter<'_>, parent: u8, strict: bool) -> fmt::Result {
        let prec = self.precedence();
        if prec < parent || (strict && prec == parent) {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let prec = self.precedence();
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Binary { op, lhs, rhs } => {
                lhs.fmt_operand(f, prec, false)?;
                write!(f, "{}", op.symbol())?;
                rhs.fmt_operand(f, prec, true)
            }
            Expr::Sequence(lhs, rhs) => {
                lhs.fmt_operand(f, prec, false)?;
                write!(f, ",")?;
                rhs.fmt_operand(f, prec, true)
            }
            Expr::Range(lo, hi) => {
                lo.fmt_operand(f, prec, true)?;
                write!(f, "..")?;
                hi.fmt_operand(f, prec, true)
            }
        }
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Literal(value)
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::Variable(name.to_string())
    }
}
