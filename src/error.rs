// Crate-level error type

use crate::ast::{ExprError, KindMismatch, LookupError, ValidationError};
use crate::compiler::{CompareError, ProjectionError};

/// Any error raised by this crate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    KindMismatch(#[from] KindMismatch),

    #[error("Projection failed: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Comparison failed: {0}")]
    Compare(#[from] CompareError),

    #[error(transparent)]
    Expr(#[from] ExprError),
}

pub type Result<T> = std::result::Result<T, Error>;
