//! Analyses over session trees
//!
//! Projection turns a global tree into the local tree of one role; the
//! comparator decides whether two local trees are equivalent up to
//! asynchronous reordering. Both are pure functions of their inputs.

pub mod compare;
pub mod overlap;
pub mod projection;
pub mod simplify;

pub use compare::*;
pub use overlap::{channels_overlap, is_overlapped};
pub use projection::*;
pub use simplify::simplify;
