//! Abstract Syntax Tree for multiparty session types
//!
//! This module defines the data model shared by global and local sessions:
//! parameter expressions, roles, message signatures and the protocol tree.

/// Symbolic parameter expressions
pub mod expr;

/// Message signatures and payloads
pub mod message;

/// Protocol tree nodes
pub mod node;

/// Role and role group definitions
pub mod role;

/// Session container
pub mod session;

/// Lookup and validation errors
pub mod validation;

pub use expr::*;
pub use message::*;
pub use node::*;
pub use role::*;
pub use session::*;
pub use validation::*;
