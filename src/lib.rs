//! Multiparty session types for Sesstype
//!
//! This crate models global multiparty protocols as trees of interactions,
//! choices, recursion and parameterised loops over indexed roles. It provides
//! endpoint projection from a global session to the local session of one
//! participant, and a structural comparator that decides whether two local
//! sessions are equivalent up to the reordering permitted by asynchronous
//! messaging.
//!
//! ```
//! use sesstype::{compare, project, MsgSig, Node, Role};
//!
//! let global = Node::root(vec![
//!     Node::interaction(Role::new("A"), [Role::new("B")], MsgSig::new("Ping")),
//!     Node::interaction(Role::new("B"), [Role::new("A")], MsgSig::new("Pong")),
//! ]);
//!
//! let local = project(&global, &Role::new("A")).unwrap();
//! assert!(compare(&local, &local).unwrap().identical);
//! ```

pub mod ast;
pub mod compiler;
pub mod error;

// Re-export main APIs
pub use ast::{
    Expr, Interaction, MsgPayload, MsgSig, Node, NodeKind, NodePath, Role, RoleGrp, Session,
    SessionKind,
};
pub use compiler::{
    compare, compare_with, project, simplify, CompareConfig, CompareOutcome, Mark, Side,
};
pub use error::{Error, Result};
