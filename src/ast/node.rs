//! Protocol tree for global and local session types
//!
//! A session body is a tree of [`Node`]s. Parents own their children
//! exclusively. The only non-structural edge is [`Node::Continue`], which
//! names an enclosing [`Node::Recursion`] or [`Node::For`] by label and is
//! resolved by lookup, never by reference.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use super::{Expr, MsgSig, Role};

/// A message exchange between one sender and one or more receivers
///
/// The same structure backs global interactions and their projected
/// `Send`/`Recv` forms; the enclosing [`Node`] variant says which one it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Sending role, absent when unknown to a local endpoint
    pub sender: Option<Role>,
    /// Receiving roles, never empty in a well-formed tree
    pub receivers: Vec<Role>,
    pub message: MsgSig,
    /// Guard: a parameterised role whose parameters constrain the interaction
    pub condition: Option<Role>,
}

impl Interaction {
    pub fn new(message: MsgSig) -> Self {
        Interaction {
            message,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_sender(mut self, sender: Role) -> Self {
        self.sender = Some(sender);
        self
    }

    #[must_use]
    pub fn with_receiver(mut self, receiver: Role) -> Self {
        self.receivers.push(receiver);
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Role) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn add_receiver(&mut self, receiver: Role) {
        self.receivers.push(receiver);
    }

    /// First receiver, if any
    pub fn receiver(&self) -> Option<&Role> {
        self.receivers.first()
    }
}

impl Display for Interaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.sender {
            Some(sender) => write!(f, "{sender}")?,
            None => write!(f, "_")?,
        }
        write!(f, " -> ")?;
        for (i, receiver) in self.receivers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{receiver}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Body run when `by` interrupts an [`Node::Interruptible`] scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interrupt {
    pub by: Role,
    pub body: Vec<Node>,
}

/// Protocol tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// Session body
    Root { children: Vec<Node> },

    /// Plain sequencing
    Block { children: Vec<Node> },

    /// Global message exchange: A -> B, C: Message
    Interaction(Interaction),

    /// Local send (projection of an interaction onto its sender)
    Send(Interaction),

    /// Local receive (projection of an interaction onto a receiver)
    Recv(Interaction),

    /// Choice made by `at`, one child per branch
    Choice { at: Role, branches: Vec<Node> },

    /// Recursion scope introducing `label`
    Recursion { label: String, body: Vec<Node> },

    /// Back-edge to the enclosing scope named `label`
    Continue { label: String },

    /// Parallel composition
    Parallel { branches: Vec<Node> },

    /// Indexed iteration of `var` over `range`
    For {
        var: String,
        range: Expr,
        body: Vec<Node>,
    },

    /// Invocation of an external protocol
    Nested {
        protocol: String,
        scope: Option<String>,
        roles: Vec<Role>,
        args: Vec<MsgSig>,
    },

    /// Scope that the roles in `interrupts` may abort
    Interruptible {
        scope: String,
        body: Vec<Node>,
        interrupts: Vec<Interrupt>,
    },
}

/// Variant tag of a [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Root,
    Block,
    Interaction,
    Send,
    Recv,
    Choice,
    Recursion,
    Continue,
    Parallel,
    For,
    Nested,
    Interruptible,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Root => "root",
            NodeKind::Block => "block",
            NodeKind::Interaction => "interaction",
            NodeKind::Send => "send",
            NodeKind::Recv => "recv",
            NodeKind::Choice => "choice",
            NodeKind::Recursion => "recur",
            NodeKind::Continue => "continue",
            NodeKind::Parallel => "par",
            NodeKind::For => "foreach",
            NodeKind::Nested => "nested",
            NodeKind::Interruptible => "interruptible",
        };
        f.write_str(name)
    }
}

/// An operation was attempted on a node of the wrong variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} is not supported on a {found} node")]
pub struct KindMismatch {
    pub operation: &'static str,
    pub found: NodeKind,
}

/// Position of a node relative to a tree root
///
/// Each step is an index into [`Node::children`] of the node reached so far.
/// The empty path is the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    #[must_use]
    pub fn child(&self, idx: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(idx);
        NodePath(steps)
    }

    pub fn steps(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(steps: Vec<usize>) -> Self {
        NodePath(steps)
    }
}

impl From<&[usize]> for NodePath {
    fn from(steps: &[usize]) -> Self {
        NodePath(steps.to_vec())
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Iterator over the direct children of a node
///
/// For `Interruptible` the scope body comes first, followed by the body of
/// each interrupt in declaration order.
pub struct Children<'a> {
    current: std::slice::Iter<'a, Node>,
    interrupts: std::slice::Iter<'a, Interrupt>,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        loop {
            if let Some(node) = self.current.next() {
                return Some(node);
            }
            self.current = self.interrupts.next()?.body.iter();
        }
    }
}

fn mismatch(operation: &'static str, found: NodeKind) -> KindMismatch {
    tracing::warn!(operation, %found, "operation on node of the wrong kind");
    KindMismatch { operation, found }
}

impl Node {
    pub fn root(children: Vec<Node>) -> Self {
        Node::Root { children }
    }

    pub fn block(children: Vec<Node>) -> Self {
        Node::Block { children }
    }

    /// Global interaction `sender -> receivers: message`
    pub fn interaction(
        sender: Role,
        receivers: impl IntoIterator<Item = Role>,
        message: MsgSig,
    ) -> Self {
        Node::Interaction(Interaction {
            sender: Some(sender),
            receivers: receivers.into_iter().collect(),
            message,
            condition: None,
        })
    }

    /// Local send to `to` (the sender is left unspecified)
    pub fn send(to: Role, message: MsgSig) -> Self {
        Node::Send(Interaction::new(message).with_receiver(to))
    }

    /// Local receive from `from` (the receiver is left unspecified)
    pub fn recv(from: Role, message: MsgSig) -> Self {
        Node::Recv(Interaction {
            sender: Some(from),
            ..Interaction::new(message)
        })
    }

    pub fn choice(at: Role, branches: Vec<Node>) -> Self {
        Node::Choice { at, branches }
    }

    pub fn recursion(label: impl Into<String>, body: Vec<Node>) -> Self {
        Node::Recursion {
            label: label.into(),
            body,
        }
    }

    pub fn continue_to(label: impl Into<String>) -> Self {
        Node::Continue {
            label: label.into(),
        }
    }

    pub fn parallel(branches: Vec<Node>) -> Self {
        Node::Parallel { branches }
    }

    pub fn for_loop(var: impl Into<String>, range: Expr, body: Vec<Node>) -> Self {
        Node::For {
            var: var.into(),
            range,
            body,
        }
    }

    pub fn nested(protocol: impl Into<String>, roles: Vec<Role>) -> Self {
        Node::Nested {
            protocol: protocol.into(),
            scope: None,
            roles,
            args: Vec::new(),
        }
    }

    pub fn interruptible(scope: impl Into<String>, body: Vec<Node>) -> Self {
        Node::Interruptible {
            scope: scope.into(),
            body,
            interrupts: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Root { .. } => NodeKind::Root,
            Node::Block { .. } => NodeKind::Block,
            Node::Interaction(_) => NodeKind::Interaction,
            Node::Send(_) => NodeKind::Send,
            Node::Recv(_) => NodeKind::Recv,
            Node::Choice { .. } => NodeKind::Choice,
            Node::Recursion { .. } => NodeKind::Recursion,
            Node::Continue { .. } => NodeKind::Continue,
            Node::Parallel { .. } => NodeKind::Parallel,
            Node::For { .. } => NodeKind::For,
            Node::Nested { .. } => NodeKind::Nested,
            Node::Interruptible { .. } => NodeKind::Interruptible,
        }
    }

    /// Local send or receive
    pub fn is_action(&self) -> bool {
        matches!(self, Node::Send(_) | Node::Recv(_))
    }

    /// `Recursion` or `For`
    pub fn is_loop(&self) -> bool {
        matches!(self, Node::Recursion { .. } | Node::For { .. })
    }

    pub fn children(&self) -> Children<'_> {
        const NONE: &[Interrupt] = &[];
        let (current, interrupts) = match self {
            Node::Root { children } | Node::Block { children } => (children.as_slice(), NONE),
            Node::Choice { branches, .. } | Node::Parallel { branches } => {
                (branches.as_slice(), NONE)
            }
            Node::Recursion { body, .. } | Node::For { body, .. } => (body.as_slice(), NONE),
            Node::Interruptible {
                body, interrupts, ..
            } => (body.as_slice(), interrupts.as_slice()),
            Node::Interaction(_)
            | Node::Send(_)
            | Node::Recv(_)
            | Node::Continue { .. }
            | Node::Nested { .. } => (&[][..], NONE),
        };
        Children {
            current: current.iter(),
            interrupts: interrupts.iter(),
        }
    }

    pub fn num_children(&self) -> usize {
        match self {
            Node::Interruptible {
                body, interrupts, ..
            } => body.len() + interrupts.iter().map(|i| i.body.len()).sum::<usize>(),
            _ => self.children().count(),
        }
    }

    pub fn child(&self, idx: usize) -> Option<&Node> {
        self.children().nth(idx)
    }

    /// Node reached by following `path` from this node
    pub fn at_path(&self, path: &NodePath) -> Option<&Node> {
        path.steps()
            .iter()
            .try_fold(self, |node, &idx| node.child(idx))
    }

    /// Append a child to a sequencing, branching or looping node
    ///
    /// Appending to an `Interruptible` extends its main body.
    pub fn append_child(&mut self, child: Node) -> Result<&mut Self, KindMismatch> {
        match self {
            Node::Root { children } | Node::Block { children } => children.push(child),
            Node::Choice { branches, .. } | Node::Parallel { branches } => branches.push(child),
            Node::Recursion { body, .. }
            | Node::For { body, .. }
            | Node::Interruptible { body, .. } => body.push(child),
            other => return Err(mismatch("append_child", other.kind())),
        }
        Ok(self)
    }

    /// Register the body run when `by` interrupts this scope
    ///
    /// An interrupt already registered for a role of the same name is replaced.
    pub fn add_interrupt(&mut self, by: Role, body: Vec<Node>) -> Result<&mut Self, KindMismatch> {
        match self {
            Node::Interruptible { interrupts, .. } => {
                match interrupts.iter_mut().find(|i| i.by.name() == by.name()) {
                    Some(existing) => {
                        existing.by = by;
                        existing.body = body;
                    }
                    None => interrupts.push(Interrupt { by, body }),
                }
                Ok(self)
            }
            other => Err(mismatch("add_interrupt", other.kind())),
        }
    }

    pub fn interaction_ref(&self) -> Result<&Interaction, KindMismatch> {
        match self {
            Node::Interaction(i) | Node::Send(i) | Node::Recv(i) => Ok(i),
            other => Err(mismatch("interaction", other.kind())),
        }
    }

    pub fn interaction_mut(&mut self) -> Result<&mut Interaction, KindMismatch> {
        match self {
            Node::Interaction(i) | Node::Send(i) | Node::Recv(i) => Ok(i),
            other => Err(mismatch("interaction", other.kind())),
        }
    }

    pub fn message(&self) -> Result<&MsgSig, KindMismatch> {
        match self {
            Node::Interaction(i) | Node::Send(i) | Node::Recv(i) => Ok(&i.message),
            other => Err(mismatch("message", other.kind())),
        }
    }

    pub fn set_message(&mut self, message: MsgSig) -> Result<&mut Self, KindMismatch> {
        self.interaction_mut()?.message = message;
        Ok(self)
    }

    pub fn set_sender(&mut self, sender: Role) -> Result<&mut Self, KindMismatch> {
        self.interaction_mut()?.sender = Some(sender);
        Ok(self)
    }

    pub fn add_receiver(&mut self, receiver: Role) -> Result<&mut Self, KindMismatch> {
        self.interaction_mut()?.add_receiver(receiver);
        Ok(self)
    }

    pub fn set_condition(&mut self, condition: Role) -> Result<&mut Self, KindMismatch> {
        self.interaction_mut()?.condition = Some(condition);
        Ok(self)
    }

    /// Label of a `Recursion` or `Continue`, loop variable of a `For`
    pub fn label(&self) -> Result<&str, KindMismatch> {
        match self {
            Node::Recursion { label, .. } | Node::Continue { label } => Ok(label),
            Node::For { var, .. } => Ok(var),
            other => Err(mismatch("label", other.kind())),
        }
    }

    /// Body of a `Recursion`, `For` or `Interruptible` scope
    pub fn body(&self) -> Result<&[Node], KindMismatch> {
        match self {
            Node::Recursion { body, .. }
            | Node::For { body, .. }
            | Node::Interruptible { body, .. } => Ok(body),
            other => Err(mismatch("body", other.kind())),
        }
    }

    /// Discriminating role of a `Choice`
    pub fn choice_at(&self) -> Result<&Role, KindMismatch> {
        match self {
            Node::Choice { at, .. } => Ok(at),
            other => Err(mismatch("choice_at", other.kind())),
        }
    }

    /// Iteration range of a `For`
    pub fn range(&self) -> Result<&Expr, KindMismatch> {
        match self {
            Node::For { range, .. } => Ok(range),
            other => Err(mismatch("range", other.kind())),
        }
    }

    pub fn interrupts(&self) -> Result<&[Interrupt], KindMismatch> {
        match self {
            Node::Interruptible { interrupts, .. } => Ok(interrupts),
            other => Err(mismatch("interrupts", other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut scope = Node::interruptible(
            "s",
            vec![Node::send(Role::new("B"), MsgSig::new("Tick"))],
        );
        scope
            .add_interrupt(
                Role::new("B"),
                vec![
                    Node::recv(Role::new("B"), MsgSig::new("Stop")),
                    Node::recv(Role::new("B"), MsgSig::new("Halt")),
                ],
            )
            .unwrap();
        Node::root(vec![Node::recursion("X", vec![scope, Node::continue_to("X")])])
    }

    #[test]
    fn interrupt_bodies_follow_the_scope_body() {
        let tree = sample();
        let scope = tree.at_path(&NodePath::from(vec![0, 0])).unwrap();
        assert_eq!(scope.num_children(), 3);
        let labels: Vec<_> = scope
            .children()
            .map(|n| n.message().unwrap().label().to_string())
            .collect();
        assert_eq!(labels, ["Tick", "Stop", "Halt"]);
        assert_eq!(
            tree.at_path(&vec![0, 1].into()).map(Node::kind),
            Some(NodeKind::Continue)
        );
        assert!(tree.at_path(&vec![0, 2].into()).is_none());
    }

    #[test]
    fn add_interrupt_replaces_same_role() {
        let mut tree = sample();
        let Node::Root { children } = &mut tree else {
            panic!("expected root");
        };
        let Node::Recursion { body, .. } = &mut children[0] else {
            panic!("expected recursion");
        };
        body[0].add_interrupt(Role::new("B"), vec![]).unwrap();
        assert_eq!(body[0].interrupts().unwrap().len(), 1);
        assert_eq!(body[0].num_children(), 1);
        assert_eq!(body[0].body().map(<[Node]>::len), Ok(1));
        assert!(Node::block(vec![]).body().is_err());
    }

    #[test]
    fn accessors_reject_wrong_kind() {
        let mut choice = Node::choice(Role::new("A"), vec![]);
        assert_eq!(
            choice.message(),
            Err(KindMismatch {
                operation: "message",
                found: NodeKind::Choice,
            })
        );
        assert!(choice.set_sender(Role::new("A")).is_err());
        assert!(Node::continue_to("X").append_child(Node::block(vec![])).is_err());
        assert_eq!(choice.choice_at().map(Role::name), Ok("A"));
        assert!(choice.append_child(Node::block(vec![])).is_ok());
        assert_eq!(choice.num_children(), 1);
    }

    #[test]
    fn interaction_fields_can_be_filled_in_place() {
        let mut node = Node::Interaction(Interaction::default());
        node.set_sender(Role::new("A"))
            .and_then(|n| n.add_receiver(Role::new("B")))
            .and_then(|n| n.set_message(MsgSig::new("M")))
            .unwrap();
        assert_eq!(node.interaction_ref().unwrap().to_string(), "A -> B: M()");
    }

    #[test]
    fn path_display() {
        assert_eq!(NodePath::root().to_string(), "/");
        assert_eq!(NodePath::root().child(2).child(0).to_string(), "/2/0");
    }
}
