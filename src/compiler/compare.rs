//! Structural comparison of local session trees
//!
//! Two local trees are compared node by node. Inside the body of a loop
//! (`Recursion` or `For`) a leading run of sends and receives may appear in
//! a different order on each side, as long as no reordered pair shares a
//! channel: asynchronous messaging cannot observe the order of actions on
//! distinct channels.
//!
//! The comparator never mutates its inputs. Differences are reported as
//! [`Mark`]s naming the offending node on each side by its [`NodePath`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use tracing::{debug, trace};

use super::overlap::channels_overlap_with;
use super::simplify::simplify;
use crate::ast::{Expr, Interaction, Node, NodeKind, NodePath, Role};

/// Comparator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Allow reordering of the leading actions of loop bodies
    pub async_reordering: bool,
    /// Simplify expressions before testing them for identity
    pub normalize_expressions: bool,
    /// Let a pending receive be overtaken by a send on the same channel
    pub send_overtakes_recv: bool,
    /// Peer name on the right-hand side that matches any peer name
    pub wildcard_role: Option<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        CompareConfig {
            async_reordering: true,
            normalize_expressions: false,
            send_overtakes_recv: false,
            wildcard_role: Some("__ROLE__".to_string()),
        }
    }
}

/// Which input of a comparison a mark refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// A node found to differ from its counterpart
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mark {
    pub side: Side,
    pub path: NodePath,
}

/// Result of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareOutcome {
    pub identical: bool,
    pub marks: BTreeSet<Mark>,
}

impl CompareOutcome {
    pub fn is_marked(&self, side: Side, path: &NodePath) -> bool {
        self.marks.contains(&Mark {
            side,
            path: path.clone(),
        })
    }

    /// Marked paths of one side, in path order
    pub fn marked(&self, side: Side) -> impl Iterator<Item = &NodePath> {
        self.marks
            .iter()
            .filter(move |m| m.side == side)
            .map(|m| &m.path)
    }
}

/// Errors that can occur during comparison
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("Continue label {label} not in scope on the {side} side")]
    UnresolvedLabel { side: Side, label: String },
}

/// Compare two local trees with the default [`CompareConfig`]
pub fn compare(left: &Node, right: &Node) -> Result<CompareOutcome, CompareError> {
    compare_with(left, right, &CompareConfig::default())
}

/// Compare two local trees
///
/// Both trees must have every `Continue` bound to an enclosing scope.
/// A non-identical outcome is not an error; inspect
/// [`CompareOutcome::marks`] to locate the differences.
pub fn compare_with(
    left: &Node,
    right: &Node,
    config: &CompareConfig,
) -> Result<CompareOutcome, CompareError> {
    for (side, tree) in [(Side::Left, left), (Side::Right, right)] {
        if let Some(label) = tree.unresolved_label() {
            return Err(CompareError::UnresolvedLabel {
                side,
                label: label.to_string(),
            });
        }
    }

    let mut comparator = Comparator::new(config);
    comparator.compare_node(left, right, &NodePath::root(), &NodePath::root());
    let outcome = comparator.finish();
    debug!(
        identical = outcome.identical,
        marks = outcome.marks.len(),
        "compare: done"
    );
    Ok(outcome)
}

struct Comparator<'c> {
    config: &'c CompareConfig,
    identical: bool,
    marks: BTreeSet<Mark>,
}

impl<'c> Comparator<'c> {
    fn new(config: &'c CompareConfig) -> Self {
        Comparator {
            config,
            identical: true,
            marks: BTreeSet::new(),
        }
    }

    fn finish(self) -> CompareOutcome {
        CompareOutcome {
            identical: self.identical,
            marks: self.marks,
        }
    }

    fn mark(&mut self, side: Side, path: &NodePath) {
        self.identical = false;
        self.marks.insert(Mark {
            side,
            path: path.clone(),
        });
    }

    fn compare_node(&mut self, left: &Node, right: &Node, lpath: &NodePath, rpath: &NodePath) {
        if !self.same_header(left, right) {
            trace!(%lpath, %rpath, left = %left.kind(), right = %right.kind(), "compare: mismatch");
            self.mark(Side::Left, lpath);
            self.mark(Side::Right, rpath);
            return;
        }

        let lchildren: Vec<&Node> = left.children().collect();
        let rchildren: Vec<&Node> = right.children().collect();
        if self.config.async_reordering && left.is_loop() {
            self.compare_async(&lchildren, &rchildren, lpath, rpath);
        } else {
            self.compare_exact(&lchildren, &rchildren, 0, lpath, rpath);
        }
    }

    /// Positional comparison of `left[from..]` against `right[from..]`
    fn compare_exact(
        &mut self,
        left: &[&Node],
        right: &[&Node],
        from: usize,
        lpath: &NodePath,
        rpath: &NodePath,
    ) {
        for (idx, (l, r)) in left.iter().zip(right).enumerate().skip(from) {
            self.compare_node(l, r, &lpath.child(idx), &rpath.child(idx));
        }
    }

    /// Matching of the leading action window of a loop body
    ///
    /// Each left action takes the first unconsumed equal action of the same
    /// kind in the right window. The scan stops at the first action that
    /// shares a channel with it without matching it.
    fn compare_async(
        &mut self,
        left: &[&Node],
        right: &[&Node],
        lpath: &NodePath,
        rpath: &NodePath,
    ) {
        let window = left.iter().take_while(|n| n.is_action()).count();
        if window == 0 {
            self.compare_exact(left, right, 0, lpath, rpath);
            return;
        }
        trace!(%lpath, window, "compare: async window");

        let config = self.config;
        let wildcard = config.wildcard_role.as_deref();
        let mut consumed = vec![false; window];
        for (i, l) in left.iter().take(window).enumerate() {
            let mut resolved = false;
            for (j, r) in right.iter().take(window).enumerate() {
                if consumed[j] || !r.is_action() {
                    continue;
                }
                if self.same_header(l, r) {
                    consumed[j] = true;
                    resolved = true;
                    break;
                }
                if channels_overlap_with(l, r, wildcard) {
                    let overtaken = config.send_overtakes_recv
                        && l.kind() == NodeKind::Recv
                        && r.kind() == NodeKind::Send;
                    if overtaken {
                        continue;
                    }
                    trace!(left = %lpath.child(i), right = %rpath.child(j), "compare: blocked");
                    self.mark(Side::Left, &lpath.child(i));
                    self.mark(Side::Right, &rpath.child(j));
                    resolved = true;
                    break;
                }
            }
            if !resolved {
                trace!(left = %lpath.child(i), "compare: unmatched");
                self.mark(Side::Left, &lpath.child(i));
            }
        }

        self.compare_exact(left, right, window, lpath, rpath);
    }

    /// Kind, child count and the node's own fields
    fn same_header(&self, left: &Node, right: &Node) -> bool {
        if left.kind() != right.kind() || left.num_children() != right.num_children() {
            return false;
        }
        match (left, right) {
            (Node::Interaction(l), Node::Interaction(r)) => {
                l.message.is_compatible(&r.message)
                    && self.same_sender(l, r)
                    && self.same_receivers(l, r)
                    && self.same_guard(l, r)
            }
            (Node::Send(l), Node::Send(r)) => {
                l.message.is_compatible(&r.message)
                    && self.same_receivers(l, r)
                    && self.same_guard(l, r)
            }
            (Node::Recv(l), Node::Recv(r)) => {
                l.message.is_compatible(&r.message)
                    && self.same_sender(l, r)
                    && self.same_guard(l, r)
            }
            (Node::Choice { at: l, .. }, Node::Choice { at: r, .. }) => l.name() == r.name(),
            (
                Node::For {
                    var: lvar,
                    range: lrange,
                    ..
                },
                Node::For {
                    var: rvar,
                    range: rrange,
                    ..
                },
            ) => lvar == rvar && self.same_expr(lrange, rrange),
            (
                Node::Nested {
                    protocol: lproto,
                    roles: lroles,
                    args: largs,
                    ..
                },
                Node::Nested {
                    protocol: rproto,
                    roles: rroles,
                    args: rargs,
                    ..
                },
            ) => {
                lproto == rproto
                    && lroles.len() == rroles.len()
                    && lroles.iter().zip(rroles).all(|(l, r)| self.same_peer(l, r))
                    && largs.len() == rargs.len()
                    && largs.iter().zip(rargs).all(|(l, r)| l.is_compatible(r))
            }
            // Children are the scope body followed by every interrupt body,
            // so the split points must line up as well.
            (
                Node::Interruptible {
                    body: lbody,
                    interrupts: lints,
                    ..
                },
                Node::Interruptible {
                    body: rbody,
                    interrupts: rints,
                    ..
                },
            ) => {
                lbody.len() == rbody.len()
                    && lints.len() == rints.len()
                    && lints.iter().zip(rints).all(|(l, r)| {
                        l.body.len() == r.body.len() && self.same_peer(&l.by, &r.by)
                    })
            }
            _ => true,
        }
    }

    fn same_sender(&self, left: &Interaction, right: &Interaction) -> bool {
        match (&left.sender, &right.sender) {
            (Some(l), Some(r)) => self.same_peer(l, r),
            (None, None) => true,
            _ => false,
        }
    }

    fn same_receivers(&self, left: &Interaction, right: &Interaction) -> bool {
        left.receivers.len() == right.receivers.len()
            && left
                .receivers
                .iter()
                .zip(&right.receivers)
                .all(|(l, r)| self.same_peer(l, r))
    }

    /// Guards must be both absent or identical
    ///
    /// Stricter than comparing guards only when both sides carry one: a
    /// guard on one side alone is a difference.
    fn same_guard(&self, left: &Interaction, right: &Interaction) -> bool {
        match (&left.condition, &right.condition) {
            (Some(l), Some(r)) => l.name() == r.name() && self.same_dimensions(l, r),
            (None, None) => true,
            _ => false,
        }
    }

    fn same_peer(&self, left: &Role, right: &Role) -> bool {
        let name = left.name() == right.name()
            || self
                .config
                .wildcard_role
                .as_deref()
                .is_some_and(|w| right.name() == w);
        name && self.same_dimensions(left, right)
    }

    fn same_dimensions(&self, left: &Role, right: &Role) -> bool {
        left.num_dimens() == right.num_dimens()
            && left
                .dimensions()
                .iter()
                .zip(right.dimensions())
                .all(|(l, r)| self.same_expr(l, r))
    }

    fn same_expr(&self, left: &Expr, right: &Expr) -> bool {
        if self.config.normalize_expressions {
            simplify(left) == simplify(right)
        } else {
            left.is_identical(right)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::MsgSig;

    fn send(to: &str, label: &str) -> Node {
        Node::send(Role::new(to), MsgSig::new(label))
    }

    fn recv(from: &str, label: &str) -> Node {
        Node::recv(Role::new(from), MsgSig::new(label))
    }

    fn looped(body: Vec<Node>) -> Node {
        let mut body = body;
        body.push(Node::continue_to("L"));
        Node::root(vec![Node::recursion("L", body)])
    }

    fn path(steps: &[usize]) -> NodePath {
        NodePath::from(steps)
    }

    #[test]
    fn tree_is_identical_to_itself() {
        let tree = looped(vec![send("B", "M"), recv("C", "N")]);
        let outcome = compare(&tree, &tree).unwrap();
        assert!(outcome.identical);
        assert!(outcome.marks.is_empty());
    }

    #[test]
    fn recursion_labels_are_ignored() {
        let left = Node::recursion("X", vec![send("B", "M"), Node::continue_to("X")]);
        let right = Node::recursion("Y", vec![send("B", "M"), Node::continue_to("Y")]);
        assert!(compare(&left, &right).unwrap().identical);
    }

    #[test]
    fn actions_on_distinct_channels_may_swap() {
        let left = looped(vec![send("B", "M"), recv("C", "N")]);
        let right = looped(vec![recv("C", "N"), send("B", "M")]);
        assert!(compare(&left, &right).unwrap().identical);
    }

    #[test]
    fn actions_on_a_shared_channel_may_not_swap() {
        let left = looped(vec![send("B", "M"), recv("B", "N")]);
        let right = looped(vec![recv("B", "N"), send("B", "M")]);
        let outcome = compare(&left, &right).unwrap();
        assert!(!outcome.identical);
        assert!(outcome.is_marked(Side::Left, &path(&[0, 0])));
        assert!(outcome.is_marked(Side::Right, &path(&[0, 0])));
        assert_eq!(outcome.marks.len(), 2);
    }

    #[test]
    fn send_may_overtake_recv_when_enabled() {
        let left = looped(vec![recv("B", "N"), send("B", "M")]);
        let right = looped(vec![send("B", "M"), recv("B", "N")]);
        let config = CompareConfig {
            send_overtakes_recv: true,
            ..CompareConfig::default()
        };
        assert!(compare_with(&left, &right, &config).unwrap().identical);
        assert!(!compare(&left, &right).unwrap().identical);
    }

    #[test]
    fn reordering_outside_loops_is_rejected() {
        let left = Node::root(vec![send("B", "M"), recv("C", "N")]);
        let right = Node::root(vec![recv("C", "N"), send("B", "M")]);
        let outcome = compare(&left, &right).unwrap();
        assert!(!outcome.identical);
        assert_eq!(
            outcome.marked(Side::Left).cloned().collect::<Vec<_>>(),
            vec![path(&[0]), path(&[1])]
        );
    }

    #[test]
    fn reordering_can_be_disabled() {
        let left = looped(vec![send("B", "M"), recv("C", "N")]);
        let right = looped(vec![recv("C", "N"), send("B", "M")]);
        let config = CompareConfig {
            async_reordering: false,
            ..CompareConfig::default()
        };
        assert!(!compare_with(&left, &right, &config).unwrap().identical);
    }

    #[test]
    fn missing_partner_marks_the_left_action() {
        let left = looped(vec![send("B", "M"), send("C", "N")]);
        let right = looped(vec![send("C", "N"), send("D", "M")]);
        let outcome = compare(&left, &right).unwrap();
        assert!(!outcome.identical);
        assert!(outcome.is_marked(Side::Left, &path(&[0, 0])));
        assert!(!outcome.is_marked(Side::Left, &path(&[0, 1])));
        assert_eq!(outcome.marked(Side::Right).count(), 0);
    }

    #[test]
    fn header_mismatch_stops_descent() {
        let left = Node::root(vec![Node::block(vec![send("B", "M")])]);
        let right = Node::root(vec![Node::parallel(vec![send("B", "M")])]);
        let outcome = compare(&left, &right).unwrap();
        assert_eq!(
            outcome.marks,
            BTreeSet::from([
                Mark {
                    side: Side::Left,
                    path: path(&[0]),
                },
                Mark {
                    side: Side::Right,
                    path: path(&[0]),
                },
            ])
        );
    }

    #[test]
    fn unlabelled_message_and_wildcard_peer_match() {
        let left = Node::root(vec![send("B", "Data")]);
        let right = Node::root(vec![send("__ROLE__", "")]);
        assert!(compare(&left, &right).unwrap().identical);
        assert!(!compare(&right, &left).unwrap().identical);

        let strict = CompareConfig {
            wildcard_role: None,
            ..CompareConfig::default()
        };
        assert!(!compare_with(&left, &right, &strict).unwrap().identical);
    }

    #[test]
    fn guards_must_agree() {
        let guarded = |e: Expr| {
            let mut node = send("B", "M");
            node.set_condition(Role::new("G").with_param(e)).unwrap();
            node
        };
        let plain = Node::root(vec![send("B", "M")]);
        let left = Node::root(vec![guarded(Expr::lit(1))]);
        assert!(!compare(&plain, &left).unwrap().identical);
        assert!(compare(&left, &left.clone()).unwrap().identical);
        let other = Node::root(vec![guarded(Expr::lit(2))]);
        assert!(!compare(&left, &other).unwrap().identical);
    }

    fn scope_with_interrupt(by: &str) -> Node {
        let mut scope = Node::interruptible("s", vec![send("B", "Tick")]);
        scope
            .add_interrupt(Role::new(by), vec![recv(by, "Stop")])
            .unwrap();
        Node::root(vec![scope])
    }

    #[test]
    fn interrupt_bodies_are_not_merged_into_the_scope() {
        let handled = scope_with_interrupt("X");
        let inlined = Node::root(vec![Node::interruptible(
            "s",
            vec![send("B", "Tick"), recv("X", "Stop")],
        )]);
        assert_eq!(handled.child(0).map(Node::num_children), Some(2));
        assert_eq!(inlined.child(0).map(Node::num_children), Some(2));

        let outcome = compare(&handled, &inlined).unwrap();
        assert!(!outcome.identical);
        assert!(outcome.is_marked(Side::Left, &path(&[0])));
        assert!(outcome.is_marked(Side::Right, &path(&[0])));
        assert!(compare(&handled, &handled.clone()).unwrap().identical);
    }

    #[test]
    fn interrupting_role_must_match() {
        let by_x = scope_with_interrupt("X");
        let by_y = scope_with_interrupt("Y");
        assert!(!compare(&by_x, &by_y).unwrap().identical);
        assert!(compare(&by_x, &scope_with_interrupt("__ROLE__")).unwrap().identical);
    }

    #[test]
    fn nested_arguments_must_be_compatible() {
        let call = |arg: &str| {
            Node::root(vec![Node::Nested {
                protocol: "P".to_string(),
                scope: None,
                roles: vec![Role::new("A")],
                args: vec![MsgSig::new(arg)],
            }])
        };
        assert!(compare(&call("X"), &call("X")).unwrap().identical);
        let outcome = compare(&call("X"), &call("Y")).unwrap();
        assert!(!outcome.identical);
        assert!(outcome.is_marked(Side::Left, &path(&[0])));
        assert!(compare(&call("X"), &call("")).unwrap().identical);
    }

    #[test]
    fn normalization_is_opt_in() {
        let worker = |e: Expr| Node::send(Role::new("W").with_param(e), MsgSig::new("M"));
        let left = Node::root(vec![worker(Expr::add(Expr::lit(1), Expr::var("i")))]);
        let right = Node::root(vec![worker(Expr::add(Expr::var("i"), Expr::lit(1)))]);
        assert!(!compare(&left, &right).unwrap().identical);
        let config = CompareConfig {
            normalize_expressions: true,
            ..CompareConfig::default()
        };
        assert!(compare_with(&left, &right, &config).unwrap().identical);
    }

    #[test]
    fn unresolved_label_is_an_error() {
        let good = looped(vec![send("B", "M")]);
        let bad = Node::root(vec![Node::continue_to("Nowhere")]);
        assert_eq!(
            compare(&good, &bad),
            Err(CompareError::UnresolvedLabel {
                side: Side::Right,
                label: "Nowhere".to_string(),
            })
        );
    }
}
