// Projection from global sessions to the local session of one role

use tracing::{debug, trace};

use crate::ast::{Interaction, Interrupt, Node, Role};

/// Project a session tree onto `role`
///
/// The result is always a [`Node::Root`]. Interactions become `Send` when
/// `role` is the sender, `Recv` when it is one of the receivers and vanish
/// otherwise. Already local `Send`/`Recv` nodes are kept as they are, so
/// projecting a local tree again returns it unchanged.
///
/// # Projection Rules
/// - `Block`/`Parallel`: elided children are dropped, and the node itself is
///   dropped once it has no children left
/// - `Choice`: always kept; a branch without actions becomes an empty `Block`
/// - `Recursion`/`For`: always kept with their projected body
/// - `Continue`: kept; its label must name an enclosing scope
/// - `Nested`: kept unchanged
/// - `Interruptible`: the scope body and every interrupt body are projected
pub fn project(tree: &Node, role: &Role) -> Result<Node, ProjectionError> {
    debug!(role = %role, "project: start");
    let mut context = ProjectionContext::new(role);
    let children = match tree {
        Node::Root { children } => context.project_seq(children)?,
        other => context.project_node(other)?.into_iter().collect(),
    };
    debug!(role = %role, children = children.len(), "project: done");
    Ok(Node::Root { children })
}

/// Errors that can occur during projection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    #[error("Continue label {0} not in scope")]
    UnresolvedLabel(String),
}

/// Context for projection algorithm
struct ProjectionContext<'a> {
    role: &'a Role,
    /// Labels of the enclosing `Recursion` and `For` scopes, innermost last
    scopes: Vec<&'a str>,
}

impl<'a> ProjectionContext<'a> {
    fn new(role: &'a Role) -> Self {
        ProjectionContext {
            role,
            scopes: Vec::new(),
        }
    }

    fn project_seq(&mut self, nodes: &'a [Node]) -> Result<Vec<Node>, ProjectionError> {
        let mut projected = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(node) = self.project_node(node)? {
                projected.push(node);
            }
        }
        Ok(projected)
    }

    /// Project one node; `None` means the node has no counterpart locally
    fn project_node(&mut self, node: &'a Node) -> Result<Option<Node>, ProjectionError> {
        match node {
            Node::Interaction(interaction) => Ok(self.project_interaction(interaction)),

            Node::Send(_) | Node::Recv(_) | Node::Nested { .. } => Ok(Some(node.clone())),

            Node::Root { children } => {
                let children = self.project_seq(children)?;
                Ok((!children.is_empty()).then(|| Node::Root { children }))
            }

            Node::Block { children } => {
                let children = self.project_seq(children)?;
                Ok((!children.is_empty()).then(|| Node::Block { children }))
            }

            Node::Parallel { branches } => {
                let branches = self.project_seq(branches)?;
                Ok((!branches.is_empty()).then(|| Node::Parallel { branches }))
            }

            Node::Choice { at, branches } => {
                let branches = branches
                    .iter()
                    .map(|branch| -> Result<Node, ProjectionError> {
                        Ok(self
                            .project_node(branch)?
                            .unwrap_or_else(|| Node::block(Vec::new())))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(Node::Choice {
                    at: at.clone(),
                    branches,
                }))
            }

            Node::Recursion { label, body } => {
                let body = self.project_scoped(label, body)?;
                Ok(Some(Node::Recursion {
                    label: label.clone(),
                    body,
                }))
            }

            Node::For { var, range, body } => {
                let body = self.project_scoped(var, body)?;
                Ok(Some(Node::For {
                    var: var.clone(),
                    range: range.clone(),
                    body,
                }))
            }

            Node::Continue { label } => {
                if self.scopes.iter().rev().any(|s| *s == label.as_str()) {
                    Ok(Some(node.clone()))
                } else {
                    debug!(%label, "project: unresolved continue");
                    Err(ProjectionError::UnresolvedLabel(label.clone()))
                }
            }

            Node::Interruptible {
                scope,
                body,
                interrupts,
            } => {
                let body = self.project_seq(body)?;
                let interrupts = interrupts
                    .iter()
                    .map(|interrupt| -> Result<Interrupt, ProjectionError> {
                        Ok(Interrupt {
                            by: interrupt.by.clone(),
                            body: self.project_seq(&interrupt.body)?,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(Node::Interruptible {
                    scope: scope.clone(),
                    body,
                    interrupts,
                }))
            }
        }
    }

    fn project_scoped(
        &mut self,
        label: &'a str,
        body: &'a [Node],
    ) -> Result<Vec<Node>, ProjectionError> {
        self.scopes.push(label);
        let body = self.project_seq(body);
        self.scopes.pop();
        body
    }

    /// Project an interaction onto the local view of this role
    ///
    /// # Projection Rules
    /// - If the role matches the sender: `Send` with every field carried over
    /// - Else if it matches any receiver: `Recv` with every field carried over
    /// - Otherwise: elided (uninvolved party)
    fn project_interaction(&self, interaction: &Interaction) -> Option<Node> {
        let is_sender = interaction
            .sender
            .as_ref()
            .is_some_and(|sender| self.role.matches(sender));
        if is_sender {
            return Some(Node::Send(interaction.clone()));
        }
        if interaction.receivers.iter().any(|r| self.role.matches(r)) {
            return Some(Node::Recv(interaction.clone()));
        }
        trace!(role = %self.role, %interaction, "project: elided");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, MsgSig, NodeKind};

    fn a() -> Role {
        Role::new("A")
    }

    fn b() -> Role {
        Role::new("B")
    }

    fn msg(label: &str) -> MsgSig {
        MsgSig::new(label)
    }

    #[test]
    fn sender_and_receiver_views() {
        let tree = Node::root(vec![Node::interaction(a(), [b()], msg("M"))]);

        let at_a = project(&tree, &a()).unwrap();
        let Node::Root { children } = &at_a else {
            panic!("expected root");
        };
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].kind(), NodeKind::Send);
        assert_eq!(children[0].interaction_ref().unwrap().sender, Some(a()));
        assert_eq!(children[0].interaction_ref().unwrap().receivers, vec![b()]);

        let at_b = project(&tree, &b()).unwrap();
        assert_eq!(at_b.child(0).map(Node::kind), Some(NodeKind::Recv));

        let at_c = project(&tree, &Role::new("C")).unwrap();
        assert_eq!(at_c, Node::root(vec![]));
    }

    #[test]
    fn sender_wins_over_receiver() {
        let tree = Node::interaction(a(), [b(), a()], msg("Loop"));
        let local = project(&tree, &a()).unwrap();
        assert_eq!(local.child(0).map(Node::kind), Some(NodeKind::Send));
    }

    #[test]
    fn parameterised_roles_match_on_dimension_count() {
        let worker = |e| Role::new("W").with_param(e);
        let tree = Node::root(vec![
            Node::interaction(a(), [worker(Expr::var("i"))], msg("Job")),
            Node::interaction(
                Role::new("W").with_param(Expr::var("i")).with_param(Expr::lit(0)),
                [a()],
                msg("Done"),
            ),
        ]);
        let local = project(&tree, &worker(Expr::lit(3))).unwrap();
        assert_eq!(local.num_children(), 1);
        assert_eq!(local.child(0).map(Node::kind), Some(NodeKind::Recv));
    }

    #[test]
    fn empty_blocks_and_parallels_are_elided() {
        let tree = Node::root(vec![
            Node::block(vec![Node::interaction(b(), [Role::new("C")], msg("X"))]),
            Node::parallel(vec![
                Node::interaction(b(), [Role::new("C")], msg("Y")),
                Node::interaction(a(), [b()], msg("Z")),
            ]),
        ]);
        let local = project(&tree, &a()).unwrap();
        assert_eq!(local.num_children(), 1);
        let par = local.child(0).unwrap();
        assert_eq!(par.kind(), NodeKind::Parallel);
        assert_eq!(par.num_children(), 1);
    }

    #[test]
    fn choice_branches_are_never_dropped() {
        let tree = Node::choice(
            b(),
            vec![
                Node::interaction(b(), [Role::new("C")], msg("Left")),
                Node::interaction(b(), [a()], msg("Right")),
            ],
        );
        let local = project(&tree, &a()).unwrap();
        let choice = local.child(0).unwrap();
        assert_eq!(choice.num_children(), 2);
        assert_eq!(choice.child(0), Some(&Node::block(vec![])));
        assert_eq!(choice.child(1).map(Node::kind), Some(NodeKind::Recv));
    }

    #[test]
    fn loops_and_continue_are_kept() {
        let tree = Node::recursion(
            "X",
            vec![
                Node::for_loop(
                    "i",
                    Expr::range(Expr::lit(1), Expr::var("N")),
                    vec![Node::continue_to("i")],
                ),
                Node::continue_to("X"),
            ],
        );
        let local = project(&tree, &a()).unwrap();
        assert_eq!(local, Node::root(vec![tree]));
    }

    #[test]
    fn unresolved_continue_fails() {
        let tree = Node::root(vec![
            Node::interaction(a(), [b()], msg("M")),
            Node::continue_to("Missing"),
        ]);
        assert_eq!(
            project(&tree, &a()),
            Err(ProjectionError::UnresolvedLabel("Missing".to_string()))
        );
    }

    #[test]
    fn interrupt_bodies_are_projected() {
        let mut scope = Node::interruptible(
            "s",
            vec![Node::interaction(a(), [b()], msg("Tick"))],
        );
        scope
            .add_interrupt(
                b(),
                vec![
                    Node::interaction(b(), [a()], msg("Stop")),
                    Node::interaction(b(), [Role::new("C")], msg("Log")),
                ],
            )
            .unwrap();
        let local = project(&Node::root(vec![scope]), &a()).unwrap();
        let projected = local.child(0).unwrap();
        assert_eq!(projected.interrupts().unwrap().len(), 1);
        assert_eq!(projected.num_children(), 2);
    }

    #[test]
    fn projection_is_idempotent() {
        let tree = Node::root(vec![
            Node::interaction(a(), [b()], msg("M")),
            Node::recursion("R", vec![Node::interaction(b(), [a()], msg("N"))]),
        ]);
        let once = project(&tree, &a()).unwrap();
        assert_eq!(project(&once, &a()).unwrap(), once);
    }
}
