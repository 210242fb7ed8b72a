// Validation errors and well-formedness checks

use indexmap::IndexMap;

use super::{Interaction, Node, Role};

/// Failed lookup of a role, group member, dimension or payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("Role {0} not found in session")]
    UnknownRole(String),

    #[error("Group {0} not found in session")]
    UnknownGroup(String),

    #[error("Role {name} is not a member of group {group}")]
    UnknownMember { group: String, name: String },

    #[error("Role {role} has {len} dimension(s), no dimension {index}")]
    DimensionOutOfRange {
        role: String,
        index: usize,
        len: usize,
    },

    #[error("Message {label} has {len} payload(s), no payload {index}")]
    PayloadOutOfRange {
        label: String,
        index: usize,
        len: usize,
    },
}

/// Session well-formedness errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Role {0} not declared in session")]
    UndefinedRole(String),

    #[error("Role {role} declared with {declared} dimension(s) but used with {found}")]
    DimensionMismatch {
        role: String,
        declared: usize,
        found: usize,
    },

    #[error("Interaction {0} has no receivers")]
    EmptyReceivers(String),

    #[error("Continue label {0} has no enclosing recursion or loop")]
    UnresolvedLabel(String),
}

impl Node {
    /// Check that every `Continue` resolves to an enclosing `Recursion` or `For`.
    pub fn check_labels(&self) -> Result<(), ValidationError> {
        match self.unresolved_label() {
            Some(label) => Err(ValidationError::UnresolvedLabel(label.to_string())),
            None => Ok(()),
        }
    }

    /// First `Continue` (in pre-order) whose label names no enclosing scope
    pub fn unresolved_label(&self) -> Option<&str> {
        let mut scopes = Vec::new();
        self.find_unresolved(&mut scopes)
    }

    fn find_unresolved<'a>(&'a self, scopes: &mut Vec<&'a str>) -> Option<&'a str> {
        match self {
            Node::Continue { label } => {
                let bound = scopes.iter().rev().any(|s| *s == label.as_str());
                (!bound).then_some(label.as_str())
            }
            Node::Recursion { label: scope, body } | Node::For { var: scope, body, .. } => {
                scopes.push(scope);
                let found = body.iter().find_map(|n| n.find_unresolved(scopes));
                scopes.pop();
                found
            }
            _ => self.children().find_map(|n| n.find_unresolved(scopes)),
        }
    }

    /// Full well-formedness check against a role registry.
    pub(crate) fn validate(&self, roles: &IndexMap<String, Role>) -> Result<(), ValidationError> {
        self.check_labels()?;
        self.validate_roles(roles)
    }

    fn validate_roles(&self, roles: &IndexMap<String, Role>) -> Result<(), ValidationError> {
        match self {
            Node::Interaction(i) | Node::Send(i) | Node::Recv(i) => validate_interaction(i, roles),
            Node::Choice { at, branches } => {
                validate_role(at, roles)?;
                branches.iter().try_for_each(|b| b.validate_roles(roles))
            }
            Node::Nested { roles: args, .. } => {
                args.iter().try_for_each(|r| validate_role(r, roles))
            }
            Node::Interruptible { body, interrupts, .. } => {
                for interrupt in interrupts {
                    validate_role(&interrupt.by, roles)?;
                    interrupt
                        .body
                        .iter()
                        .try_for_each(|n| n.validate_roles(roles))?;
                }
                body.iter().try_for_each(|n| n.validate_roles(roles))
            }
            _ => self.children().try_for_each(|n| n.validate_roles(roles)),
        }
    }
}

fn validate_interaction(
    interaction: &Interaction,
    roles: &IndexMap<String, Role>,
) -> Result<(), ValidationError> {
    if interaction.receivers.is_empty() {
        return Err(ValidationError::EmptyReceivers(
            interaction.message.to_string(),
        ));
    }
    if let Some(sender) = &interaction.sender {
        validate_role(sender, roles)?;
    }
    interaction
        .receivers
        .iter()
        .try_for_each(|r| validate_role(r, roles))
}

fn validate_role(role: &Role, roles: &IndexMap<String, Role>) -> Result<(), ValidationError> {
    let declared = roles
        .get(role.name())
        .ok_or_else(|| ValidationError::UndefinedRole(role.name().to_string()))?;
    if declared.num_dimens() != role.num_dimens() {
        return Err(ValidationError::DimensionMismatch {
            role: role.name().to_string(),
            declared: declared.num_dimens(),
            found: role.num_dimens(),
        });
    }
    Ok(())
}
