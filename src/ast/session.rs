//! Session container: protocol body, participants and metadata

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{LookupError, Node, Role, RoleGrp, ValidationError};
use crate::compiler::projection::{project, ProjectionError};

/// Whether a session describes all participants or a single endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    #[default]
    Global,
    Local,
}

/// A protocol imported into a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub name: String,
    /// Local alias (`import P as Q`)
    pub alias: Option<String>,
    /// Source module (`from M import P`)
    pub from: Option<String>,
}

impl Import {
    pub fn new(name: impl Into<String>) -> Self {
        Import {
            name: name.into(),
            alias: None,
            from: None,
        }
    }
}

/// A complete session: root node, participants and metadata
///
/// Global sessions describe every participant; local sessions are the
/// projection onto their [`endpoint`](Session::endpoint).
///
/// # Examples
///
/// ```
/// use sesstype::ast::{MsgSig, Node, Role, Session, SessionKind};
///
/// let mut session = Session::new("PingPong");
/// session.add_role(Role::new("A"));
/// session.add_role(Role::new("B"));
/// session.set_root(Node::root(vec![
///     Node::interaction(Role::new("A"), [Role::new("B")], MsgSig::new("Ping")),
///     Node::interaction(Role::new("B"), [Role::new("A")], MsgSig::new("Pong")),
/// ]));
///
/// let local = session.project(&Role::new("A")).unwrap();
/// assert_eq!(local.kind(), SessionKind::Local);
/// assert_eq!(local.root().num_children(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    name: String,
    kind: SessionKind,
    endpoint: Option<Role>,
    root: Node,
    roles: IndexMap<String, Role>,
    groups: IndexMap<String, RoleGrp>,
    imports: Vec<Import>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new("default")
    }
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Session {
            name: name.into(),
            kind: SessionKind::Global,
            endpoint: None,
            root: Node::root(Vec::new()),
            roles: IndexMap::new(),
            groups: IndexMap::new(),
            imports: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Replace the session body, returning the previous one
    pub fn set_root(&mut self, root: Node) -> Node {
        std::mem::replace(&mut self.root, root)
    }

    pub fn endpoint(&self) -> Option<&Role> {
        self.endpoint.as_ref()
    }

    /// Localise the session to `endpoint`
    pub fn set_endpoint(&mut self, endpoint: Role) {
        self.endpoint = Some(endpoint);
        self.kind = SessionKind::Local;
    }

    /// Declare a participant; a role of the same name is replaced
    pub fn add_role(&mut self, role: Role) -> Option<Role> {
        self.roles.insert(role.name().to_string(), role)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    pub fn role(&self, name: &str) -> Result<&Role, LookupError> {
        self.roles
            .get(name)
            .ok_or_else(|| LookupError::UnknownRole(name.to_string()))
    }

    pub fn num_roles(&self) -> usize {
        self.roles.len()
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn add_group(&mut self, group: RoleGrp) -> Option<RoleGrp> {
        self.groups.insert(group.name().to_string(), group)
    }

    pub fn group(&self, name: &str) -> Result<&RoleGrp, LookupError> {
        self.groups
            .get(name)
            .ok_or_else(|| LookupError::UnknownGroup(name.to_string()))
    }

    pub fn groups(&self) -> impl Iterator<Item = &RoleGrp> {
        self.groups.values()
    }

    pub fn add_import(&mut self, import: Import) {
        self.imports.push(import);
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Check the body against the declared participants
    ///
    /// Every referenced role must be declared with the same number of
    /// dimensions, every interaction needs a receiver and every `Continue`
    /// must resolve to an enclosing scope.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.root.validate(&self.roles)
    }

    /// Project the session onto `role`
    ///
    /// The result is a local session sharing this session's name, roles,
    /// groups and imports, with `role` as its endpoint.
    pub fn project(&self, role: &Role) -> Result<Session, ProjectionError> {
        let root = project(&self.root, role)?;
        Ok(Session {
            name: self.name.clone(),
            kind: SessionKind::Local,
            endpoint: Some(role.clone()),
            root,
            roles: self.roles.clone(),
            groups: self.groups.clone(),
            imports: self.imports.clone(),
        })
    }
}
