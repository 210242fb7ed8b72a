//! Role definitions for session types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use super::{Expr, LookupError};

/// A role (participant) in a session
///
/// Roles can be simple (e.g., `Client`, `Server`) or parameterised with one
/// expression per dimension (e.g., `Worker[1..N]`, `Grid[i,j]`). The
/// dimension count is fixed by the role's declaration in its session.
///
/// # Examples
///
/// ```
/// use sesstype::ast::{Expr, Role};
///
/// let client = Role::new("Client");
/// let workers = Role::new("Worker").with_param(Expr::range(Expr::lit(1), Expr::var("N")));
///
/// assert_eq!(workers.num_dimens(), 1);
/// assert!(!client.matches(&workers));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    name: String,
    dimensions: Vec<Expr>,
}

impl Default for Role {
    fn default() -> Self {
        Role::new("default")
    }
}

impl Role {
    /// Create a new scalar role with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Role {
            name: name.into(),
            dimensions: Vec::new(),
        }
    }

    /// Builder form of [`Role::add_param`]
    #[must_use]
    pub fn with_param(mut self, param: Expr) -> Self {
        self.add_param(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Append a parameter as a new dimension
    pub fn add_param(&mut self, param: Expr) {
        self.dimensions.push(param);
    }

    pub fn num_dimens(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimensions(&self) -> &[Expr] {
        &self.dimensions
    }

    /// Parameter of dimension `idx`
    pub fn dimension(&self, idx: usize) -> Result<&Expr, LookupError> {
        self.dimensions
            .get(idx)
            .ok_or_else(|| LookupError::DimensionOutOfRange {
                role: self.name.clone(),
                index: idx,
                len: self.dimensions.len(),
            })
    }

    pub fn is_parameterised(&self) -> bool {
        !self.dimensions.is_empty()
    }

    /// Check if this role is, or is a member of, `other`
    ///
    /// Only names and dimension counts are compared: `Worker[3]` matches
    /// `Worker[1..N]` but not `Worker[i,j]`. Index values are not checked.
    pub fn matches(&self, other: &Role) -> bool {
        self.name == other.name && self.num_dimens() == other.num_dimens()
    }

    /// Same name and identical parameters, dimension by dimension
    pub fn is_identical(&self, other: &Role) -> bool {
        self.name == other.name
            && self.num_dimens() == other.num_dimens()
            && self
                .dimensions
                .iter()
                .zip(&other.dimensions)
                .all(|(a, b)| a.is_identical(b))
    }

    /// Whether the two references may denote the same endpoint
    ///
    /// Different names never alias. With equal names every dimension pair
    /// must overlap; mismatched dimension counts are assumed to overlap.
    pub fn overlaps(&self, other: &Role) -> bool {
        if self.name != other.name {
            return false;
        }
        if self.num_dimens() != other.num_dimens() {
            return true;
        }
        self.dimensions
            .iter()
            .zip(&other.dimensions)
            .all(|(a, b)| a.is_overlapped(b))
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for dim in &self.dimensions {
            write!(f, "[{dim}]")?;
        }
        Ok(())
    }
}

/// A named, statically known group of roles
///
/// Members are keyed by name and iterate in insertion order. Adding a role
/// whose name is already present replaces the earlier binding in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrp {
    name: String,
    members: IndexMap<String, Role>,
}

impl Default for RoleGrp {
    fn default() -> Self {
        RoleGrp::new("default_grp")
    }
}

impl RoleGrp {
    pub fn new(name: impl Into<String>) -> Self {
        RoleGrp {
            name: name.into(),
            members: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Add a member, returning the role it replaced if the name was taken
    pub fn add_member(&mut self, role: Role) -> Option<Role> {
        self.members.insert(role.name.clone(), role)
    }

    pub fn member(&self, name: &str) -> Result<&Role, LookupError> {
        self.members
            .get(name)
            .ok_or_else(|| LookupError::UnknownMember {
                group: self.name.clone(),
                name: name.to_string(),
            })
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn num_member(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> impl Iterator<Item = &Role> {
        self.members.values()
    }
}

impl<'a> IntoIterator for &'a RoleGrp {
    type Item = &'a Role;
    type IntoIter = indexmap::map::Values<'a, String, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.values()
    }
}
