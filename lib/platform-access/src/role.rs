//! Role and permission types for dashboard access control.
//!
//! Every account carries exactly one role assigned by the backend. Views
//! declare the set of roles allowed to enter them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role as assigned by the backend.
///
/// The wire names are the backend's (`admin`, `operador`, `chofer`,
/// `usuario`). Anything else is not a role: profiles carrying an unknown
/// value end up with no role at all and are denied everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Platform administrator.
    #[serde(rename = "admin")]
    Admin,
    /// Registers and manages parcels.
    #[serde(rename = "operador")]
    Operator,
    /// Performs the final delivery of assigned parcels.
    #[serde(rename = "chofer")]
    Driver,
    /// End customer following their own parcels.
    #[serde(rename = "usuario")]
    Customer,
}

impl Role {
    /// All roles, in privilege order.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Operator, Role::Driver, Role::Customer];

    /// Returns the backend's name for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operador",
            Self::Driver => "chofer",
            Self::Customer => "usuario",
        }
    }

    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a role name the backend does not define.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Set of roles allowed on a view.
///
/// An empty set places no role restriction: any logged-in user passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    roles: Vec<Role>,
}

impl RoleSet {
    /// Creates an empty role set (no role restriction).
    #[must_use]
    pub fn none() -> Self {
        Self { roles: Vec::new() }
    }

    /// Creates a role set from a list of roles, dropping duplicates.
    #[must_use]
    pub fn of(roles: &[Role]) -> Self {
        roles.iter().copied().collect()
    }

    /// Returns true if no role restriction applies.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns true if the role is a member.
    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Returns true if a profile with this role may pass.
    ///
    /// A missing role only passes an unrestricted set.
    #[must_use]
    pub fn permits(&self, role: Option<Role>) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        role.is_some_and(|role| self.contains(role))
    }

    /// Returns the roles as a slice.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut roles = Vec::new();
        for role in iter {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        Self { roles }
    }
}
