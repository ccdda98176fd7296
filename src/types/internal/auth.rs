use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege ladder. Derived ordering follows declaration order, so
/// `Viewer < Writer < Admin < Superuser` holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Writer,
    Admin,
    Superuser,
}

impl Role {
    /// Parse a role name as it appears on the wire and in the users table
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "viewer" => Some(Role::Viewer),
            "writer" => Some(Role::Writer),
            "admin" => Some(Role::Admin),
            "superuser" => Some(Role::Superuser),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Writer => "writer",
            Role::Admin => "admin",
            Role::Superuser => "superuser",
        }
    }

    /// Admin and superuser are equivalent for every admin-gated rule.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Superuser)
    }

    /// Writer and above may create/edit/delete resources.
    pub fn can_write(&self) -> bool {
        *self >= Role::Writer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Usergroup entry embedded in token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsergroupClaim {
    pub id: i32,
    pub label: String,
}

/// JWT claims: the registered fields plus a snapshot of the user's
/// authorization facts taken at login. The snapshot is used directly on
/// every request; role or membership changes take effect at next login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the username
    pub sub: String,
    /// Unique token id, the revocation key
    pub jti: String,
    /// Issued-at (Unix timestamp)
    pub iat: i64,
    /// Expiry (Unix timestamp)
    pub exp: i64,
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub usergroups: Vec<UsergroupClaim>,
}

impl Claims {
    /// Ids of every usergroup the token holder belonged to at login
    pub fn usergroup_ids(&self) -> Vec<i32> {
        self.usergroups.iter().map(|ug| ug.id).collect()
    }
}
