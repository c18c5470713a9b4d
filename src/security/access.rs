//! Roles, principals, and the owner-or-admin authorization gate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role carried by every user row and every session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity resolved from a verified session token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i32,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

#[derive(Debug, Error)]
#[error("principal is neither the resource owner nor an administrator")]
pub struct AccessDenied;

/// Owner-or-admin rule, applied before every operation that exposes or
/// mutates a user-owned resource.
pub const fn authorize(principal: &Principal, owner_id: i32) -> Result<(), AccessDenied> {
    if principal.is_admin() || principal.user_id == owner_id {
        Ok(())
    } else {
        Err(AccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_allowed() {
        let principal = Principal {
            user_id: 7,
            role: Role::User,
        };
        assert!(authorize(&principal, 7).is_ok());
    }

    #[test]
    fn test_admin_is_allowed_on_any_resource() {
        let principal = Principal {
            user_id: 1,
            role: Role::Admin,
        };
        assert!(authorize(&principal, 999).is_ok());
    }

    #[test]
    fn test_other_user_is_denied() {
        let principal = Principal {
            user_id: 7,
            role: Role::User,
        };
        assert!(authorize(&principal, 8).is_err());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("root"), None);
    }
}
