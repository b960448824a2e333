use serde::{Deserialize, Serialize};
use std::fmt;

/// Roles an account can hold.
///
/// Roles are independent tags rather than a ladder: only `Admin` widens
/// what the access policy allows, `Editor` is a plain authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Content editor.
    Editor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Editor => write!(f, "editor"),
        }
    }
}

impl Role {
    /// Parse a role from a string (case-insensitive).
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "editor" => Some(Role::Editor),
            _ => None,
        }
    }
}

/// An authenticated identity attempting an operation.
///
/// Anonymous callers are represented by the absence of an `Actor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable account identifier; articles reference it as their author.
    pub id: String,
    /// Account email address.
    pub email: String,
    /// Roles held by the account.
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_ci() {
        assert_eq!(Role::from_str_ci("Admin"), Some(Role::Admin));
        assert_eq!(Role::from_str_ci("EDITOR"), Some(Role::Editor));
        assert_eq!(Role::from_str_ci(" admin "), Some(Role::Admin));
        assert_eq!(Role::from_str_ci("superuser"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::Editor.to_string(), "editor");
    }

    #[test]
    fn test_is_admin() {
        let admin = Actor {
            id: "u-1".to_string(),
            email: "admin@example.com".to_string(),
            roles: vec![Role::Editor, Role::Admin],
        };
        let editor = Actor {
            id: "u-2".to_string(),
            email: "editor@example.com".to_string(),
            roles: vec![Role::Editor],
        };
        assert!(admin.is_admin());
        assert!(!editor.is_admin());
        assert!(editor.has_role(Role::Editor));
    }

    #[test]
    fn test_roles_serialize_lowercase() {
        let actor = Actor {
            id: "u-1".to_string(),
            email: "a@example.com".to_string(),
            roles: vec![Role::Admin],
        };
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["roles"][0], "admin");
        let back: Actor = serde_json::from_value(json).unwrap();
        assert_eq!(back, actor);
    }
}
