//! User models and request scope

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Minimum role value of an administrator
pub const ROLE_ADMIN: i64 = 10;
/// Minimum role value of the root user
pub const ROLE_ROOT: i64 = 100;

/// Entry returned by the user typeahead (`/api/user/search`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
}

impl UserSummary {
    /// Display name, falling back to the username when unset
    pub fn display(&self) -> &str {
        if self.display_name.is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

/// User record from `/api/user/{id}` and `/api/user/self`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDetail {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role: i64,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub quota: i64,
    #[serde(default)]
    pub used_quota: i64,
    #[serde(default)]
    pub request_count: i64,
}

impl UserDetail {
    pub fn is_admin(&self) -> bool {
        self.role >= ROLE_ADMIN
    }

    pub fn is_root(&self) -> bool {
        self.role >= ROLE_ROOT
    }

    /// Log scope this user is allowed to browse
    pub fn scope(&self) -> Scope {
        Scope::for_role(self.role)
    }
}

/// Which half of the log API a request targets.
///
/// Admin requests may filter by username and channel across all users;
/// self requests are limited to the caller's own rows and never carry
/// those two parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Admin,
    #[default]
    #[serde(rename = "self")]
    SelfOnly,
}

impl Scope {
    pub fn for_role(role: i64) -> Self {
        if role >= ROLE_ADMIN {
            Scope::Admin
        } else {
            Scope::SelfOnly
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Scope::Admin)
    }

    /// Path of the paged log endpoint
    pub fn logs_path(self) -> &'static str {
        match self {
            Scope::Admin => "/api/log/",
            Scope::SelfOnly => "/api/log/self",
        }
    }

    /// Path of the aggregate statistics endpoint
    pub fn stat_path(self) -> &'static str {
        match self {
            Scope::Admin => "/api/log/stat",
            Scope::SelfOnly => "/api/log/self/stat",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Admin => f.write_str("admin"),
            Scope::SelfOnly => f.write_str("self"),
        }
    }
}

impl FromStr for Scope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" | "all" => Ok(Scope::Admin),
            "self" => Ok(Scope::SelfOnly),
            _ => Err(CoreError::InvalidScope(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_for_role() {
        assert_eq!(Scope::for_role(1), Scope::SelfOnly);
        assert_eq!(Scope::for_role(10), Scope::Admin);
        assert_eq!(Scope::for_role(100), Scope::Admin);
    }

    #[test]
    fn test_scope_paths() {
        assert_eq!(Scope::Admin.logs_path(), "/api/log/");
        assert_eq!(Scope::SelfOnly.logs_path(), "/api/log/self");
        assert_eq!(Scope::Admin.stat_path(), "/api/log/stat");
        assert_eq!(Scope::SelfOnly.stat_path(), "/api/log/self/stat");
    }

    #[test]
    fn test_display_name_fallback() {
        let user = UserSummary {
            id: 1,
            username: "root".into(),
            display_name: String::new(),
        };
        assert_eq!(user.display(), "root");
    }
}
