//! Users and roles.
//!
//! Roles form a strict hierarchy:
//! - `superadmin` - full control over every lead and comment
//! - `admin` - manages own comments and those of subadmins
//! - `subadmin` - manages own comments only

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A dashboard role, as carried in `userRole` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Admin,
    SubAdmin,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "superadmin",
            Role::Admin => "admin",
            Role::SubAdmin => "subadmin",
        }
    }

    /// Superadmins and admins moderate the stream (pin, mark important).
    pub fn is_moderator(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "superadmin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "subadmin" => Ok(Role::SubAdmin),
            "" => Err(RoleParseError::Empty),
            _ => Err(RoleParseError::Unknown(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = RoleParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Error parsing a role string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleParseError {
    #[error("unknown role: {0}")]
    Unknown(String),
    #[error("role cannot be empty")]
    Empty,
}

/// The user viewing the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }
}

/// Author stamp on an activity (`createdBy`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    /// `None` when the server sends a role this client does not know.
    #[serde(
        default,
        deserialize_with = "lenient_role",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_role: Option<Role>,
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| s.parse().ok()))
}

/// A lightweight user reference (mentions, editors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
}
