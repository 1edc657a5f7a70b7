use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A stored record. Every collection holds schemaless JSON objects keyed by `_id`.
pub type Document = serde_json::Map<String, serde_json::Value>;

// -- Roles --

/// Account class. The four roles are mutually exclusive: holding one never
/// implies the privileges of another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    ProUser,
    Surveyor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::ProUser, Role::Surveyor, Role::Admin];

    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::ProUser => "pro-user",
            Self::Surveyor => "surveyor",
            Self::Admin => "admin",
        }
    }

    /// Key used by the role-check endpoints, both as path segment and as the
    /// response field (`/users/prouser/{email}` -> `{"prouser": true}`).
    pub fn flag(self) -> &'static str {
        match self {
            Self::ProUser => "prouser",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

// -- Surveys --

/// Survey status. Transitions are not enforced: an admin may move a survey
/// from any status to any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    #[default]
    Pending,
    Published,
    Rejected,
    Closed,
}

impl SurveyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Rejected => "rejected",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SurveyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown survey status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for SurveyStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            "closed" => Ok(Self::Closed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    /// Documents written before roles existed read as plain users.
    #[serde(default)]
    pub role: Role,
    #[serde(flatten)]
    pub profile: Document,
}

// -- Ordering --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}
