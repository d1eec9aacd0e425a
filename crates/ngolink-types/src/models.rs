use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Enumerations --

/// What kind of identity a user document represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ngo,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ngo => "ngo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "ngo" => Some(Self::Ngo),
            _ => None,
        }
    }
}

/// NGO onboarding status. One-way: pending -> approved.
/// There is no rejected state for NGOs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NgoStatus {
    Pending,
    Approved,
}

impl NgoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }
}

/// Requirement moderation status: pending -> approved | rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequirementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

// -- Documents --

/// Identity document keyed by email.
///
/// `password` holds whatever the active credential strategy stored: the raw
/// password in plaintext mode, a PHC string in argon2 mode. It is never
/// serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    /// Only meaningful when `role` is `Ngo`.
    pub status: Option<NgoStatus>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub contact: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Users and approved NGOs may log in; pending NGOs may not.
    pub fn may_log_in(&self) -> bool {
        self.role != Role::Ngo || self.status == Some(NgoStatus::Approved)
    }
}

/// Organization document keyed by email, mirrored by a `User` with role `ngo`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ngo {
    pub email: String,
    pub name: String,
    pub city: String,
    pub full_address: String,
    pub category: String,
    pub registration_id: String,
    pub contact: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub status: NgoStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: Uuid,
    pub ngo_email: String,
    pub item: String,
    pub quantity: i64,
    pub description: String,
    pub status: RequirementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One directed message. Immutable once stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
