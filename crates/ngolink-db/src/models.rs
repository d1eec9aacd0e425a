//! Row types map directly to SQLite rows and are converted into the
//! `ngolink-types` documents before leaving this crate.

use anyhow::{Result, anyhow};
use uuid::Uuid;

use ngolink_types::models::{Message, Ngo, NgoStatus, Requirement, RequirementStatus, Role, User};

use crate::parse_timestamp;

pub(crate) const USER_COLUMNS: &str =
    "email, password, role, status, name, bio, contact, profile_picture, created_at";

pub(crate) const NGO_COLUMNS: &str = "email, name, city, full_address, category, registration_id, \
     contact, password, status, approved_by, approved_at, created_at";

pub(crate) const REQUIREMENT_COLUMNS: &str = "id, ngo_email, item, quantity, description, status, \
     rejection_reason, reviewed_at, created_at, updated_at";

pub(crate) const MESSAGE_COLUMNS: &str = "id, from_email, to_email, body, created_at";

pub struct UserRow {
    pub email: String,
    pub password: String,
    pub role: String,
    pub status: Option<String>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub contact: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub(crate) fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            email: row.get(0)?,
            password: row.get(1)?,
            role: row.get(2)?,
            status: row.get(3)?,
            name: row.get(4)?,
            bio: row.get(5)?,
            contact: row.get(6)?,
            profile_picture: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| anyhow!("Corrupt role '{}' on user '{}'", row.role, row.email))?;
        let status = match row.status.as_deref() {
            None => None,
            Some(s) => Some(
                NgoStatus::parse(s)
                    .ok_or_else(|| anyhow!("Corrupt status '{}' on user '{}'", s, row.email))?,
            ),
        };
        Ok(User {
            created_at: parse_timestamp(&row.created_at)?,
            email: row.email,
            password: row.password,
            role,
            status,
            name: row.name,
            bio: row.bio,
            contact: row.contact,
            profile_picture: row.profile_picture,
        })
    }
}

pub struct NgoRow {
    pub email: String,
    pub name: String,
    pub city: String,
    pub full_address: String,
    pub category: String,
    pub registration_id: String,
    pub contact: String,
    pub password: String,
    pub status: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub created_at: String,
}

impl NgoRow {
    pub(crate) fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            email: row.get(0)?,
            name: row.get(1)?,
            city: row.get(2)?,
            full_address: row.get(3)?,
            category: row.get(4)?,
            registration_id: row.get(5)?,
            contact: row.get(6)?,
            password: row.get(7)?,
            status: row.get(8)?,
            approved_by: row.get(9)?,
            approved_at: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl TryFrom<NgoRow> for Ngo {
    type Error = anyhow::Error;

    fn try_from(row: NgoRow) -> Result<Self> {
        let status = NgoStatus::parse(&row.status)
            .ok_or_else(|| anyhow!("Corrupt status '{}' on NGO '{}'", row.status, row.email))?;
        Ok(Ngo {
            approved_at: row.approved_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&row.created_at)?,
            email: row.email,
            name: row.name,
            city: row.city,
            full_address: row.full_address,
            category: row.category,
            registration_id: row.registration_id,
            contact: row.contact,
            password: row.password,
            status,
            approved_by: row.approved_by,
        })
    }
}

pub struct RequirementRow {
    pub id: String,
    pub ngo_email: String,
    pub item: String,
    pub quantity: i64,
    pub description: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl RequirementRow {
    pub(crate) fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            ngo_email: row.get(1)?,
            item: row.get(2)?,
            quantity: row.get(3)?,
            description: row.get(4)?,
            status: row.get(5)?,
            rejection_reason: row.get(6)?,
            reviewed_at: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl TryFrom<RequirementRow> for Requirement {
    type Error = anyhow::Error;

    fn try_from(row: RequirementRow) -> Result<Self> {
        let id: Uuid = row
            .id
            .parse()
            .map_err(|e| anyhow!("Corrupt requirement id '{}': {}", row.id, e))?;
        let status = RequirementStatus::parse(&row.status)
            .ok_or_else(|| anyhow!("Corrupt status '{}' on requirement '{}'", row.status, row.id))?;
        Ok(Requirement {
            id,
            reviewed_at: row.reviewed_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: row.updated_at.as_deref().map(parse_timestamp).transpose()?,
            ngo_email: row.ngo_email,
            item: row.item,
            quantity: row.quantity,
            description: row.description,
            status,
            rejection_reason: row.rejection_reason,
        })
    }
}

pub struct MessageRow {
    pub id: String,
    pub from_email: String,
    pub to_email: String,
    pub body: String,
    pub created_at: String,
}

impl MessageRow {
    pub(crate) fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            from_email: row.get(1)?,
            to_email: row.get(2)?,
            body: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Message {
            id: row
                .id
                .parse()
                .map_err(|e| anyhow!("Corrupt message id '{}': {}", row.id, e))?,
            created_at: parse_timestamp(&row.created_at)?,
            from: row.from_email,
            to: row.to_email,
            message: row.body,
        })
    }
}

// -- Write inputs --

/// A validated NGO registration. `password` is already in stored form.
#[derive(Debug, Clone)]
pub struct NewNgo {
    pub email: String,
    pub name: String,
    pub city: String,
    pub full_address: String,
    pub category: String,
    pub registration_id: String,
    pub contact: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NewRequirement {
    pub ngo_email: String,
    pub item: String,
    pub quantity: i64,
    pub description: String,
}

/// Partial profile merge: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub contact: Option<String>,
    pub profile_picture: Option<String>,
}
