//! Request and response bodies of the HTTP surface.
//!
//! Request fields are all optional at the serde level. Presence is checked by
//! the services so that a missing field produces a JSON `InvalidInput` error
//! instead of an extractor rejection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Requirement, User};

// -- Accounts --

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Shape returned by the legacy `/login` route.
#[derive(Debug, Serialize)]
pub struct LegacyLoginResponse {
    pub message: String,
    pub user: LegacyUser,
}

#[derive(Debug, Serialize)]
pub struct LegacyUser {
    /// Users are keyed by email, so the email doubles as the id.
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub contact: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdatedResponse {
    pub message: String,
    pub user: User,
}

// -- NGO onboarding --

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoRegistration {
    pub name: Option<String>,
    pub city: Option<String>,
    pub full_address: Option<String>,
    pub category: Option<String>,
    pub registration_id: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterManyNgosRequest {
    pub ngos: Option<Vec<NgoRegistration>>,
}

/// One rejected entry of a batch registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchError {
    pub email: Option<String>,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BatchRegistrationResponse {
    pub message: String,
    pub registered: usize,
    pub errors: Vec<BatchError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveNgoRequest {
    pub ngo_email: Option<String>,
    pub approved_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchNgosQuery {
    pub city: Option<String>,
    pub name: Option<String>,
}

// -- Requirements --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequirementRequest {
    pub ngo_email: Option<String>,
    pub item: Option<String>,
    pub quantity: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequirementRequest {
    pub item: Option<String>,
    pub quantity: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequirementUpdatedResponse {
    pub message: String,
    pub requirement: Requirement,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequirementRequest {
    pub requirement_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequirementRequest {
    pub requirement_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequirementsQuery {
    pub item: Option<String>,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationQuery {
    pub user: Option<String>,
}

// -- Generic --

#[derive(Debug, Serialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Returned when a document with a generated id was created.
#[derive(Debug, Serialize)]
pub struct Created {
    pub message: String,
    pub id: Uuid,
}
