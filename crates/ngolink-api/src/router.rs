use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use crate::state::AppState;
use crate::{accounts, directory, messages, requirements};

/// Every route of the service. All routes are open; there is no auth layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Accounts
        .route("/register", post(accounts::register))
        .route("/registerUser", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/loginUser", post(accounts::login_user))
        .route(
            "/user/{email}",
            get(accounts::get_profile).put(accounts::update_profile),
        )
        // NGO onboarding and directory
        .route("/registerNgo", post(accounts::register_ngo))
        .route("/registerManyNgos", post(accounts::register_many_ngos))
        .route("/searchNgos", get(directory::search_ngos))
        // Requirements
        .route("/ngo/postRequirement", post(requirements::post_requirement))
        .route(
            "/ngo/approvedRequirements/{ngo_email}",
            get(requirements::approved_requirements),
        )
        .route(
            "/ngo/pendingRequirements/{ngo_email}",
            get(requirements::pending_requirements),
        )
        .route(
            "/ngo/rejectedRequirements/{ngo_email}",
            get(requirements::rejected_requirements),
        )
        .route(
            "/ngo/updateRequirement/{requirement_id}",
            put(requirements::update_requirement),
        )
        .route("/searchRequirements", get(requirements::search_requirements))
        // Admin moderation
        .route("/admin/pendingNgos", get(directory::pending_ngos))
        .route(
            "/admin/pendingRequirements",
            get(requirements::admin_pending_requirements),
        )
        .route("/admin/approveNgo", post(accounts::approve_ngo))
        .route(
            "/admin/approveRequirement",
            post(requirements::approve_requirement),
        )
        .route(
            "/admin/rejectRequirement",
            post(requirements::reject_requirement),
        )
        // Messages
        .route("/messages", post(messages::send_message))
        .route("/messages/{with_user}", get(messages::get_conversation))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
