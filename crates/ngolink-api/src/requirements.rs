use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};
use uuid::Uuid;

use ngolink_db::{Database, NewRequirement};
use ngolink_types::api::{
    Ack, ApproveRequirementRequest, Created, PostRequirementRequest, RejectRequirementRequest,
    RequirementUpdatedResponse, SearchRequirementsQuery, UpdateRequirementRequest,
};
use ngolink_types::models::{Requirement, RequirementStatus};

use crate::error::{ApiError, non_empty, require};
use crate::state::{AppState, run_blocking};

const DEFAULT_REJECTION_REASON: &str = "Not specified";

/// Requirements posted by NGOs and their moderation.
pub struct RequirementService {
    db: Arc<Database>,
}

impl RequirementService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// New requirements always start pending.
    pub fn post(&self, req: PostRequirementRequest) -> Result<Requirement, ApiError> {
        let new = NewRequirement {
            ngo_email: require(req.ngo_email, "ngoEmail")?,
            item: require(req.item, "item")?,
            quantity: req
                .quantity
                .ok_or_else(|| ApiError::InvalidInput("quantity is required".into()))?,
            description: req.description.unwrap_or_default(),
        };

        let requirement = self.db.insert_requirement(&new)?;
        info!(
            "Requirement {} posted by {}",
            requirement.id, requirement.ngo_email
        );
        Ok(requirement)
    }

    pub fn list_by_status(
        &self,
        ngo_email: &str,
        status: RequirementStatus,
    ) -> Result<Vec<Requirement>, ApiError> {
        Ok(self.db.list_requirements(Some(ngo_email), status)?)
    }

    /// Pending requirements of every NGO, for the moderation queue.
    pub fn list_pending(&self) -> Result<Vec<Requirement>, ApiError> {
        Ok(self.db.list_requirements(None, RequirementStatus::Pending)?)
    }

    /// Only approved requirements can be edited; the edit keeps them approved.
    /// The caller is not checked against the owning NGO.
    pub fn update(&self, id: &str, req: UpdateRequirementRequest) -> Result<Requirement, ApiError> {
        let id = parse_id(id)?;
        let current = self.db.get_requirement(&id)?.ok_or_else(not_found)?;

        if current.status != RequirementStatus::Approved {
            warn!(
                "Edit refused for requirement {} in status {}",
                id,
                current.status.as_str()
            );
            return Err(ApiError::InvalidState(
                "Only approved requirements can be updated".into(),
            ));
        }

        let item = require(req.item, "item")?;
        let quantity = req
            .quantity
            .ok_or_else(|| ApiError::InvalidInput("quantity is required".into()))?;
        let description = req.description.unwrap_or_default();

        // The write checks the status again in the same statement.
        self.db
            .update_requirement_fields(&id, &item, quantity, &description)?
            .ok_or_else(|| {
                warn!("Edit refused for requirement {}, no longer approved", id);
                ApiError::InvalidState("Only approved requirements can be updated".into())
            })
    }

    /// Sets the status whatever the current one is.
    pub fn approve(&self, id: Option<String>) -> Result<(), ApiError> {
        let id = parse_id(&require(id, "requirementId")?)?;
        if !self.db.approve_requirement(&id)? {
            return Err(not_found());
        }
        info!("Requirement {} approved", id);
        Ok(())
    }

    pub fn reject(&self, id: Option<String>, reason: Option<String>) -> Result<(), ApiError> {
        let id = parse_id(&require(id, "requirementId")?)?;
        let reason = non_empty(reason).unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
        if !self.db.reject_requirement(&id, &reason)? {
            return Err(not_found());
        }
        info!("Requirement {} rejected: {}", id, reason);
        Ok(())
    }

    /// Approved requirements whose item contains `item`, ignoring case.
    /// Filtering happens in memory over every approved requirement.
    pub fn search(&self, item: Option<&str>) -> Result<Vec<Requirement>, ApiError> {
        let approved = self.db.list_requirements(None, RequirementStatus::Approved)?;
        let Some(needle) = item.filter(|q| !q.is_empty()).map(str::to_lowercase) else {
            return Ok(approved);
        };
        Ok(approved
            .into_iter()
            .filter(|r| r.item.to_lowercase().contains(&needle))
            .collect())
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Requirement not found".into())
}

/// Ids are generated UUIDs; anything else cannot name a stored requirement.
fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    id.parse().map_err(|_| not_found())
}

// -- Handlers --

pub async fn post_requirement(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<PostRequirementRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let requirement = run_blocking(&state, move |s| s.requirements.post(req)).await?;
    Ok((
        StatusCode::CREATED,
        Json(Created {
            message: "Requirement posted and awaiting approval".into(),
            id: requirement.id,
        }),
    ))
}

async fn list_for(
    state: AppState,
    ngo_email: String,
    status: RequirementStatus,
) -> Result<Json<Vec<Requirement>>, ApiError> {
    let list = run_blocking(&state, move |s| {
        s.requirements.list_by_status(&ngo_email, status)
    })
    .await?;
    Ok(Json(list))
}

pub async fn approved_requirements(
    State(state): State<AppState>,
    Path(ngo_email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    list_for(state, ngo_email, RequirementStatus::Approved).await
}

pub async fn pending_requirements(
    State(state): State<AppState>,
    Path(ngo_email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    list_for(state, ngo_email, RequirementStatus::Pending).await
}

pub async fn rejected_requirements(
    State(state): State<AppState>,
    Path(ngo_email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    list_for(state, ngo_email, RequirementStatus::Rejected).await
}

pub async fn update_requirement(
    State(state): State<AppState>,
    Path(requirement_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateRequirementRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let requirement =
        run_blocking(&state, move |s| s.requirements.update(&requirement_id, req)).await?;
    Ok(Json(RequirementUpdatedResponse {
        message: "Requirement updated".into(),
        requirement,
    }))
}

pub async fn search_requirements(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SearchRequirementsQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let results =
        run_blocking(&state, move |s| s.requirements.search(query.item.as_deref())).await?;
    Ok(Json(results))
}

pub async fn admin_pending_requirements(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let pending = run_blocking(&state, |s| s.requirements.list_pending()).await?;
    Ok(Json(pending))
}

pub async fn approve_requirement(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<ApproveRequirementRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| s.requirements.approve(req.requirement_id)).await?;
    Ok(Json(Ack::new("Requirement approved")))
}

pub async fn reject_requirement(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RejectRequirementRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| {
        s.requirements.reject(req.requirement_id, req.reason)
    })
    .await?;
    Ok(Json(Ack::new("Requirement rejected")))
}
