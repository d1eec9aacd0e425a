use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

use ngolink_db::{Database, NewNgo, NgoBatch, ProfileUpdate};
use ngolink_types::api::{
    Ack, ApproveNgoRequest, BatchError, BatchRegistrationResponse, LegacyLoginResponse, LegacyUser,
    LoginRequest, LoginResponse, NgoRegistration, ProfileUpdatedResponse, RegisterManyNgosRequest,
    RegisterRequest, UpdateProfileRequest,
};
use ngolink_types::models::{Role, User};

use crate::credentials::CredentialStrategy;
use crate::error::{ApiError, non_empty, require};
use crate::state::{AppState, run_blocking};

const NGO_FIELDS_REQUIRED: &str = "All NGO fields are required: name, city, fullAddress, \
     category, registrationId, contact, email, password";

/// Result of a batch registration: how many NGOs were written and which
/// entries were turned away.
#[derive(Debug)]
pub struct BatchOutcome {
    pub registered: usize,
    pub errors: Vec<BatchError>,
}

/// User and NGO identities, keyed by email.
pub struct AccountService {
    db: Arc<Database>,
    credentials: Arc<dyn CredentialStrategy>,
}

impl AccountService {
    pub fn new(db: Arc<Database>, credentials: Arc<dyn CredentialStrategy>) -> Self {
        Self { db, credentials }
    }

    pub fn register_user(&self, req: RegisterRequest) -> Result<(), ApiError> {
        let email = require(req.email, "email")?;
        let password = require(req.password, "password")?;
        let stored = self.credentials.store(&password)?;

        if !self
            .db
            .create_user(&email, &stored, Role::User, non_empty(req.name).as_deref())?
        {
            warn!("Registration refused, {} already exists", email);
            return Err(ApiError::Conflict("User already exists".into()));
        }

        info!("User {} registered", email);
        Ok(())
    }

    /// Creates the NGO (pending) and its mirrored `ngo` user together.
    pub fn register_ngo(&self, reg: NgoRegistration) -> Result<(), ApiError> {
        let ngo = self.validate_ngo(reg)?;
        if !self.db.create_ngo(&ngo)? {
            warn!("NGO registration refused, {} already exists", ngo.email);
            return Err(ApiError::Conflict("NGO with this email already exists".into()));
        }

        info!("NGO {} registered, awaiting approval", ngo.email);
        Ok(())
    }

    /// Validates and checks each entry on its own, then commits every accepted
    /// entry in one batch. Rejected entries are reported, not fatal.
    ///
    /// The existence checks run before the commit. Two requests racing on the
    /// same email can both pass the check; the later commit then fails as a
    /// whole with a store error.
    pub fn register_ngos_batch(
        &self,
        entries: Option<Vec<NgoRegistration>>,
    ) -> Result<BatchOutcome, ApiError> {
        let entries = entries
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ApiError::InvalidInput("ngos must be a non-empty array".into()))?;

        let mut batch = NgoBatch::new();
        let mut errors = Vec::new();

        for entry in entries {
            let email = non_empty(entry.email.clone());
            let ngo = match self.validate_ngo(entry) {
                Ok(ngo) => ngo,
                Err(e) => {
                    errors.push(BatchError {
                        email,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if batch.contains(&ngo.email) || self.db.email_taken(&ngo.email)? {
                errors.push(BatchError {
                    email,
                    error: "NGO with this email already exists".into(),
                });
                continue;
            }

            batch.stage(ngo);
        }

        let registered = self.db.commit_ngo_batch(batch)?;
        info!(
            "Batch registration: {} NGOs written, {} entries rejected",
            registered,
            errors.len()
        );
        Ok(BatchOutcome { registered, errors })
    }

    fn validate_ngo(&self, reg: NgoRegistration) -> Result<NewNgo, ApiError> {
        let missing = || ApiError::InvalidInput(NGO_FIELDS_REQUIRED.into());
        let field = |v: Option<String>| non_empty(v).ok_or_else(missing);

        let password = field(reg.password)?;
        Ok(NewNgo {
            name: field(reg.name)?,
            city: field(reg.city)?,
            full_address: field(reg.full_address)?,
            category: field(reg.category)?,
            registration_id: field(reg.registration_id)?,
            contact: field(reg.contact)?,
            email: field(reg.email)?,
            password: self.credentials.store(&password)?,
        })
    }

    /// Unknown email, then pending NGO, then wrong password.
    pub fn login(&self, req: LoginRequest) -> Result<User, ApiError> {
        let email = require(req.email, "email")?;
        let user = self
            .db
            .get_user(&email)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        if !user.may_log_in() {
            warn!("Login refused for {}, NGO not approved", email);
            return Err(ApiError::Forbidden(
                "NGO account is pending admin approval".into(),
            ));
        }

        let password = require(req.password, "password")?;
        if !self.credentials.verify(&password, &user.password) {
            warn!("Login failed for {}, wrong password", email);
            return Err(ApiError::InvalidCredentials);
        }

        info!("User {} logged in", email);
        Ok(user)
    }

    pub fn get_profile(&self, email: &str) -> Result<User, ApiError> {
        self.db
            .get_user(email)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))
    }

    /// Only the fields present in the request are overwritten.
    pub fn update_profile(&self, email: &str, req: UpdateProfileRequest) -> Result<User, ApiError> {
        let update = ProfileUpdate {
            name: req.name,
            bio: req.bio,
            contact: req.contact,
            profile_picture: req.profile_picture,
        };
        self.db
            .update_user_profile(email, &update)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))
    }

    /// Approving an approved NGO is a no-op success.
    pub fn approve_ngo(&self, req: ApproveNgoRequest) -> Result<(), ApiError> {
        let email = require(req.ngo_email, "ngoEmail")?;
        let approved_by = non_empty(req.approved_by);

        if !self.db.approve_ngo(&email, approved_by.as_deref())? {
            return Err(ApiError::NotFound("NGO not found".into()));
        }

        info!(
            "NGO {} approved by {}",
            email,
            approved_by.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }
}

// -- Handlers --

/// POST /register and /registerUser
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| s.accounts.register_user(req)).await?;
    Ok((
        StatusCode::CREATED,
        Json(Ack::new("User registered successfully")),
    ))
}

/// POST /login. Compact user shape kept for older clients.
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| s.accounts.login(req)).await?;
    Ok(Json(LegacyLoginResponse {
        message: "Login successful".into(),
        user: LegacyUser {
            id: user.email.clone(),
            email: user.email,
            name: user.name,
        },
    }))
}

/// POST /loginUser. Returns the full profile.
pub async fn login_user(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| s.accounts.login(req)).await?;
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        user,
    }))
}

pub async fn register_ngo(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<NgoRegistration>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| s.accounts.register_ngo(req)).await?;
    Ok((
        StatusCode::CREATED,
        Json(Ack::new(
            "NGO registered successfully. Awaiting admin approval.",
        )),
    ))
}

pub async fn register_many_ngos(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterManyNgosRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = run_blocking(&state, move |s| s.accounts.register_ngos_batch(req.ngos)).await?;
    Ok(Json(BatchRegistrationResponse {
        message: format!("{} NGOs registered", outcome.registered),
        registered: outcome.registered,
        errors: outcome.errors,
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| s.accounts.get_profile(&email)).await?;
    Ok(Json(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(email): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateProfileRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| s.accounts.update_profile(&email, req)).await?;
    Ok(Json(ProfileUpdatedResponse {
        message: "Profile updated".into(),
        user,
    }))
}

pub async fn approve_ngo(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<ApproveNgoRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| s.accounts.approve_ngo(req)).await?;
    Ok(Json(Ack::new("NGO approved")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Argon2Hashed, Plaintext};
    use ngolink_types::models::NgoStatus;

    fn service() -> AccountService {
        AccountService::new(Arc::new(Database::open_in_memory().unwrap()), Arc::new(Plaintext))
    }

    fn registration(email: &str) -> NgoRegistration {
        NgoRegistration {
            name: Some("Food Bank".into()),
            city: Some("Pune".into()),
            full_address: Some("1 Main St".into()),
            category: Some("food".into()),
            registration_id: Some("REG-9".into()),
            contact: Some("555-0100".into()),
            email: Some(email.into()),
            password: Some("p".into()),
        }
    }

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.into()),
            password: Some(password.into()),
            name: None,
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn approve_req(email: &str) -> ApproveNgoRequest {
        ApproveNgoRequest {
            ngo_email: Some(email.into()),
            approved_by: Some("admin@x.com".into()),
        }
    }

    #[test]
    fn test_duplicate_registration_conflicts_across_routes() {
        let svc = service();
        svc.register_user(register_req("a@x.com", "p")).unwrap();
        assert!(matches!(
            svc.register_user(register_req("a@x.com", "q")),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            svc.register_ngo(registration("a@x.com")),
            Err(ApiError::Conflict(_))
        ));

        svc.register_ngo(registration("n@x.com")).unwrap();
        assert!(matches!(
            svc.register_ngo(registration("n@x.com")),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            svc.register_user(register_req("n@x.com", "p")),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn test_register_requires_fields() {
        let svc = service();
        assert!(matches!(
            svc.register_user(RegisterRequest::default()),
            Err(ApiError::InvalidInput(_))
        ));

        let mut reg = registration("n@x.com");
        reg.registration_id = None;
        assert!(matches!(svc.register_ngo(reg), Err(ApiError::InvalidInput(_))));

        let mut reg = registration("n@x.com");
        reg.city = Some(String::new());
        assert!(matches!(svc.register_ngo(reg), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_login_rules() {
        let svc = service();
        svc.register_user(register_req("u@x.com", "p")).unwrap();
        svc.register_ngo(registration("a@x.com")).unwrap();

        assert!(matches!(
            svc.login(login_req("ghost@x.com", "p")),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            svc.login(LoginRequest {
                email: Some("ghost@x.com".into()),
                password: None,
            }),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            svc.login(login_req("ghost@x.com", "")),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            svc.login(login_req("u@x.com", "")),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.login(login_req("u@x.com", "wrong")),
            Err(ApiError::InvalidCredentials)
        ));
        assert_eq!(svc.login(login_req("u@x.com", "p")).unwrap().email, "u@x.com");

        // Pending NGO is refused even with the right password.
        assert!(matches!(
            svc.login(login_req("a@x.com", "p")),
            Err(ApiError::Forbidden(_))
        ));

        svc.approve_ngo(approve_req("a@x.com")).unwrap();
        let user = svc.login(login_req("a@x.com", "p")).unwrap();
        assert_eq!(user.role, Role::Ngo);
        assert_eq!(user.status, Some(NgoStatus::Approved));
        assert!(matches!(
            svc.login(login_req("a@x.com", "P")),
            Err(ApiError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_approve_ngo_twice_is_idempotent() {
        let svc = service();
        svc.register_ngo(registration("a@x.com")).unwrap();
        svc.approve_ngo(approve_req("a@x.com")).unwrap();
        svc.approve_ngo(approve_req("a@x.com")).unwrap();
        assert_eq!(
            svc.get_profile("a@x.com").unwrap().status,
            Some(NgoStatus::Approved)
        );

        assert!(matches!(
            svc.approve_ngo(approve_req("ghost@x.com")),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            svc.approve_ngo(ApproveNgoRequest::default()),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_batch_collects_per_entry_errors() {
        let svc = service();
        let mut broken = registration("b@x.com");
        broken.contact = None;

        let outcome = svc
            .register_ngos_batch(Some(vec![registration("a@x.com"), broken]))
            .unwrap();
        assert_eq!(outcome.registered, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].email.as_deref(), Some("b@x.com"));
        assert!(svc.db.get_ngo("a@x.com").unwrap().is_some());
        assert!(svc.db.get_ngo("b@x.com").unwrap().is_none());
    }

    #[test]
    fn test_batch_rejects_existing_and_repeated_emails() {
        let svc = service();
        svc.register_user(register_req("taken@x.com", "p")).unwrap();

        let outcome = svc
            .register_ngos_batch(Some(vec![
                registration("taken@x.com"),
                registration("new@x.com"),
                registration("new@x.com"),
            ]))
            .unwrap();
        assert_eq!(outcome.registered, 1);
        let rejected: Vec<_> = outcome.errors.iter().filter_map(|e| e.email.as_deref()).collect();
        assert_eq!(rejected, vec!["taken@x.com", "new@x.com"]);
    }

    #[test]
    fn test_batch_requires_entries() {
        let svc = service();
        assert!(matches!(svc.register_ngos_batch(None), Err(ApiError::InvalidInput(_))));
        assert!(matches!(
            svc.register_ngos_batch(Some(vec![])),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_profile_get_and_partial_update() {
        let svc = service();
        svc.register_user(RegisterRequest {
            name: Some("Asha".into()),
            ..register_req("a@x.com", "p")
        })
        .unwrap();

        let user = svc
            .update_profile(
                "a@x.com",
                UpdateProfileRequest {
                    bio: Some("volunteer".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(user.name.as_deref(), Some("Asha"));
        assert_eq!(user.bio.as_deref(), Some("volunteer"));

        assert!(matches!(svc.get_profile("ghost@x.com"), Err(ApiError::NotFound(_))));
        assert!(matches!(
            svc.update_profile("ghost@x.com", UpdateProfileRequest::default()),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_hashed_strategy_keeps_contract() {
        let svc = AccountService::new(
            Arc::new(Database::open_in_memory().unwrap()),
            Arc::new(Argon2Hashed),
        );
        svc.register_user(register_req("a@x.com", "p")).unwrap();
        assert_ne!(svc.db.get_user("a@x.com").unwrap().unwrap().password, "p");
        assert!(svc.login(login_req("a@x.com", "p")).is_ok());
        assert!(matches!(
            svc.login(login_req("a@x.com", "q")),
            Err(ApiError::InvalidCredentials)
        ));
    }
}
