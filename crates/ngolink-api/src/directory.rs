use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use ngolink_db::Database;
use ngolink_types::api::SearchNgosQuery;
use ngolink_types::models::{Ngo, NgoStatus};

use crate::error::{ApiError, non_empty};
use crate::state::{AppState, run_blocking};

/// Read-only views over NGO documents.
pub struct NgoDirectory {
    db: Arc<Database>,
}

impl NgoDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Approved NGOs. `city` must match exactly; `name` is a case-insensitive
    /// substring applied after the store query.
    pub fn search(&self, city: Option<String>, name: Option<String>) -> Result<Vec<Ngo>, ApiError> {
        let city = non_empty(city);
        let ngos = self.db.list_ngos(NgoStatus::Approved, city.as_deref())?;

        let Some(needle) = non_empty(name).map(|n| n.to_lowercase()) else {
            return Ok(ngos);
        };
        Ok(ngos
            .into_iter()
            .filter(|n| n.name.to_lowercase().contains(&needle))
            .collect())
    }

    /// NGOs awaiting approval, oldest first.
    pub fn pending(&self) -> Result<Vec<Ngo>, ApiError> {
        Ok(self.db.list_ngos(NgoStatus::Pending, None)?)
    }
}

pub async fn search_ngos(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SearchNgosQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let ngos = run_blocking(&state, move |s| s.directory.search(query.city, query.name)).await?;
    Ok(Json(ngos))
}

pub async fn pending_ngos(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let ngos = run_blocking(&state, |s| s.directory.pending()).await?;
    Ok(Json(ngos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngolink_db::NewNgo;

    fn seed(db: &Database, email: &str, name: &str, city: &str, approve: bool) {
        db.create_ngo(&NewNgo {
            email: email.into(),
            name: name.into(),
            city: city.into(),
            full_address: "addr".into(),
            category: "education".into(),
            registration_id: "R".into(),
            contact: "1".into(),
            password: "p".into(),
        })
        .unwrap();
        if approve {
            db.approve_ngo(email, None).unwrap();
        }
    }

    fn directory() -> NgoDirectory {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed(&db, "a@x.com", "Helping Hands", "Pune", true);
        seed(&db, "b@x.com", "Hand in Hand", "Mumbai", true);
        seed(&db, "c@x.com", "Green Earth", "Pune", true);
        seed(&db, "d@x.com", "Handloom Co-op", "Pune", false);
        NgoDirectory::new(db)
    }

    fn emails(ngos: &[Ngo]) -> Vec<&str> {
        ngos.iter().map(|n| n.email.as_str()).collect()
    }

    #[test]
    fn test_search_only_returns_approved() {
        let dir = directory();
        assert_eq!(emails(&dir.search(None, None).unwrap()), vec!["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[test]
    fn test_search_by_city_and_name() {
        let dir = directory();
        let pune = dir.search(Some("Pune".into()), None).unwrap();
        assert_eq!(emails(&pune), vec!["a@x.com", "c@x.com"]);

        let hand = dir.search(None, Some("HAND".into())).unwrap();
        assert_eq!(emails(&hand), vec!["a@x.com", "b@x.com"]);

        let both = dir.search(Some("Pune".into()), Some("hand".into())).unwrap();
        assert_eq!(emails(&both), vec!["a@x.com"]);

        // City is an exact match, not a substring.
        assert!(dir.search(Some("pun".into()), None).unwrap().is_empty());
    }

    #[test]
    fn test_pending() {
        let dir = directory();
        assert_eq!(emails(&dir.pending().unwrap()), vec!["d@x.com"]);
    }
}
