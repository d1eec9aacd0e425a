use std::sync::Arc;

use tracing::error;

use ngolink_db::Database;

use crate::accounts::AccountService;
use crate::credentials::CredentialStrategy;
use crate::directory::NgoDirectory;
use crate::error::ApiError;
use crate::messages::MessagingService;
use crate::requirements::RequirementService;

pub type AppState = Arc<AppStateInner>;

/// Every service shares the one store handle built at start-up.
pub struct AppStateInner {
    pub accounts: AccountService,
    pub requirements: RequirementService,
    pub messaging: MessagingService,
    pub directory: NgoDirectory,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, credentials: Arc<dyn CredentialStrategy>) -> AppState {
        Arc::new(Self {
            accounts: AccountService::new(db.clone(), credentials),
            requirements: RequirementService::new(db.clone()),
            messaging: MessagingService::new(db.clone()),
            directory: NgoDirectory::new(db),
        })
    }
}

/// Run a service call off the async runtime; rusqlite calls block.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
}
