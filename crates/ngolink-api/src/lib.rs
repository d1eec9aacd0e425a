pub mod accounts;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod messages;
pub mod requirements;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::router;
pub use state::{AppState, AppStateInner};
