use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;

use ngolink_db::Database;
use ngolink_types::api::{ConversationQuery, Created, SendMessageRequest};
use ngolink_types::models::Message;

use crate::error::{ApiError, require};
use crate::state::{AppState, run_blocking};

/// Append-only direct messages. Sender and recipient are free-form
/// identities and are not checked against stored users.
pub struct MessagingService {
    db: Arc<Database>,
}

impl MessagingService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn send(&self, req: SendMessageRequest) -> Result<Message, ApiError> {
        let from = require(req.from, "from")?;
        let to = require(req.to, "to")?;
        let text = require(req.message, "message")?;

        let message = self.db.insert_message(&from, &to, &text)?;
        debug!("Message {} stored from {} to {}", message.id, from, to);
        Ok(message)
    }

    /// Messages whose sender and recipient both lie in `{a, b}`, oldest
    /// first. Each party's notes to self are part of the result.
    pub fn conversation(&self, a: &str, b: &str) -> Result<Vec<Message>, ApiError> {
        Ok(self.db.get_conversation(a, b)?)
    }
}

// -- Handlers --

pub async fn send_message(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let message = run_blocking(&state, move |s| s.messaging.send(req)).await?;
    Ok((
        StatusCode::CREATED,
        Json(Created {
            message: "Message sent".into(),
            id: message.id,
        }),
    ))
}

/// GET /messages/{with_user}?user=
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(with_user): Path<String>,
    WithRejection(Query(query), _): WithRejection<Query<ConversationQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require(query.user, "user")?;
    let messages =
        run_blocking(&state, move |s| s.messaging.conversation(&user, &with_user)).await?;
    Ok(Json(messages))
}
