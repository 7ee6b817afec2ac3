/// Inbound chat bridge
///
/// A room listener posts every chat line here; lines that are commands get
/// validated and dispatched, everything else is ignored.

use crate::api::workflows::AppState;
use crate::trigger::CommandOutcome;
use axum::{extract::State, response::Json, routing::post, Router};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub room: String,
    pub sender: String,
    pub body: String,
}

pub fn create_command_routes() -> Router<AppState> {
    Router::new().route("/api/commands", post(handle_message))
}

/// POST /api/commands
/// Body: { "room": "!abc:example.org", "sender": "@ann:example.org", "body": "!echo hi" }
async fn handle_message(
    State(state): State<AppState>,
    Json(message): Json<InboundMessage>,
) -> Json<CommandOutcome> {
    tracing::debug!("📨 Chat line from {} in {}", message.sender, message.room);
    Json(
        state
            .commands
            .handle(&message.room, &message.sender, &message.body)
            .await,
    )
}
