/// Bot record endpoints
///
/// Bots are logged in once at startup, so saved changes only take effect
/// after a restart. The listing shows which stored bots are connected now.

use crate::api::workflows::AppState;
use crate::workflow::Bot;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
struct BotView {
    #[serde(flatten)]
    bot: Bot,
    connected: bool,
}

pub fn create_bot_routes() -> Router<AppState> {
    Router::new().route("/api/bots", get(list_bots).post(save_bot))
}

/// GET /api/bots
async fn list_bots(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let bots = state.storage.list_bots().await.map_err(|e| {
        tracing::error!("Failed to list bots: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let bots: Vec<BotView> = bots
        .into_iter()
        .map(|bot| BotView {
            connected: state.bots.get_client(&bot.id).is_ok(),
            bot,
        })
        .collect();

    Ok(Json(json!({ "bots": bots })))
}

/// POST /api/bots
/// Body: { "id": "...", "display_name": "...", "user_id": "@bot:example.org", "password": "...", "primary": true }
async fn save_bot(State(state): State<AppState>, Json(bot): Json<Bot>) -> Result<Json<Value>, StatusCode> {
    if bot.id.trim().is_empty() || bot.user_id.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    if let Err(e) = state.storage.save_bot(&bot).await {
        tracing::error!("Failed to save bot {}: {}", bot.id, e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    tracing::info!("🤖 Saved bot {} ({}); applies on next restart", bot.id, bot.user_id);
    Ok(Json(json!({
        "id": bot.id,
        "message": "Bot saved; restart to connect it",
    })))
}
