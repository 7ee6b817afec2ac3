/// Webhook trigger endpoint
///
/// Any request to /webhook/{*path} fires every active workflow bound to that
/// path. The JSON body (if any) becomes the seed payload.

use crate::api::workflows::{parse_payload, AppState};
use crate::trigger::WorkflowSelector;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{any, Router},
};
use serde_json::{json, Value};

pub fn create_webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook/{*path}", any(execute_webhook))
}

/// Execute the workflows listening on a webhook path
///
/// POST/GET/PUT/DELETE /webhook/{path}
async fn execute_webhook(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: String,
) -> Result<Json<Value>, StatusCode> {
    tracing::info!("📥 Webhook request received: /{}", path);
    tracing::debug!("📄 Request body: {}", body);

    let payload = parse_payload(&body)?;

    let runs = state
        .dispatcher
        .fire(WorkflowSelector::webhook(&path), payload)
        .await;
    if runs.is_empty() {
        tracing::warn!("❌ No active workflow listens on webhook path: /{}", path);
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(json!({ "runs": runs })))
}
