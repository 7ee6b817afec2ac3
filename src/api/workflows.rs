/// Workflow management REST API endpoints
///
/// CRUD for workflow definitions and their steps with hot-reload support:
/// every change is written to storage, swapped into the registry and applied
/// to the poll scheduler before the response goes out.

use crate::{
    bot::BotRegistry,
    runtime::scheduler::PollSchedulerService,
    trigger::{CommandTrigger, TriggerDispatcher, WorkflowSelector},
    workflow::{
        registry::WorkflowRegistry,
        storage::WorkflowStorage,
        types::{Workflow, WorkflowStep},
        Payload,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Workflow, step and bot persistence
    pub storage: WorkflowStorage,
    /// Hot-reload registry triggers resolve against
    pub registry: Arc<WorkflowRegistry>,
    /// Poll scheduler kept in sync with workflow changes
    pub scheduler: Arc<PollSchedulerService>,
    /// Runs the workflows a trigger selects
    pub dispatcher: Arc<TriggerDispatcher>,
    /// Chat command entry point
    pub commands: Arc<CommandTrigger>,
    /// Sessions connected at startup
    pub bots: Arc<BotRegistry>,
}

/// Response for workflow creation/update operations
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub message: String,
}

/// Request body for workflow creation and update
#[derive(Debug, Deserialize)]
pub struct SaveWorkflowRequest {
    pub workflow: Workflow,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", post(create_workflow).get(list_workflows))
        .route(
            "/api/workflows/{id}",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/api/workflows/{id}/run", post(run_workflow))
}

/// Create a new workflow
///
/// POST /api/workflows
/// Body: { "workflow": { "id": "...", "name": "...", "trigger": {...} }, "steps": [...] }
async fn create_workflow(
    State(state): State<AppState>,
    Json(request): Json<SaveWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    let SaveWorkflowRequest { workflow, steps } = request;

    if workflow.id.trim().is_empty() || workflow.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.storage.get_workflow(&workflow.id).await {
        Ok(Some(_)) => return Err(StatusCode::CONFLICT),
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Failed to look up workflow {}: {}", workflow.id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    persist_and_reload(&state, &workflow, &steps).await?;

    tracing::info!("🔥 Created workflow: {} ({}) with {} steps", workflow.id, workflow.name, steps.len());

    Ok(Json(WorkflowResponse {
        id: workflow.id.clone(),
        message: format!("Workflow '{}' created successfully", workflow.name),
    }))
}

/// List all workflows
///
/// GET /api/workflows
async fn list_workflows(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    match state.storage.list_workflows().await {
        Ok(workflows) => Ok(Json(json!({ "workflows": workflows }))),
        Err(e) => {
            tracing::error!("Failed to list workflows: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get a workflow together with all of its steps
///
/// GET /api/workflows/{id}
async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let workflow = match state.storage.get_workflow(&id).await {
        Ok(Some(workflow)) => workflow,
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to get workflow {}: {}", id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let steps = state.storage.list_steps(&id).await.map_err(|e| {
        tracing::error!("Failed to list steps of {}: {}", id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(json!({ "workflow": workflow, "steps": steps })))
}

/// Replace a workflow and its step list
///
/// PUT /api/workflows/{id}
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SaveWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    let SaveWorkflowRequest { mut workflow, steps } = request;
    workflow.id = id.clone();

    if workflow.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.storage.get_workflow(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to look up workflow {}: {}", id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    persist_and_reload(&state, &workflow, &steps).await?;

    tracing::info!("🔥 Hot-reloaded workflow: {} ({})", workflow.id, workflow.name);

    Ok(Json(WorkflowResponse {
        id: workflow.id.clone(),
        message: format!("Workflow '{}' updated successfully", workflow.name),
    }))
}

/// Delete a workflow and its steps
///
/// DELETE /api/workflows/{id}
async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    state.scheduler.remove_workflow_poll_trigger(&id).await;

    if let Err(e) = state.registry.remove_workflow(&id).await {
        tracing::error!("Failed to remove workflow from registry: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    match state.storage.delete_workflow(&id).await {
        Ok(true) => {
            tracing::info!("Deleted workflow: {}", id);
            Ok(Json(json!({ "message": "Workflow deleted successfully" })))
        }
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to delete workflow: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Start a workflow by hand
///
/// POST /api/workflows/{id}/run
/// Body: optional Payload JSON; an empty body starts from an empty payload
async fn run_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<Value>, StatusCode> {
    let payload = parse_payload(&body)?;

    let runs = state
        .dispatcher
        .fire(WorkflowSelector::Workflow(id.clone()), payload)
        .await;
    if runs.is_empty() {
        tracing::warn!("❌ Manual run requested for unknown or inactive workflow: {}", id);
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(json!({ "runs": runs })))
}

/// Decode a request body into a seed payload; blank bodies give the default
pub(crate) fn parse_payload(body: &str) -> Result<Payload, StatusCode> {
    if body.trim().is_empty() {
        return Ok(Payload::default());
    }
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!("❌ Invalid payload JSON: {}", e);
        StatusCode::BAD_REQUEST
    })
}

async fn persist_and_reload(
    state: &AppState,
    workflow: &Workflow,
    steps: &[WorkflowStep],
) -> Result<(), StatusCode> {
    if let Err(e) = PollSchedulerService::validate_trigger(&workflow.trigger) {
        tracing::warn!("Rejected workflow {}: {}", workflow.id, e);
        return Err(StatusCode::BAD_REQUEST);
    }

    if let Err(e) = state.storage.save_workflow(workflow, steps).await {
        tracing::error!("Failed to save workflow {}: {}", workflow.id, e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    if let Err(e) = state.registry.reload_workflow(&workflow.id).await {
        tracing::error!("Failed to reload workflow {} into registry: {}", workflow.id, e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    if let Err(e) = state.scheduler.add_or_update_workflow_poll_trigger(workflow).await {
        tracing::error!("Failed to register poll trigger for workflow {}: {}", workflow.id, e);
        return Err(StatusCode::BAD_REQUEST);
    }

    Ok(())
}
