/// Trigger dispatch
///
/// Every inbound signal (chat command, webhook call, feed poll, manual run)
/// ends up here as a selector plus a seed payload. The dispatcher looks up the
/// active workflows bound to the selector and runs each one as its own task.

pub mod command;

pub use command::{CommandOutcome, CommandTrigger};

use crate::runtime::engine::{ExecutionEngine, RunReport};
use crate::workflow::registry::WorkflowRegistry;
use crate::workflow::types::normalize_path;
use crate::workflow::Payload;
use serde::Serialize;
use std::sync::Arc;

/// Which workflows a trigger fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowSelector {
    /// Workflows listening on this webhook path
    Webhook(String),
    /// Workflows bound to this chat command (case-insensitive)
    Command(String),
    /// One workflow by id
    Workflow(String),
}

impl WorkflowSelector {
    pub fn webhook(path: &str) -> Self {
        WorkflowSelector::Webhook(normalize_path(path))
    }
}

/// Result of one workflow started by a trigger
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub workflow_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Routes trigger firings to the engine
pub struct TriggerDispatcher {
    registry: Arc<WorkflowRegistry>,
    engine: Arc<ExecutionEngine>,
}

impl TriggerDispatcher {
    pub fn new(registry: Arc<WorkflowRegistry>, engine: Arc<ExecutionEngine>) -> Self {
        Self { registry, engine }
    }

    /// Run every active workflow matching `selector`, each as its own task
    ///
    /// Runs share nothing but the seed payload they are cloned from. Results
    /// come back ordered by workflow id.
    pub async fn fire(&self, selector: WorkflowSelector, payload: Payload) -> Vec<DispatchResult> {
        let workflows = self.registry.select(&selector);
        if workflows.is_empty() {
            tracing::debug!("⏭️ No active workflow for {:?}", selector);
            return Vec::new();
        }

        tracing::info!("🔔 {:?} fired {} workflow(s)", selector, workflows.len());

        let handles: Vec<_> = workflows
            .into_iter()
            .map(|workflow| {
                let engine = Arc::clone(&self.engine);
                let payload = payload.clone();
                let workflow_id = workflow.id.clone();
                let handle = tokio::spawn(async move { engine.run(&workflow, payload).await });
                (workflow_id, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (workflow_id, handle) in handles {
            let result = match handle.await {
                Ok(Ok(report)) => DispatchResult {
                    workflow_id,
                    report: Some(report),
                    error: None,
                },
                Ok(Err(e)) => {
                    tracing::error!("❌ Workflow {} could not run: {}", workflow_id, e);
                    DispatchResult {
                        workflow_id,
                        report: None,
                        error: Some(e.to_string()),
                    }
                }
                Err(e) => {
                    tracing::error!("❌ Workflow task {} aborted: {}", workflow_id, e);
                    DispatchResult {
                        workflow_id,
                        report: None,
                        error: Some(format!("run aborted: {e}")),
                    }
                }
            };
            results.push(result);
        }
        results
    }
}
