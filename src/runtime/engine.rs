/// Sequential step execution engine
///
/// Loads a workflow's steps, orders them and threads one payload through the
/// matching runners. A failing step is logged and recorded; the next step sees
/// the payload as it was before the failure.

use crate::runtime::error::ErrorKind;
use crate::runtime::executor::{RunnerCatalog, RunnerDeps};
use crate::workflow::storage::StepSource;
use crate::workflow::{Payload, Workflow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use uuid::Uuid;

/// Runs workflows step by step
pub struct ExecutionEngine {
    steps: Arc<dyn StepSource>,
    catalog: Arc<RunnerCatalog>,
    deps: RunnerDeps,
}

/// What happened during one workflow run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub workflow_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per active step, in execution order
    pub steps: Vec<StepOutcome>,
    /// Payload after the last step
    pub payload: Payload,
}

impl RunReport {
    /// Steps that reported an error
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps
            .iter()
            .filter(|step| matches!(step.status, StepStatus::Failed { .. }))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step_id: String,
    pub variety: String,
    pub sort_order: i64,
    pub duration_ms: u64,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed { kind: ErrorKind, reason: String },
    Skipped { reason: String },
}

impl ExecutionEngine {
    pub fn new(steps: Arc<dyn StepSource>, catalog: Arc<RunnerCatalog>, deps: RunnerDeps) -> Self {
        Self { steps, catalog, deps }
    }

    /// Execute every active step of `workflow` against `payload`
    ///
    /// Only a failure to load the steps is returned as an error.
    pub async fn run(&self, workflow: &Workflow, payload: Payload) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let workflow_start_time = Instant::now();

        tracing::info!("🚀 Starting workflow run {} for {}", run_id, workflow.id);

        let mut steps = self
            .steps
            .find_active_steps(&workflow.id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load steps for workflow {}: {}", workflow.id, e))?;
        steps.retain(|step| step.active);
        steps.sort_by_key(|step| step.sort_order);

        tracing::debug!("📋 {} active steps for {}", steps.len(), workflow.id);

        let mut payload = payload;
        let mut outcomes = Vec::with_capacity(steps.len());

        for (step_num, step) in steps.iter().enumerate() {
            let step_start_time = Instant::now();

            let Some(runner) = self.catalog.instantiate(step, &self.deps) else {
                tracing::warn!(
                    "⏭️ Skipping step '{}' in workflow {}: unknown variety '{}'",
                    step.id,
                    workflow.id,
                    step.variety
                );
                outcomes.push(StepOutcome {
                    step_id: step.id.clone(),
                    variety: step.variety.clone(),
                    sort_order: step.sort_order,
                    duration_ms: 0,
                    status: StepStatus::Skipped {
                        reason: format!("unknown variety '{}'", step.variety),
                    },
                });
                continue;
            };

            tracing::info!(
                "📍 Step {}/{}: '{}' ({})",
                step_num + 1,
                steps.len(),
                step.id,
                step.variety
            );

            let before = payload.clone();
            let status = match runner.run(payload).await {
                Ok(next) => {
                    payload = next;
                    StepStatus::Succeeded
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Step '{}' ({}) failed in workflow {}: {}",
                        step.id,
                        step.variety,
                        workflow.id,
                        e
                    );
                    payload = before;
                    StepStatus::Failed {
                        kind: e.kind(),
                        reason: e.to_string(),
                    }
                }
            };

            let step_duration = step_start_time.elapsed();
            tracing::debug!("⏱️ Step '{}' finished in {:?}", step.id, step_duration);
            outcomes.push(StepOutcome {
                step_id: step.id.clone(),
                variety: step.variety.clone(),
                sort_order: step.sort_order,
                duration_ms: u64::try_from(step_duration.as_millis()).unwrap_or(u64::MAX),
                status,
            });
        }

        let report = RunReport {
            run_id,
            workflow_id: workflow.id.clone(),
            started_at,
            finished_at: Utc::now(),
            steps: outcomes,
            payload,
        };

        tracing::info!(
            "🎉 Workflow '{}' run {} completed in {:?} ({} failed steps)",
            workflow.id,
            run_id,
            workflow_start_time.elapsed(),
            report.failures().count()
        );

        Ok(report)
    }
}
