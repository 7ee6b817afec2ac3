/// Background feed poll scheduler
///
/// Manages poll-triggered workflows using tokio-cron-scheduler. Each active
/// workflow with a `poll` trigger gets one job that fetches a JSON feed,
/// extracts items with a JSONPath and fires the workflow when they changed.

use crate::trigger::{TriggerDispatcher, WorkflowSelector};
use crate::workflow::{registry::WorkflowRegistry, Payload, TriggerSpec, Workflow};
use anyhow::Result;
use serde_json::Value;
use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
    sync::{Arc, Mutex},
};
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

const DEFAULT_ITEMS_PATH: &str = "$";

/// Fetches feeds and remembers what each workflow last saw
pub struct FeedPoller {
    http: reqwest::Client,
    /// Key: workflow_id, Value: digest of the last fired items
    seen: Mutex<HashMap<String, u64>>,
}

impl FeedPoller {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch `url` and build the seed payload for `workflow_id`
    ///
    /// Returns None when the feed yields no items or the same items as the
    /// previous poll.
    pub async fn poll(&self, workflow_id: &str, url: &str, items_path: Option<&str>) -> Result<Option<Payload>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Feed request to {} failed: {}", url, e))?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Feed {} answered with status {}", url, response.status()));
        }
        let document: Value = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Feed {} is not valid JSON: {}", url, e))?;

        let items = select_items(&document, items_path.unwrap_or(DEFAULT_ITEMS_PATH))?;
        if items.is_empty() {
            tracing::debug!("📭 Feed {} returned no items for {}", url, workflow_id);
            return Ok(None);
        }
        if !self.observe(workflow_id, &items) {
            tracing::debug!("⏭️ Feed {} unchanged for {}", url, workflow_id);
            return Ok(None);
        }

        let mut payload = Payload::with_message(items.join("\n"));
        payload.context.insert("source".to_string(), url.to_string());
        payload.context.insert("polledAt".to_string(), chrono::Utc::now().to_rfc3339());
        payload.context.insert("itemCount".to_string(), items.len().to_string());
        Ok(Some(payload))
    }

    /// Record `items` for `workflow_id`; true when they differ from last time
    fn observe(&self, workflow_id: &str, items: &[String]) -> bool {
        let mut hasher = DefaultHasher::new();
        items.hash(&mut hasher);
        let digest = hasher.finish();

        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        seen.insert(workflow_id.to_string(), digest) != Some(digest)
    }

    /// Drop the remembered digest so the next poll fires again
    pub fn forget(&self, workflow_id: &str) {
        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        seen.remove(workflow_id);
    }
}

/// Render the values matched by `path`; strings verbatim, anything else as JSON
fn select_items(document: &Value, path: &str) -> Result<Vec<String>> {
    let matched = jsonpath_lib::select(document, path)
        .map_err(|e| anyhow::anyhow!("Invalid items path '{}': {:?}", path, e))?;

    let mut items = Vec::new();
    for value in matched {
        match value {
            Value::Array(elements) if path == DEFAULT_ITEMS_PATH => {
                items.extend(elements.iter().map(render_item))
            }
            Value::Null => {}
            other => items.push(render_item(other)),
        }
    }
    Ok(items)
}

fn render_item(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Hot-reload poll scheduler service
///
/// One job per workflow, tracked by UUID so a schedule change or deletion
/// removes the old job before anything else is registered.
pub struct PollSchedulerService {
    scheduler: Arc<RwLock<JobScheduler>>,
    job_uuid_map: Arc<RwLock<HashMap<String, Uuid>>>,
    registry: Arc<WorkflowRegistry>,
    dispatcher: Arc<TriggerDispatcher>,
    poller: Arc<FeedPoller>,
}

impl PollSchedulerService {
    pub async fn new(
        registry: Arc<WorkflowRegistry>,
        dispatcher: Arc<TriggerDispatcher>,
        http: reqwest::Client,
    ) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            job_uuid_map: Arc::new(RwLock::new(HashMap::new())),
            registry,
            dispatcher,
            poller: Arc::new(FeedPoller::new(http)),
        })
    }

    /// Register every poll trigger and start the scheduler
    pub async fn start(&self) -> Result<()> {
        tracing::info!("⏰ Starting poll scheduler service");

        self.register_all_poll_triggers().await?;

        {
            let scheduler = self.scheduler.read().await;
            scheduler.start().await?;
        }

        tracing::info!("✅ Poll scheduler started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        tracing::info!("⏹️ Stopping poll scheduler service");

        self.job_uuid_map.write().await.clear();
        {
            let mut scheduler = self.scheduler.write().await;
            scheduler.shutdown().await?;
        }

        tracing::info!("✅ Poll scheduler stopped");
        Ok(())
    }

    /// Bring the job for `workflow` in line with its current trigger
    ///
    /// Inactive workflows and non-poll triggers end up with no job.
    pub async fn add_or_update_workflow_poll_trigger(&self, workflow: &Workflow) -> Result<()> {
        let TriggerSpec::Poll { schedule, .. } = &workflow.trigger else {
            self.remove_workflow_poll_trigger(&workflow.id).await;
            return Ok(());
        };
        if !workflow.active {
            self.remove_workflow_poll_trigger(&workflow.id).await;
            return Ok(());
        }

        let job = self.build_poll_job(&workflow.id, schedule)?;
        self.remove_workflow_poll_trigger(&workflow.id).await;

        let new_job_uuid = {
            let scheduler = self.scheduler.write().await;
            scheduler.add(job).await?
        };
        self.job_uuid_map
            .write()
            .await
            .insert(workflow.id.clone(), new_job_uuid);

        tracing::info!("🔥 Registered poll job for {} ({})", workflow.id, schedule);
        Ok(())
    }

    /// Reject a poll trigger whose schedule the cron parser refuses
    ///
    /// Other triggers always pass.
    pub fn validate_trigger(trigger: &TriggerSpec) -> Result<()> {
        if let TriggerSpec::Poll { schedule, .. } = trigger {
            Job::new_async(schedule.as_str(), |_uuid, _l| Box::pin(async {}))
                .map_err(|e| anyhow::anyhow!("Invalid poll schedule '{}': {}", schedule, e))?;
        }
        Ok(())
    }

    fn build_poll_job(&self, workflow_id: &str, schedule: &str) -> Result<Job> {
        let workflow_id_owned = workflow_id.to_string();
        let registry = Arc::clone(&self.registry);
        let dispatcher = Arc::clone(&self.dispatcher);
        let poller = Arc::clone(&self.poller);

        Job::new_async(schedule, move |_uuid, _l| {
            let workflow_id = workflow_id_owned.clone();
            let registry = Arc::clone(&registry);
            let dispatcher = Arc::clone(&dispatcher);
            let poller = Arc::clone(&poller);

            Box::pin(async move {
                tracing::debug!("🔔 Poll trigger activated for workflow {}", workflow_id);
                if let Err(e) = poll_and_fire(&registry, &poller, &dispatcher, &workflow_id).await {
                    tracing::error!("❌ Poll for workflow {} failed: {}", workflow_id, e);
                }
            })
        })
        .map_err(|e| anyhow::anyhow!("Invalid poll schedule '{}' for {}: {}", schedule, workflow_id, e))
    }

    pub async fn remove_workflow_poll_trigger(&self, workflow_id: &str) {
        let Some(job_uuid) = self.job_uuid_map.write().await.remove(workflow_id) else {
            return;
        };
        self.poller.forget(workflow_id);

        let scheduler = self.scheduler.read().await;
        if let Err(e) = scheduler.remove(&job_uuid).await {
            tracing::warn!("⚠️ Failed to remove poll job for {}: {}", workflow_id, e);
        } else {
            tracing::debug!("🛑 Removed poll job for {}", workflow_id);
        }
    }

    /// Run one poll for `workflow_id` right away, outside the schedule
    pub async fn poll_now(&self, workflow_id: &str) -> Result<usize> {
        poll_and_fire(&self.registry, &self.poller, &self.dispatcher, workflow_id).await
    }

    /// Workflow ids that currently have a job
    pub async fn scheduled_workflows(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.job_uuid_map.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn register_all_poll_triggers(&self) -> Result<()> {
        let workflows = self.registry.get_all_workflows();
        let mut total_triggers = 0;

        for workflow in &workflows {
            if workflow.active && matches!(workflow.trigger, TriggerSpec::Poll { .. }) {
                if let Err(e) = self.add_or_update_workflow_poll_trigger(workflow).await {
                    tracing::error!("❌ Skipping poll trigger for {}: {}", workflow.id, e);
                    continue;
                }
                total_triggers += 1;
            }
        }

        tracing::info!(
            "📊 Registered {} poll triggers from {} workflows",
            total_triggers,
            workflows.len()
        );
        Ok(())
    }
}

/// Poll the feed of `workflow_id` and fire it when there is something new
///
/// Returns the number of workflow runs started.
async fn poll_and_fire(
    registry: &WorkflowRegistry,
    poller: &FeedPoller,
    dispatcher: &TriggerDispatcher,
    workflow_id: &str,
) -> Result<usize> {
    let Some(workflow) = registry.get_workflow(workflow_id) else {
        tracing::debug!("⏭️ Skipping poll for deleted workflow: {}", workflow_id);
        return Ok(0);
    };
    let TriggerSpec::Poll { url, items_path, .. } = &workflow.trigger else {
        tracing::debug!("⏭️ Workflow {} no longer polls", workflow_id);
        return Ok(0);
    };

    let Some(payload) = poller.poll(workflow_id, url, items_path.as_deref()).await? else {
        return Ok(0);
    };

    let runs = dispatcher
        .fire(WorkflowSelector::Workflow(workflow_id.to_string()), payload)
        .await;
    tracing::info!("✅ Poll fired {} run(s) of {}", runs.len(), workflow_id);
    Ok(runs.len())
}
