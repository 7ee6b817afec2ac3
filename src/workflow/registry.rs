/// Hot-reload workflow registry using ArcSwap
///
/// Provides lock-free reads for trigger resolution and atomic replacement of
/// the workflow map whenever the API changes a workflow. Concurrent runs keep
/// using the snapshot they started with.

use crate::trigger::WorkflowSelector;
use crate::workflow::{
    storage::WorkflowStorage,
    types::{TriggerSpec, Workflow},
};
use anyhow::Result;
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

/// Lock-free workflow registry for hot-reload capabilities
#[derive(Debug)]
pub struct WorkflowRegistry {
    /// Key: workflow_id, Value: workflow definition
    workflows: ArcSwap<HashMap<String, Workflow>>,

    /// Reference to persistent storage for reload operations
    storage: Option<WorkflowStorage>,
}

impl WorkflowRegistry {
    /// Create new registry instance with storage backend
    pub fn new(storage: WorkflowStorage) -> Self {
        Self {
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
            storage: Some(storage),
        }
    }

    /// Registry over a fixed set of workflows, without storage behind it
    pub fn from_workflows(workflows: impl IntoIterator<Item = Workflow>) -> Self {
        let map = workflows
            .into_iter()
            .map(|workflow| (workflow.id.clone(), workflow))
            .collect();
        Self {
            workflows: ArcSwap::new(Arc::new(map)),
            storage: None,
        }
    }

    fn storage(&self) -> Result<&WorkflowStorage> {
        self.storage
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Workflow registry has no storage attached"))
    }

    /// Initialize registry by loading all workflows from storage
    pub async fn init_from_storage(&self) -> Result<()> {
        let stored_workflows = self.storage()?.load_all_workflows().await?;

        // Atomic swap of the entire registry
        self.workflows.store(Arc::new(stored_workflows));

        tracing::info!(
            "Initialized workflow registry with {} workflows",
            self.workflows.load().len()
        );

        Ok(())
    }

    /// Hot-reload a single workflow
    pub async fn reload_workflow(&self, workflow_id: &str) -> Result<()> {
        let workflow = self
            .storage()?
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Workflow not found: {}", workflow_id))?;

        let current = self.workflows.load();
        let mut new_registry = (**current).clone();
        new_registry.insert(workflow_id.to_string(), workflow);
        self.workflows.store(Arc::new(new_registry));

        tracing::info!("Hot-reloaded workflow: {}", workflow_id);

        Ok(())
    }

    /// Get a workflow by ID (lock-free read)
    pub fn get_workflow(&self, workflow_id: &str) -> Option<Workflow> {
        self.workflows.load().get(workflow_id).cloned()
    }

    /// Get all workflows (used by the poll scheduler)
    pub fn get_all_workflows(&self) -> Vec<Workflow> {
        self.workflows.load().values().cloned().collect()
    }

    /// Active workflows a trigger selector fires, ordered by id
    pub fn select(&self, selector: &WorkflowSelector) -> Vec<Workflow> {
        let workflows = self.workflows.load();
        let mut selected: Vec<Workflow> = workflows
            .values()
            .filter(|workflow| workflow.active && matches_selector(&workflow.trigger, &workflow.id, selector))
            .cloned()
            .collect();
        selected.sort_by(|a, b| a.id.cmp(&b.id));
        selected
    }

    /// Remove a workflow from registry
    pub async fn remove_workflow(&self, workflow_id: &str) -> Result<()> {
        let current = self.workflows.load();
        let mut new_registry = (**current).clone();

        if new_registry.remove(workflow_id).is_some() {
            self.workflows.store(Arc::new(new_registry));
            tracing::info!("Removed workflow from registry: {}", workflow_id);
        }

        Ok(())
    }
}

fn matches_selector(trigger: &TriggerSpec, workflow_id: &str, selector: &WorkflowSelector) -> bool {
    match (trigger, selector) {
        (TriggerSpec::Webhook { .. }, WorkflowSelector::Webhook(path)) => {
            trigger.webhook_path().as_deref() == Some(path.as_str())
        }
        (TriggerSpec::Command { name }, WorkflowSelector::Command(command)) => {
            name.eq_ignore_ascii_case(command)
        }
        (_, WorkflowSelector::Workflow(id)) => workflow_id == id,
        _ => false,
    }
}
