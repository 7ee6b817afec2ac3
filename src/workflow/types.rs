/// Core workflow type definitions
///
/// Workflows, their steps and bot records as they are stored and read by the
/// engine. The engine treats all of them as read-only input.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A stored workflow: a named trigger binding whose steps live in a separate table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow identifier (e.g., "wf-echo")
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    /// Inactive workflows are never selected by triggers
    #[serde(default = "default_true")]
    pub active: bool,
    /// Which inbound signal starts this workflow
    pub trigger: TriggerSpec,
}

/// Inbound signal a workflow listens to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSpec {
    /// HTTP call to /webhook/{path}
    Webhook { path: String },
    /// Chat command such as "!echo"
    Command { name: String },
    /// Periodic fetch of an external JSON feed
    /// Expected: { "schedule": "0 */5 * * * *", "url": "https://...", "items_path": "$.items[*].title" }
    Poll {
        schedule: String,
        url: String,
        #[serde(default)]
        items_path: Option<String>,
    },
    /// Only started through the run endpoint
    Manual,
}

impl TriggerSpec {
    /// Normalised webhook path with a leading slash
    pub fn webhook_path(&self) -> Option<String> {
        match self {
            TriggerSpec::Webhook { path } => Some(normalize_path(path)),
            _ => None,
        }
    }
}

/// Ensure a webhook path starts with exactly one '/'
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim().trim_start_matches('/'))
}

/// One configured unit of work inside a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique step identifier
    pub id: String,
    /// Owning workflow
    #[serde(default)]
    pub workflow_id: String,
    /// Selects the step runner (e.g., "postMatrixMessage")
    pub variety: String,
    /// Ascending execution order; ties keep insertion order
    #[serde(default)]
    pub sort_order: i64,
    /// Inactive steps never run
    #[serde(default = "default_true")]
    pub active: bool,
    /// Runner configuration (room, messagePrefix, asBot, url, ...)
    #[serde(default)]
    pub meta: StepMeta,
}

/// String-keyed step configuration; absent keys read as empty strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepMeta(HashMap<String, String>);

impl StepMeta {
    /// Value for `key`, or "" when absent
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StepMeta {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A messaging identity the system can act as
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    /// Identifier referenced by a step's `asBot` meta
    pub id: String,
    pub display_name: String,
    /// Matrix user id used to log in (e.g., "@helper:example.org")
    pub user_id: String,
    /// Login credential
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Homeserver base URL; falls back to the configured default
    #[serde(default)]
    pub homeserver_url: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Exactly one active bot should carry this flag
    #[serde(default)]
    pub primary: bool,
}

fn default_true() -> bool {
    true
}
