/// HTTP API Layer
///
/// REST endpoints for workflow and bot management, the manual run endpoint,
/// the inbound chat bridge and the webhook trigger.

// Workflow management endpoints (POST/GET/PUT/DELETE) and manual runs
pub mod workflows;

// Webhook trigger endpoint
pub mod webhooks;

// Inbound chat lines for the command trigger
pub mod commands;

// Stored bot records
pub mod bots;

// Re-export router builders
pub use bots::create_bot_routes;
pub use commands::create_command_routes;
pub use webhooks::create_webhook_routes;
pub use workflows::{create_workflow_routes, AppState};
