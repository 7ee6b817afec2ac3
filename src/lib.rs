/// roomflow: workflow automation for Matrix rooms
///
/// Chat commands, webhooks, polled feeds and manual runs select stored
/// workflows; each run threads one payload through an ordered chain of step
/// runners that post messages, call external services and shape text.

// Core configuration and setup
pub mod config;

// Workflow management layer - definitions, storage, payload and registry
pub mod workflow;

// Bot sessions - Matrix client, room addressing and the bot registry
pub mod bot;

// Chat command parsing and the command catalog
pub mod command;

// Runtime execution engine - step runners, engine and poll scheduler
pub mod runtime;

// Trigger dispatch and the command trigger
pub mod trigger;

// HTTP API layer - REST endpoints, chat bridge and webhook trigger
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use runtime::{ExecutionEngine, RunReport, StepRunner};
pub use server::start_server;
pub use workflow::{Bot, Payload, Workflow, WorkflowStep};
