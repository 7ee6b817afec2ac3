/// Workflow Management Layer
///
/// Workflow, step and bot definitions, their SQLite persistence, the payload
/// threaded through a run, and the lock-free registry triggers resolve against.

// Core workflow type definitions
pub mod types;

// The mutable record passed from step to step
pub mod payload;

// SQLite persistence layer and the collaborator traits the engine consumes
pub mod storage;

// Hot-reload registry using ArcSwap for zero-downtime updates
pub mod registry;

// Re-export commonly used types
pub use payload::Payload;
pub use types::{Bot, StepMeta, TriggerSpec, Workflow, WorkflowStep};
