/// Runtime Execution Engine
///
/// Runs workflows: loads their steps, instantiates runners from the variety
/// catalog and threads the payload through them in order. Also hosts the
/// background poll scheduler.

// Sequential step execution and run reports
pub mod engine;

// Step-level error taxonomy
pub mod error;

// Step runner contract, variety catalog and shared runner resources
pub mod executor;

// Background poll scheduler for feed-triggered workflows
pub mod scheduler;

// Built-in step runners
pub mod steps;

// Re-export main types
pub use engine::{ExecutionEngine, RunReport, StepOutcome, StepStatus};
pub use error::{ErrorKind, StepError};
pub use executor::{CapturedOutput, ExternalAuth, OutputSink, RunnerCatalog, RunnerDeps, StepRunner};
pub use scheduler::{FeedPoller, PollSchedulerService};
