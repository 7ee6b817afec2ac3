use crate::runtime::error::StepError;
use crate::runtime::executor::{OutputSink, RunnerDeps, StepRunner};
use crate::workflow::Payload;
use async_trait::async_trait;

const EMPTY_LINE: &str = "[Empty line]";

/// Writes the payload message to the process output
pub struct StdOut {
    output: OutputSink,
}

impl StdOut {
    pub fn new(deps: &RunnerDeps) -> Self {
        Self {
            output: deps.output.clone(),
        }
    }
}

#[async_trait]
impl StepRunner for StdOut {
    fn variety(&self) -> &str {
        super::STD_OUT
    }

    async fn run(&self, payload: Payload) -> Result<Payload, StepError> {
        let line = if payload.message.is_empty() {
            format!("{EMPTY_LINE}\n")
        } else {
            format!(">>{}\n", payload.message)
        };
        self.output.write_text(&line);
        Ok(payload)
    }
}
