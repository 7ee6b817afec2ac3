use crate::runtime::error::StepError;
use crate::runtime::executor::{OutputSink, RunnerDeps, StepRunner};
use crate::workflow::{Payload, WorkflowStep};
use async_trait::async_trait;

/// Renders the payload as an email addressed to `to`
///
/// There is no mail transport; the rendered block goes to the output sink.
pub struct SendEmail {
    to: String,
    output: OutputSink,
}

impl SendEmail {
    pub fn from_step(step: &WorkflowStep, deps: &RunnerDeps) -> Self {
        Self {
            to: step.meta.get("to").trim().to_string(),
            output: deps.output.clone(),
        }
    }

    fn recipient(&self) -> &str {
        if self.to.is_empty() {
            "(no recipient)"
        } else {
            &self.to
        }
    }

    fn render(&self, payload: &Payload) -> String {
        let recipient = self.recipient();
        let rule = "=".repeat(40);

        let mut block = format!("{rule}\nTo: {recipient}\n");
        if let Some(room) = payload.target_room() {
            block.push_str(&format!("Room: {room}\n"));
        }
        if !payload.users.is_empty() {
            block.push_str(&format!("Users: {}\n", payload.users.join(", ")));
        }
        block.push_str(&"-".repeat(40));
        block.push('\n');
        block.push_str(&payload.message);
        block.push('\n');
        block.push_str(&rule);
        block.push('\n');
        block
    }
}

#[async_trait]
impl StepRunner for SendEmail {
    fn variety(&self) -> &str {
        super::SEND_EMAIL
    }

    async fn run(&self, payload: Payload) -> Result<Payload, StepError> {
        self.output.write_text(&self.render(&payload));
        tracing::info!("📧 Rendered email for {}", self.recipient());
        Ok(payload)
    }
}
