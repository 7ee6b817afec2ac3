use crate::runtime::error::StepError;
use crate::runtime::executor::StepRunner;
use crate::workflow::{Payload, WorkflowStep};
use async_trait::async_trait;

/// Applies a named text transform to the payload message
///
/// Meta `format`:
/// - `appendUsers`: message + ` ["@a:x" "@b:x"]`
/// - `listUsers`: message followed by one `- user` line per user
///
/// Unknown names leave the payload as it is.
pub struct FormatMessage {
    format: String,
}

impl FormatMessage {
    pub fn from_step(step: &WorkflowStep) -> Self {
        Self {
            format: step.meta.get("format").trim().to_string(),
        }
    }
}

#[async_trait]
impl StepRunner for FormatMessage {
    fn variety(&self) -> &str {
        super::FORMAT_MESSAGE
    }

    async fn run(&self, mut payload: Payload) -> Result<Payload, StepError> {
        match self.format.as_str() {
            "appendUsers" => {
                let quoted: Vec<String> = payload.users.iter().map(|user| format!("{user:?}")).collect();
                let rendered = format!("[{}]", quoted.join(" "));
                payload.message = if payload.message.is_empty() {
                    rendered
                } else {
                    format!("{} {}", payload.message, rendered)
                };
            }
            "listUsers" => {
                let mut lines: Vec<String> = Vec::new();
                if !payload.message.is_empty() {
                    lines.push(payload.message.clone());
                }
                lines.extend(payload.users.iter().map(|user| format!("- {user}")));
                payload.message = lines.join("\n");
            }
            other => tracing::debug!("⏭️ Unknown message format '{}', leaving message as is", other),
        }
        Ok(payload)
    }
}
