use crate::runtime::error::StepError;
use crate::runtime::executor::{ExternalAuth, RunnerDeps, StepRunner};
use crate::workflow::{Payload, WorkflowStep};
use async_trait::async_trait;
use reqwest::StatusCode;

/// Hands the payload to an external service and adopts its answer
///
/// POSTs the payload as JSON to `url` with the configured auth header. A 200
/// response body replaces the payload; anything else leaves it untouched.
pub struct FetchDataExternal {
    url: String,
    http: reqwest::Client,
    auth: ExternalAuth,
}

impl FetchDataExternal {
    pub fn from_step(step: &WorkflowStep, deps: &RunnerDeps) -> Self {
        Self {
            url: step.meta.get("url").trim().to_string(),
            http: deps.http.clone(),
            auth: deps.external_auth.clone(),
        }
    }
}

#[async_trait]
impl StepRunner for FetchDataExternal {
    fn variety(&self) -> &str {
        super::FETCH_DATA_EXTERNAL
    }

    async fn run(&self, payload: Payload) -> Result<Payload, StepError> {
        if self.url.is_empty() {
            return Err(StepError::Validation("fetchDataExternal has no url".to_string()));
        }

        tracing::debug!("🌍 POST {}", self.url);
        let mut request = self.http.post(&self.url).json(&payload);
        if !self.auth.header.is_empty() && !self.auth.value.is_empty() {
            request = request.header(self.auth.header.as_str(), self.auth.value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(StepError::Transport(format!(
                "{} answered with status {}",
                self.url, status
            )));
        }

        let body = response.text().await?;
        let replacement: Payload = serde_json::from_str(&body).map_err(|e| {
            StepError::Transport(format!("{} returned an undecodable payload: {}", self.url, e))
        })?;

        tracing::info!("✅ External call to {} replaced the payload", self.url);
        Ok(replacement)
    }
}
