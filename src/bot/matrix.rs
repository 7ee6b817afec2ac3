/// Matrix client-server API session
///
/// A thin reqwest client covering password login, `m.room.message` sends,
/// presence lookups and alias resolution. Every request goes through the
/// shared client, so the configured timeout bounds each call.

use crate::bot::session::{MessagingSession, Presence, SessionConnector, SessionError};
use crate::workflow::types::Bot;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Logged-in Matrix session for one bot
#[derive(Debug, Clone)]
pub struct MatrixSession {
    bot_id: String,
    homeserver: Url,
    access_token: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PresenceResponse {
    presence: Presence,
}

#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    room_id: String,
}

impl MatrixSession {
    /// Wrap an existing access token
    pub fn new(bot_id: impl Into<String>, homeserver: Url, access_token: impl Into<String>, http: Client) -> Self {
        Self {
            bot_id: bot_id.into(),
            homeserver,
            access_token: access_token.into(),
            http,
        }
    }

    /// Password login for `bot` against `homeserver`
    pub async fn login(bot: &Bot, homeserver: Url, http: Client) -> anyhow::Result<Self> {
        let url = endpoint(&homeserver, &["login"])?;
        let body = json!({
            "type": "m.login.password",
            "identifier": { "type": "m.id.user", "user": bot.user_id },
            "password": bot.password,
            "initial_device_display_name": bot.display_name,
        });

        let response = check(http.post(url).json(&body).send().await?).await?;
        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Malformed login response for bot '{}': {}", bot.id, e))?;

        tracing::info!("🔑 Bot '{}' logged in as {}", bot.id, bot.user_id);
        Ok(Self::new(bot.id.clone(), homeserver, login.access_token, http))
    }
}

#[async_trait]
impl MessagingSession for MatrixSession {
    fn bot_id(&self) -> &str {
        &self.bot_id
    }

    async fn send_message(&self, room_id: &str, content: &str) -> Result<(), SessionError> {
        let txn_id = uuid::Uuid::new_v4().to_string();
        let url = endpoint(
            &self.homeserver,
            &["rooms", room_id, "send", "m.room.message", &txn_id],
        )
        .map_err(|e| SessionError::Decode(e.to_string()))?;

        let body = json!({ "msgtype": "m.text", "body": content });
        let response = self
            .http
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        check(response).await?;

        tracing::debug!("📨 Bot '{}' sent {} bytes to {}", self.bot_id, content.len(), room_id);
        Ok(())
    }

    async fn get_presence(&self, user_id: &str) -> Result<Presence, SessionError> {
        let url = endpoint(&self.homeserver, &["presence", user_id, "status"])
            .map_err(|e| SessionError::Decode(e.to_string()))?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let presence: PresenceResponse = check(response)
            .await?
            .json()
            .await
            .map_err(|e| SessionError::Decode(e.to_string()))?;

        Ok(presence.presence)
    }

    async fn resolve_alias(&self, alias: &str) -> Result<String, SessionError> {
        let url = endpoint(&self.homeserver, &["directory", "room", alias])
            .map_err(|e| SessionError::Decode(e.to_string()))?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!("⚠️ Alias lookup for {} returned {}", alias, response.status());
            return Err(SessionError::UnresolvedAlias(alias.to_string()));
        }

        let directory: DirectoryResponse = response
            .json()
            .await
            .map_err(|_| SessionError::UnresolvedAlias(alias.to_string()))?;
        Ok(directory.room_id)
    }
}

/// Connector that logs bots in over the client-server API
#[derive(Debug, Clone)]
pub struct MatrixConnector {
    default_homeserver: String,
    http: Client,
}

impl MatrixConnector {
    pub fn new(default_homeserver: impl Into<String>, http: Client) -> Self {
        Self {
            default_homeserver: default_homeserver.into(),
            http,
        }
    }
}

#[async_trait]
impl SessionConnector for MatrixConnector {
    async fn connect(&self, bot: &Bot) -> anyhow::Result<Arc<dyn MessagingSession>> {
        let homeserver = bot
            .homeserver_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&self.default_homeserver);
        let homeserver = Url::parse(homeserver)
            .map_err(|e| anyhow::anyhow!("Invalid homeserver URL '{}' for bot '{}': {}", homeserver, bot.id, e))?;

        let session = MatrixSession::login(bot, homeserver, self.http.clone()).await?;
        Ok(Arc::new(session))
    }
}

/// Build `{homeserver}/_matrix/client/v3/{segments...}` with each segment percent-encoded
fn endpoint(homeserver: &Url, segments: &[&str]) -> anyhow::Result<Url> {
    let mut url = homeserver.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("Homeserver URL cannot be a base: {}", homeserver))?
        .pop_if_empty()
        .extend(["_matrix", "client", "v3"])
        .extend(segments);
    Ok(url)
}

async fn check(response: Response) -> Result<Response, SessionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SessionError::Rejected {
        status: status.as_u16(),
        body,
    })
}
