/// Messaging session capability
///
/// The narrow slice of the Matrix client the engine needs: send text to a
/// room, ask for a user's presence, and resolve room aliases. Step runners
/// only ever see `Arc<dyn MessagingSession>` handed out by the bot registry.

use crate::workflow::types::Bot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Presence state reported by the homeserver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Unavailable,
    Offline,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// Not a `!id:domain` or `#alias:domain` token
    #[error("invalid room identifier: {0:?}")]
    InvalidRoom(String),

    /// Directory lookup for an alias came back empty or failed
    #[error("room alias could not be resolved: {0}")]
    UnresolvedAlias(String),

    /// Transport failure, including timeouts
    #[error("request to homeserver failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Homeserver answered with a non-success status
    #[error("homeserver rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected homeserver response: {0}")]
    Decode(String),
}

impl SessionError {
    /// Resolution failures as opposed to validation or transport ones
    pub fn is_resolution(&self) -> bool {
        matches!(self, SessionError::UnresolvedAlias(_))
    }
}

/// An authenticated messaging identity
#[async_trait]
pub trait MessagingSession: Send + Sync {
    /// Identifier of the bot this session belongs to
    fn bot_id(&self) -> &str;

    /// Send a plain-text message to a canonical room id
    async fn send_message(&self, room_id: &str, content: &str) -> Result<(), SessionError>;

    /// Current presence of a user
    async fn get_presence(&self, user_id: &str) -> Result<Presence, SessionError>;

    /// Resolve `#alias:domain` to a canonical room id
    async fn resolve_alias(&self, alias: &str) -> Result<String, SessionError>;
}

/// Logs a bot in and yields its session
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, bot: &Bot) -> anyhow::Result<Arc<dyn MessagingSession>>;
}
