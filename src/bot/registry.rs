/// Bot registry: which session sends each outbound action
///
/// Built once at startup from the active bot records and never mutated
/// afterwards, so concurrent runs read it through a plain `Arc` without
/// locking. Changes to bot records take effect on the next restart.

use crate::bot::session::{MessagingSession, SessionConnector};
use crate::workflow::types::Bot;
use std::{collections::HashMap, fmt, sync::Arc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BotError {
    #[error("no active bot session with id '{0}'")]
    NotFound(String),

    #[error("no primary bot session configured")]
    NoPrimaryConfigured,
}

pub struct BotRegistry {
    sessions: HashMap<String, Arc<dyn MessagingSession>>,
    primary: Option<String>,
}

impl BotRegistry {
    /// Registry without sessions; every lookup fails
    pub fn empty() -> Self {
        Self {
            sessions: HashMap::new(),
            primary: None,
        }
    }

    /// Log every active bot in through `connector`
    ///
    /// Bots that fail to log in are left out and reported; later lookups for
    /// them fail with `NotFound`.
    pub async fn connect(bots: Vec<Bot>, connector: &dyn SessionConnector) -> Self {
        let mut sessions = Vec::new();

        for bot in bots.into_iter().filter(|bot| bot.active) {
            match connector.connect(&bot).await {
                Ok(session) => sessions.push((bot, session)),
                Err(e) => {
                    tracing::error!("❌ Bot '{}' ({}) failed to log in: {}", bot.id, bot.user_id, e);
                }
            }
        }

        Self::from_sessions(sessions)
    }

    /// Build from already-authenticated sessions
    ///
    /// The first primary-flagged active bot wins; extra primaries are ignored
    /// with a warning.
    pub fn from_sessions(sessions: Vec<(Bot, Arc<dyn MessagingSession>)>) -> Self {
        let mut registry = Self::empty();

        for (bot, session) in sessions {
            if !bot.active {
                continue;
            }
            if bot.primary {
                match &registry.primary {
                    None => registry.primary = Some(bot.id.clone()),
                    Some(current) => tracing::warn!(
                        "⚠️ Bot '{}' is also flagged primary; keeping '{}'",
                        bot.id,
                        current
                    ),
                }
            }
            registry.sessions.insert(bot.id, session);
        }

        tracing::info!(
            "🤖 Bot registry ready with {} sessions (primary: {})",
            registry.sessions.len(),
            registry.primary.as_deref().unwrap_or("none")
        );

        registry
    }

    /// Session for a specific bot
    pub fn get_client(&self, id: &str) -> Result<Arc<dyn MessagingSession>, BotError> {
        self.sessions
            .get(id)
            .cloned()
            .ok_or_else(|| BotError::NotFound(id.to_string()))
    }

    /// Session of the primary bot
    pub fn get_primary_client(&self) -> Result<Arc<dyn MessagingSession>, BotError> {
        let primary = self.primary.as_deref().ok_or(BotError::NoPrimaryConfigured)?;
        self.sessions
            .get(primary)
            .cloned()
            .ok_or(BotError::NoPrimaryConfigured)
    }

    /// Session for a step's `asBot` meta: empty means primary
    pub fn resolve(&self, as_bot: &str) -> Result<Arc<dyn MessagingSession>, BotError> {
        let as_bot = as_bot.trim();
        if as_bot.is_empty() {
            self.get_primary_client()
        } else {
            self.get_client(as_bot)
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl fmt::Debug for BotRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.sessions.keys().collect();
        ids.sort();
        f.debug_struct("BotRegistry")
            .field("sessions", &ids)
            .field("primary", &self.primary)
            .finish()
    }
}
