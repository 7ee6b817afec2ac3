use crate::bot::{BotRegistry, Presence};
use crate::runtime::error::StepError;
use crate::runtime::executor::{RunnerDeps, StepRunner};
use crate::workflow::Payload;
use async_trait::async_trait;
use std::sync::Arc;

/// Keeps only the users the primary session reports as online
///
/// Presence is queried one user at a time. A failed lookup counts as "not
/// online" instead of failing the step.
pub struct FilterOnlineUsers {
    bots: Arc<BotRegistry>,
}

impl FilterOnlineUsers {
    pub fn new(deps: &RunnerDeps) -> Self {
        Self {
            bots: Arc::clone(&deps.bots),
        }
    }
}

#[async_trait]
impl StepRunner for FilterOnlineUsers {
    fn variety(&self) -> &str {
        super::FILTER_ONLINE_USERS
    }

    async fn run(&self, mut payload: Payload) -> Result<Payload, StepError> {
        let session = self.bots.get_primary_client()?;

        let mut online = Vec::with_capacity(payload.users.len());
        for user in payload.users.drain(..) {
            match session.get_presence(&user).await {
                Ok(Presence::Online) => online.push(user),
                Ok(_) => {}
                Err(e) => tracing::warn!("⚠️ Presence lookup for {} failed, treating as offline: {}", user, e),
            }
        }

        tracing::debug!("👥 {} users online", online.len());
        payload.users = online;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::MessagingSession;
    use crate::runtime::error::ErrorKind;
    use crate::runtime::steps::test_support::RecordingSession;
    use crate::workflow::Bot;

    fn primary_bot() -> Bot {
        Bot {
            id: "main".into(),
            display_name: "Main".into(),
            user_id: "@main:example.org".into(),
            password: String::new(),
            homeserver_url: None,
            active: true,
            primary: true,
        }
    }

    #[tokio::test]
    async fn keeps_online_users_and_drops_failures() {
        let mut session = RecordingSession::named("main");
        session.presence.insert("@ann:x".into(), Presence::Online);
        session.presence.insert("@bob:x".into(), Presence::Offline);
        session.presence.insert("@cyd:x".into(), Presence::Online);
        let session: Arc<dyn MessagingSession> = Arc::new(session);
        let registry = BotRegistry::from_sessions(vec![(primary_bot(), session)]);
        let deps = RunnerDeps::new(Arc::new(registry), reqwest::Client::new());

        let mut payload = Payload::with_message("who is around?");
        payload.users = vec!["@ann:x".into(), "@bob:x".into(), "@unknown:x".into(), "@cyd:x".into()];

        let payload = FilterOnlineUsers::new(&deps).run(payload).await.unwrap();
        assert_eq!(payload.users, vec!["@ann:x", "@cyd:x"]);
        assert_eq!(payload.message, "who is around?");
    }

    #[tokio::test]
    async fn fails_without_primary() {
        let deps = RunnerDeps::new(Arc::new(BotRegistry::empty()), reqwest::Client::new());
        let mut payload = Payload::default();
        payload.users = vec!["@ann:x".into()];

        let err = FilterOnlineUsers::new(&deps).run(payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }
}
