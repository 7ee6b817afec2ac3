use crate::bot::{BotRegistry, RoomAddress};
use crate::runtime::error::StepError;
use crate::runtime::executor::{RunnerDeps, StepRunner};
use crate::workflow::{Payload, WorkflowStep};
use async_trait::async_trait;
use std::sync::Arc;

/// Sends the payload message to a Matrix room
///
/// Meta: `room` (fallback when the payload has none), `messagePrefix`,
/// `asBot` (empty means the primary bot).
pub struct PostMatrixMessage {
    room: String,
    message_prefix: String,
    as_bot: String,
    bots: Arc<BotRegistry>,
}

impl PostMatrixMessage {
    pub fn from_step(step: &WorkflowStep, deps: &RunnerDeps) -> Self {
        Self {
            room: step.meta.get("room").to_string(),
            message_prefix: step.meta.get("messagePrefix").to_string(),
            as_bot: step.meta.get("asBot").to_string(),
            bots: Arc::clone(&deps.bots),
        }
    }

    fn target_room(&self, payload: &Payload) -> Option<String> {
        payload
            .target_room()
            .or_else(|| Some(self.room.trim()).filter(|room| !room.is_empty()))
            .map(str::to_string)
    }

    fn compose(&self, message: &str) -> String {
        match (self.message_prefix.is_empty(), message.is_empty()) {
            (true, _) => message.to_string(),
            (false, true) => self.message_prefix.clone(),
            (false, false) => format!("{}\n{}", self.message_prefix, message),
        }
    }
}

#[async_trait]
impl StepRunner for PostMatrixMessage {
    fn variety(&self) -> &str {
        super::POST_MATRIX_MESSAGE
    }

    async fn run(&self, payload: Payload) -> Result<Payload, StepError> {
        let room = self
            .target_room(&payload)
            .ok_or_else(|| StepError::Validation("no room to post to".to_string()))?;
        let address = RoomAddress::parse(&room)?;
        let session = self.bots.resolve(&self.as_bot)?;

        let room_id = match address {
            RoomAddress::Id(id) => id,
            RoomAddress::Alias(alias) => session.resolve_alias(&alias).await?,
        };

        let text = self.compose(&payload.message);
        session.send_message(&room_id, &text).await?;
        tracing::debug!("💬 Posted to {} as '{}'", room_id, session.bot_id());

        // Empty text still goes out but is reported as a failed post.
        if text.is_empty() {
            return Err(StepError::Validation("message text is empty".to_string()));
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::MessagingSession;
    use crate::runtime::error::ErrorKind;
    use crate::runtime::steps::test_support::RecordingSession;
    use crate::workflow::{Bot, StepMeta};

    fn bot(id: &str, primary: bool) -> Bot {
        Bot {
            id: id.into(),
            display_name: id.into(),
            user_id: format!("@{id}:example.org"),
            password: String::new(),
            homeserver_url: None,
            active: true,
            primary,
        }
    }

    fn setup(meta: &[(&str, &str)], sessions: Vec<(Bot, Arc<RecordingSession>)>) -> PostMatrixMessage {
        let entries = sessions
            .into_iter()
            .map(|(bot, session)| (bot, session as Arc<dyn MessagingSession>))
            .collect();
        let deps = RunnerDeps::new(Arc::new(BotRegistry::from_sessions(entries)), reqwest::Client::new());
        let step = WorkflowStep {
            id: "post".into(),
            workflow_id: "wf".into(),
            variety: super::super::POST_MATRIX_MESSAGE.into(),
            sort_order: 0,
            active: true,
            meta: meta.iter().copied().collect::<StepMeta>(),
        };
        PostMatrixMessage::from_step(&step, &deps)
    }

    #[tokio::test]
    async fn prefix_and_message_are_joined_by_newline() {
        let primary = Arc::new(RecordingSession::named("main"));
        let runner = setup(
            &[("room", "!room:example.org"), ("messagePrefix", "Test!")],
            vec![(bot("main", true), Arc::clone(&primary))],
        );

        runner.run(Payload::with_message("Message!")).await.unwrap();
        assert_eq!(
            primary.sent(),
            vec![("!room:example.org".to_string(), "Test!\nMessage!".to_string())]
        );
    }

    #[tokio::test]
    async fn message_alone_without_prefix() {
        let primary = Arc::new(RecordingSession::named("main"));
        let runner = setup(&[("room", "!room:example.org")], vec![(bot("main", true), Arc::clone(&primary))]);

        runner.run(Payload::with_message("Message!")).await.unwrap();
        assert_eq!(primary.sent()[0].1, "Message!");
    }

    #[tokio::test]
    async fn prefix_alone_without_message() {
        let primary = Arc::new(RecordingSession::named("main"));
        let runner = setup(
            &[("room", "!room:example.org"), ("messagePrefix", "Heads up")],
            vec![(bot("main", true), Arc::clone(&primary))],
        );

        runner.run(Payload::default()).await.unwrap();
        assert_eq!(primary.sent()[0].1, "Heads up");
    }

    #[tokio::test]
    async fn empty_text_is_still_sent_but_reported() {
        let primary = Arc::new(RecordingSession::named("main"));
        let runner = setup(&[("room", "!room:example.org")], vec![(bot("main", true), Arc::clone(&primary))]);

        let err = runner.run(Payload::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(primary.sent(), vec![("!room:example.org".to_string(), String::new())]);
    }

    #[tokio::test]
    async fn payload_room_overrides_step_room() {
        let primary = Arc::new(RecordingSession::named("main"));
        let runner = setup(&[("room", "!step:example.org")], vec![(bot("main", true), Arc::clone(&primary))]);

        runner
            .run(Payload::with_message("hi").in_room("!payload:example.org"))
            .await
            .unwrap();
        assert_eq!(primary.sent()[0].0, "!payload:example.org");
    }

    #[tokio::test]
    async fn aliases_are_resolved_through_the_session() {
        let mut session = RecordingSession::named("main");
        session
            .aliases
            .insert("#general:example.org".into(), "!resolved:example.org".into());
        let primary = Arc::new(session);
        let runner = setup(&[("room", "#general:example.org")], vec![(bot("main", true), Arc::clone(&primary))]);

        runner.run(Payload::with_message("hi")).await.unwrap();
        assert_eq!(primary.sent()[0].0, "!resolved:example.org");

        let err = setup(&[("room", "#missing:example.org")], vec![(bot("main", true), primary)])
            .run(Payload::with_message("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }

    #[tokio::test]
    async fn as_bot_selects_a_named_session() {
        let primary = Arc::new(RecordingSession::named("main"));
        let helper = Arc::new(RecordingSession::named("helper"));
        let runner = setup(
            &[("room", "!room:example.org"), ("asBot", "helper")],
            vec![
                (bot("main", true), Arc::clone(&primary)),
                (bot("helper", false), Arc::clone(&helper)),
            ],
        );

        runner.run(Payload::with_message("hi")).await.unwrap();
        assert!(primary.sent().is_empty());
        assert_eq!(helper.sent().len(), 1);
    }

    #[tokio::test]
    async fn failures_are_classified() {
        let primary = Arc::new(RecordingSession::named("main"));

        let no_room = setup(&[], vec![(bot("main", true), Arc::clone(&primary))]);
        assert_eq!(
            no_room.run(Payload::with_message("hi")).await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        let bad_room = setup(&[("room", "lobby")], vec![(bot("main", true), Arc::clone(&primary))]);
        assert_eq!(
            bad_room.run(Payload::with_message("hi")).await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        let unknown_bot = setup(
            &[("room", "!room:example.org"), ("asBot", "ghost")],
            vec![(bot("main", true), Arc::clone(&primary))],
        );
        assert_eq!(
            unknown_bot.run(Payload::with_message("hi")).await.unwrap_err().kind(),
            ErrorKind::Resolution
        );
        assert!(primary.sent().is_empty());

        let mut refusing = RecordingSession::named("main");
        refusing.fail_sends = true;
        let send_fails = setup(&[("room", "!room:example.org")], vec![(bot("main", true), Arc::new(refusing))]);
        assert_eq!(
            send_fails.run(Payload::with_message("hi")).await.unwrap_err().kind(),
            ErrorKind::Transport
        );
    }
}
