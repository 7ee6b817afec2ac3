/// Chat command trigger
///
/// Inbound chat lines starting with `!` are parsed, validated by the command
/// catalog and either answered with a usage hint or dispatched to every
/// workflow bound to the command name.

use crate::bot::{BotRegistry, RoomAddress};
use crate::command::{is_command_line, Command, CommandCatalog};
use crate::trigger::{DispatchResult, TriggerDispatcher, WorkflowSelector};
use serde::Serialize;
use std::sync::Arc;

/// What became of one chat line
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Not addressed to the bot
    Ignored,
    /// Invalid or unknown command; the hint was sent back to the room
    Rejected { hint: String },
    /// Valid command handed to the matching workflows
    Dispatched {
        command: String,
        runs: Vec<DispatchResult>,
    },
}

pub struct CommandTrigger {
    catalog: Arc<CommandCatalog>,
    dispatcher: Arc<TriggerDispatcher>,
    bots: Arc<BotRegistry>,
}

impl CommandTrigger {
    pub fn new(catalog: Arc<CommandCatalog>, dispatcher: Arc<TriggerDispatcher>, bots: Arc<BotRegistry>) -> Self {
        Self {
            catalog,
            dispatcher,
            bots,
        }
    }

    /// Handle a chat line `body` posted by `sender` in `room`
    pub async fn handle(&self, room: &str, sender: &str, body: &str) -> CommandOutcome {
        if !is_command_line(body) {
            return CommandOutcome::Ignored;
        }

        let command = Command::parse(body.trim())
            .with_meta("room", room)
            .with_meta("sender", sender);
        if command.is_empty() {
            return CommandOutcome::Ignored;
        }

        tracing::info!("💬 Command '{}' from {} in {}", command.name, sender, room);

        let runnable = self.catalog.build_command(command);
        if !runnable.valid() {
            let hint = runnable.usage_hints();
            tracing::debug!("⚠️ Rejected '{}': {}", runnable.name(), hint);
            self.reply(room, &hint).await;
            return CommandOutcome::Rejected { hint };
        }

        let name = runnable.name().to_ascii_lowercase();
        let runs = self
            .dispatcher
            .fire(WorkflowSelector::Command(name.clone()), runnable.workflow_payload())
            .await;
        if runs.is_empty() {
            tracing::warn!("⚠️ No active workflow handles command '{}'", name);
        }

        CommandOutcome::Dispatched { command: name, runs }
    }

    /// Send `text` to `room` as the primary bot; failures are only logged
    async fn reply(&self, room: &str, text: &str) {
        let session = match self.bots.get_primary_client() {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("❌ Cannot reply in {}: {}", room, e);
                return;
            }
        };

        let room_id = match RoomAddress::parse(room) {
            Ok(RoomAddress::Id(id)) => id,
            Ok(RoomAddress::Alias(alias)) => match session.resolve_alias(&alias).await {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!("❌ Cannot reply in {}: {}", room, e);
                    return;
                }
            },
            Err(e) => {
                tracing::error!("❌ Cannot reply in {}: {}", room, e);
                return;
            }
        };

        if let Err(e) = session.send_message(&room_id, text).await {
            tracing::error!("❌ Failed to send usage hint to {}: {}", room_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::MessagingSession;
    use crate::runtime::engine::ExecutionEngine;
    use crate::runtime::executor::{CapturedOutput, OutputSink, RunnerCatalog, RunnerDeps};
    use crate::runtime::steps::test_support::RecordingSession;
    use crate::workflow::registry::WorkflowRegistry;
    use crate::workflow::storage::StepSource;
    use crate::workflow::{Bot, StepMeta, TriggerSpec, Workflow, WorkflowStep};
    use async_trait::async_trait;

    struct PrintSteps;

    #[async_trait]
    impl StepSource for PrintSteps {
        async fn find_active_steps(&self, workflow_id: &str) -> anyhow::Result<Vec<WorkflowStep>> {
            Ok(vec![WorkflowStep {
                id: "print".into(),
                workflow_id: workflow_id.to_string(),
                variety: "stdOut".into(),
                sort_order: 0,
                active: true,
                meta: StepMeta::default(),
            }])
        }
    }

    fn setup() -> (CommandTrigger, Arc<RecordingSession>, CapturedOutput) {
        let session = Arc::new(RecordingSession::named("main"));
        let bot = Bot {
            id: "main".into(),
            display_name: "Main".into(),
            user_id: "@main:example.org".into(),
            password: String::new(),
            homeserver_url: None,
            active: true,
            primary: true,
        };
        let bots = Arc::new(BotRegistry::from_sessions(vec![(
            bot,
            Arc::clone(&session) as Arc<dyn MessagingSession>,
        )]));

        let (sink, captured) = OutputSink::capture();
        let deps = RunnerDeps::new(Arc::clone(&bots), reqwest::Client::new()).with_output(sink);
        let engine = ExecutionEngine::new(Arc::new(PrintSteps), Arc::new(RunnerCatalog::default()), deps);
        let registry = WorkflowRegistry::from_workflows(vec![Workflow {
            id: "wf-echo".into(),
            name: "Echo".into(),
            active: true,
            trigger: TriggerSpec::Command { name: "echo".into() },
        }]);
        let dispatcher = Arc::new(TriggerDispatcher::new(Arc::new(registry), Arc::new(engine)));

        let trigger = CommandTrigger::new(Arc::new(CommandCatalog::default()), dispatcher, bots);
        (trigger, session, captured)
    }

    #[tokio::test]
    async fn plain_chat_is_ignored() {
        let (trigger, session, captured) = setup();
        assert!(matches!(trigger.handle("!r:x", "@ann:x", "hello there").await, CommandOutcome::Ignored));
        assert!(matches!(trigger.handle("!r:x", "@ann:x", "!").await, CommandOutcome::Ignored));
        assert!(session.sent().is_empty());
        assert!(captured.contents().is_empty());
    }

    #[tokio::test]
    async fn valid_command_runs_bound_workflows() {
        let (trigger, session, captured) = setup();

        match trigger.handle("!r:x", "@ann:x", "!echo good morning").await {
            CommandOutcome::Dispatched { command, runs } => {
                assert_eq!(command, "echo");
                assert_eq!(runs.len(), 1);
                assert_eq!(runs[0].workflow_id, "wf-echo");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(captured.contents(), ">>good morning\n");
        assert!(session.sent().is_empty());
    }

    #[tokio::test]
    async fn invalid_command_gets_a_hint_and_no_run() {
        let (trigger, session, captured) = setup();

        let outcome = trigger.handle("!r:x", "@ann:x", "!echo").await;
        let hint = match outcome {
            CommandOutcome::Rejected { hint } => hint,
            other => panic!("expected rejection, got {other:?}"),
        };
        assert!(hint.contains("!echo"));
        assert_eq!(session.sent(), vec![("!r:x".to_string(), hint)]);
        assert!(captured.contents().is_empty());
    }

    #[tokio::test]
    async fn unknown_command_lists_what_is_available() {
        let (trigger, session, _) = setup();

        let outcome = trigger.handle("!r:x", "@ann:x", "!dance now").await;
        let hint = match outcome {
            CommandOutcome::Rejected { hint } => hint,
            other => panic!("expected rejection, got {other:?}"),
        };
        assert_eq!(hint, "Unrecognized command \"dance\". Available commands: !echo, !polyglots");
        assert_eq!(session.sent().len(), 1);
    }
}
