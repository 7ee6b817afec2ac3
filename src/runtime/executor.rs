/// Step runner contract and the variety registry
///
/// Each stored step names a `variety`; the catalog maps that tag to a
/// constructor which reads the step's meta and yields a runner. New varieties
/// are added by registering a constructor, never by touching the engine.

use crate::bot::BotRegistry;
use crate::runtime::error::StepError;
use crate::runtime::steps;
use crate::workflow::{Payload, WorkflowStep};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    fmt,
    io::Write,
    sync::{Arc, Mutex},
};

/// One configured unit of work
///
/// Runners take the payload by value and hand back the payload for the next
/// step. On error the engine resumes from its own copy of the input.
#[async_trait]
pub trait StepRunner: Send + Sync {
    fn variety(&self) -> &str;

    async fn run(&self, payload: Payload) -> Result<Payload, StepError>;
}

pub type RunnerConstructor =
    Arc<dyn Fn(&WorkflowStep, &RunnerDeps) -> Box<dyn StepRunner> + Send + Sync>;

/// Shared resources runners are built from
#[derive(Clone, Debug)]
pub struct RunnerDeps {
    /// Sessions for postMatrixMessage and filterOnlineUsers
    pub bots: Arc<BotRegistry>,
    /// Shared client; its timeout bounds every external call
    pub http: reqwest::Client,
    /// Fixed header attached to fetchDataExternal requests
    pub external_auth: ExternalAuth,
    /// Destination for stdOut and sendEmail
    pub output: OutputSink,
}

impl RunnerDeps {
    pub fn new(bots: Arc<BotRegistry>, http: reqwest::Client) -> Self {
        Self {
            bots,
            http,
            external_auth: ExternalAuth::default(),
            output: OutputSink::stdout(),
        }
    }

    pub fn with_external_auth(mut self, auth: ExternalAuth) -> Self {
        self.external_auth = auth;
        self
    }

    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }
}

/// Header name/value pair sent to external services
#[derive(Clone, Default)]
pub struct ExternalAuth {
    pub header: String,
    pub value: String,
}

impl fmt::Debug for ExternalAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalAuth")
            .field("header", &self.header)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Variety tag → runner constructor
pub struct RunnerCatalog {
    constructors: HashMap<String, RunnerConstructor>,
}

impl Default for RunnerCatalog {
    /// Catalog with every built-in variety
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.register(steps::POST_MATRIX_MESSAGE, |step, deps| {
            Box::new(steps::PostMatrixMessage::from_step(step, deps))
        });
        catalog.register(steps::STD_OUT, |_, deps| Box::new(steps::StdOut::new(deps)));
        catalog.register(steps::FETCH_DATA_EXTERNAL, |step, deps| {
            Box::new(steps::FetchDataExternal::from_step(step, deps))
        });
        catalog.register(steps::FILTER_ONLINE_USERS, |_, deps| {
            Box::new(steps::FilterOnlineUsers::new(deps))
        });
        catalog.register(steps::FORMAT_MESSAGE, |step, _| {
            Box::new(steps::FormatMessage::from_step(step))
        });
        catalog.register(steps::SEND_EMAIL, |step, deps| {
            Box::new(steps::SendEmail::from_step(step, deps))
        });
        catalog
    }
}

impl RunnerCatalog {
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Add or replace the constructor for `variety`
    pub fn register<F>(&mut self, variety: &str, constructor: F)
    where
        F: Fn(&WorkflowStep, &RunnerDeps) -> Box<dyn StepRunner> + Send + Sync + 'static,
    {
        self.constructors
            .insert(variety.to_string(), Arc::new(constructor));
    }

    /// Runner for a step, or None when the variety is unknown
    pub fn instantiate(&self, step: &WorkflowStep, deps: &RunnerDeps) -> Option<Box<dyn StepRunner>> {
        self.constructors
            .get(&step.variety)
            .map(|constructor| constructor(step, deps))
    }

    pub fn varieties(&self) -> Vec<String> {
        let mut varieties: Vec<String> = self.constructors.keys().cloned().collect();
        varieties.sort();
        varieties
    }
}

impl fmt::Debug for RunnerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerCatalog")
            .field("varieties", &self.varieties())
            .finish()
    }
}

/// Process output stream shared by runs
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputSink {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Sink writing into memory, plus a handle to read what was written
    pub fn capture() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        (Self::new(captured.clone()), captured)
    }

    /// Write `text` verbatim and flush
    pub fn write_text(&self, text: &str) {
        let mut writer = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writer.write_all(text.as_bytes()).and_then(|_| writer.flush()) {
            tracing::warn!("⚠️ Failed to write step output: {}", e);
        }
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OutputSink")
    }
}

/// In-memory output buffer
#[derive(Clone, Default)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    pub fn contents(&self) -> String {
        let buffer = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
