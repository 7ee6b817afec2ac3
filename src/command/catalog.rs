/// Command catalog
///
/// Maps a command name to a constructor that validates arguments and seeds
/// the payload a command-triggered workflow starts from. Unknown names get a
/// fallback that is never valid and explains what was not understood.

use crate::command::parser::{Command, TRIGGER};
use crate::workflow::Payload;
use std::collections::BTreeMap;

/// A parsed command ready to be checked and turned into a payload
pub trait Runnable: Send + Sync {
    /// Command name used to select workflows
    fn name(&self) -> &str;

    /// True only when the required arguments are present
    fn valid(&self) -> bool;

    /// Human-readable example invocation
    fn usage_hints(&self) -> String;

    /// Seed payload handed to the engine
    fn workflow_payload(&self) -> Payload;
}

pub type CommandConstructor = fn(Command) -> Box<dyn Runnable>;

pub struct CommandCatalog {
    constructors: BTreeMap<String, CommandConstructor>,
}

impl Default for CommandCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.register("echo", |command| Box::new(Echo(command)) as Box<dyn Runnable>);
        catalog.register("polyglots", |command| Box::new(Polyglots(command)) as Box<dyn Runnable>);
        catalog
    }
}

impl CommandCatalog {
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, constructor: CommandConstructor) {
        self.constructors.insert(name.to_ascii_lowercase(), constructor);
    }

    /// Parse a raw chat line and build the matching runnable
    pub fn build(&self, raw: &str) -> Box<dyn Runnable> {
        self.build_command(Command::parse(raw))
    }

    /// Build the runnable for an already-parsed command
    pub fn build_command(&self, command: Command) -> Box<dyn Runnable> {
        match self.constructors.get(&command.name.to_ascii_lowercase()) {
            Some(constructor) => constructor(command),
            None => Box::new(Unrecognized {
                command,
                known: self.names(),
            }),
        }
    }

    /// Registered command names in alphabetical order
    pub fn names(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }
}

/// Repeats its arguments back into the room
struct Echo(Command);

impl Runnable for Echo {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn valid(&self) -> bool {
        !self.0.joined_args().trim().is_empty()
    }

    fn usage_hints(&self) -> String {
        format!("Usage: {TRIGGER}echo <text>  (e.g. {TRIGGER}echo hello everyone)")
    }

    fn workflow_payload(&self) -> Payload {
        Payload::with_message(self.0.joined_args()).in_room(self.0.meta("room"))
    }
}

/// Finds members speaking one of the given languages
///
/// The filter pair travels in the payload context so a later step (usually
/// fetchDataExternal) can apply it.
struct Polyglots(Command);

impl Polyglots {
    fn languages(&self) -> Vec<String> {
        self.0
            .args
            .values()
            .flat_map(|arg| arg.split(','))
            .map(|lang| lang.trim().to_lowercase())
            .filter(|lang| !lang.is_empty())
            .collect()
    }
}

impl Runnable for Polyglots {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn valid(&self) -> bool {
        !self.languages().is_empty()
    }

    fn usage_hints(&self) -> String {
        format!("Usage: {TRIGGER}polyglots <language> [language...]  (e.g. {TRIGGER}polyglots spanish german)")
    }

    fn workflow_payload(&self) -> Payload {
        let languages = self.languages();
        let mut payload = Payload::with_message(format!("Members speaking {}:", languages.join(", ")))
            .in_room(self.0.meta("room"));
        payload.context.insert("filterKey".to_string(), "language".to_string());
        payload.context.insert("filterValue".to_string(), languages.join(","));
        payload
    }
}

/// Fallback for names the catalog does not know
struct Unrecognized {
    command: Command,
    known: Vec<String>,
}

impl Runnable for Unrecognized {
    fn name(&self) -> &str {
        &self.command.name
    }

    fn valid(&self) -> bool {
        false
    }

    fn usage_hints(&self) -> String {
        let known: Vec<String> = self.known.iter().map(|name| format!("{TRIGGER}{name}")).collect();
        format!(
            "Unrecognized command \"{}\". Available commands: {}",
            self.command.name,
            known.join(", ")
        )
    }

    fn workflow_payload(&self) -> Payload {
        Payload::default()
    }
}
