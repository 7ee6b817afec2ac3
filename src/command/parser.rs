/// Chat command parsing
///
/// Turns a raw chat line such as `!echo hello world` into a command name and
/// positional arguments.

use std::collections::{BTreeMap, HashMap};

/// Character that marks a chat line as a command
pub const TRIGGER: char = '!';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// Verb after the trigger character; empty means "no command"
    pub name: String,
    /// Positional arguments keyed by index
    pub args: BTreeMap<usize, String>,
    /// Context such as the source room and sender
    pub meta: HashMap<String, String>,
}

impl Command {
    /// Split on whitespace; the first token minus the trigger is the name
    pub fn parse(raw: &str) -> Self {
        let mut tokens = raw.split_whitespace();

        let name = tokens
            .next()
            .map(|first| first.strip_prefix(TRIGGER).unwrap_or(first))
            .unwrap_or_default()
            .to_string();
        let args = tokens
            .enumerate()
            .map(|(index, token)| (index, token.to_string()))
            .collect();

        Self {
            name,
            args,
            meta: HashMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// True when no command name could be extracted
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(&index).map(String::as_str)
    }

    /// Arguments in positional order, joined by single spaces
    pub fn joined_args(&self) -> String {
        self.args.values().map(String::as_str).collect::<Vec<_>>().join(" ")
    }

    /// Meta value for `key`, or "" when absent
    pub fn meta(&self, key: &str) -> &str {
        self.meta.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Whether a chat line is addressed to the command catalog at all
pub fn is_command_line(raw: &str) -> bool {
    raw.trim_start().starts_with(TRIGGER)
}
