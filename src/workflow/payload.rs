/// The record threaded through one workflow run
///
/// A trigger creates it, every step runner takes it by value and hands back
/// the (possibly transformed) record, and the engine drops it once the run
/// report is produced. It is never persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payload {
    /// Target room (canonical `!id:domain` or alias `#name:domain`)
    pub room: Option<String>,
    /// User identifiers the steps operate on; order carries no meaning
    pub users: Vec<String>,
    /// Message text, built up by formatting steps
    pub message: String,
    /// Step-to-step side channel (e.g. extra parameters for external calls)
    pub context: HashMap<String, String>,
}

impl Payload {
    /// Payload carrying only a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set the target room, treating an empty string as "no room"
    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        let room = room.into();
        self.room = if room.trim().is_empty() { None } else { Some(room) };
        self
    }

    /// Room set on the payload, ignoring blank values
    pub fn target_room(&self) -> Option<&str> {
        self.room
            .as_deref()
            .map(str::trim)
            .filter(|room| !room.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_decode_to_defaults() {
        let payload: Payload = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(payload.message, "hi");
        assert!(payload.room.is_none());
        assert!(payload.users.is_empty());
        assert!(payload.context.is_empty());
    }

    #[test]
    fn blank_room_is_no_room() {
        let payload = Payload::with_message("x").in_room("  ");
        assert_eq!(payload.target_room(), None);

        let payload = Payload::with_message("x").in_room("!abc:example.org");
        assert_eq!(payload.target_room(), Some("!abc:example.org"));
    }
}
