/// Room addressing for the Matrix protocol
///
/// `!opaque:domain` names a room directly; `#alias:domain` must be resolved
/// through the homeserver directory before a message can be sent.

use crate::bot::session::SessionError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAddress {
    /// Canonical room id
    Id(String),
    /// Alias needing resolution
    Alias(String),
}

impl RoomAddress {
    /// Validate a room identifier or alias
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let raw = raw.trim();
        let invalid = || SessionError::InvalidRoom(raw.to_string());

        let sigil = raw.chars().next().ok_or_else(invalid)?;
        let (localpart, domain) = raw[sigil.len_utf8()..].split_once(':').ok_or_else(invalid)?;
        if localpart.is_empty() || domain.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        match sigil {
            '!' => Ok(RoomAddress::Id(raw.to_string())),
            '#' => Ok(RoomAddress::Alias(raw.to_string())),
            _ => Err(invalid()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoomAddress::Id(id) => id,
            RoomAddress::Alias(alias) => alias,
        }
    }
}

impl fmt::Display for RoomAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_ids_and_aliases_parse() {
        assert_eq!(
            RoomAddress::parse("!abc123:example.org").unwrap(),
            RoomAddress::Id("!abc123:example.org".into())
        );
        assert_eq!(
            RoomAddress::parse(" #general:example.org ").unwrap(),
            RoomAddress::Alias("#general:example.org".into())
        );
    }

    #[test]
    fn malformed_rooms_are_rejected() {
        for raw in ["", "general", "!nodomain", "#:example.org", "!abc:", "@user:example.org", "!a b:c"] {
            assert!(
                matches!(RoomAddress::parse(raw), Err(SessionError::InvalidRoom(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
