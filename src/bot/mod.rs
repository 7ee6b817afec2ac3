/// Bot sessions
///
/// Messaging capability consumed by step runners, the Matrix client that
/// provides it, room addressing rules, and the startup-built registry that
/// maps bot identifiers to sessions.

pub mod matrix;
pub mod registry;
pub mod room;
pub mod session;

pub use matrix::{MatrixConnector, MatrixSession};
pub use registry::{BotError, BotRegistry};
pub use room::RoomAddress;
pub use session::{MessagingSession, Presence, SessionConnector, SessionError};
