/// Chat commands
///
/// Parsing of raw chat lines and the catalog that validates them and seeds
/// the payload for command-triggered workflows.

pub mod catalog;
pub mod parser;

pub use catalog::{CommandCatalog, Runnable};
pub use parser::{is_command_line, Command, TRIGGER};
