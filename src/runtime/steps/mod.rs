/// Built-in step runners
///
/// One module per variety. Each runner is built from the step's meta with
/// empty-string defaults, so a missing key never panics; it is reported by
/// the runner when the value is actually required.

mod fetch_external;
mod filter_online;
mod format_message;
mod post_message;
mod send_email;
mod std_out;

pub use fetch_external::FetchDataExternal;
pub use filter_online::FilterOnlineUsers;
pub use format_message::FormatMessage;
pub use post_message::PostMatrixMessage;
pub use send_email::SendEmail;
pub use std_out::StdOut;

pub const POST_MATRIX_MESSAGE: &str = "postMatrixMessage";
pub const STD_OUT: &str = "stdOut";
pub const FETCH_DATA_EXTERNAL: &str = "fetchDataExternal";
pub const FILTER_ONLINE_USERS: &str = "filterOnlineUsers";
pub const FORMAT_MESSAGE: &str = "formatMessage";
pub const SEND_EMAIL: &str = "sendEmail";
