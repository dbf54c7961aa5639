//! Command dispatch for single-byte instrument links.
//!
//! This is the "firmware main loop" layer. A [`Dispatcher`] maps command
//! bytes to handlers and turns every `(command, source)` pair into exactly
//! one status byte; a [`Session`] pumps bytes between a port and the
//! dispatcher the way device firmware services its command channel.

pub mod builtin;
pub mod error;
pub mod handler;
pub mod session;
pub mod table;

pub use builtin::{command_name, CMD_PING, CMD_SYNC, RESERVED_COMMAND_END, USER_COMMAND_START};
pub use error::{DispatchError, Result};
pub use handler::{CommandHandler, Context, HandlerError};
pub use session::{Session, SessionSummary};
pub use table::{DispatchConfig, Dispatcher};
