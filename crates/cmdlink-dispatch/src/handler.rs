use std::io::Write;

use cmdlink_wire::{transmit, Result as WireResult, Status};

/// What a handler sees while executing one command.
///
/// The reply sink feeds the same transmit primitive the status byte will use,
/// so a handler can stream payload bytes back before its status goes out.
pub struct Context<'a> {
    /// The command byte being processed.
    pub command: u8,
    /// Where the command byte came from (see `cmdlink_wire::source`).
    pub source: u8,
    reply: &'a mut dyn Write,
}

impl<'a> Context<'a> {
    pub(crate) fn new(command: u8, source: u8, reply: &'a mut dyn Write) -> Self {
        Self {
            command,
            source,
            reply,
        }
    }

    /// Transmit one reply byte ahead of the status byte.
    pub fn reply_byte(&mut self, tx: u8) -> WireResult<()> {
        transmit(self.reply, tx)
    }

    /// Transmit a run of reply bytes ahead of the status byte.
    pub fn reply_all(&mut self, bytes: &[u8]) -> WireResult<()> {
        for &byte in bytes {
            transmit(self.reply, byte)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("command", &format_args!("0x{:02X}", self.command))
            .field("source", &self.source)
            .finish()
    }
}

/// A failure reported by a command handler.
///
/// Handlers report *what* failed; the dispatcher decides the status byte
/// (NAK, or BUSY for [`HandlerError::busy`]).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    busy: bool,
}

impl HandlerError {
    /// Execution failed; the command will be answered with NAK.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            busy: false,
        }
    }

    /// The device cannot take the command right now; answered with BUSY.
    pub fn busy() -> Self {
        Self {
            message: "device busy".to_string(),
            busy: true,
        }
    }

    /// True when this failure should map to [`Status::Busy`].
    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

/// One entry in the command table.
pub trait CommandHandler {
    /// Process the command in `ctx`, returning the status to put on the wire.
    fn execute(&mut self, ctx: &mut Context<'_>) -> Result<Status, HandlerError>;
}

impl<F> CommandHandler for F
where
    F: FnMut(&mut Context<'_>) -> Result<Status, HandlerError>,
{
    fn execute(&mut self, ctx: &mut Context<'_>) -> Result<Status, HandlerError> {
        self(ctx)
    }
}
