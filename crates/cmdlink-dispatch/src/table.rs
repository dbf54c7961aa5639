use std::io::Write;

use cmdlink_wire::{source_name, Status};
use tracing::{debug, warn};

use crate::builtin::{self, command_name, USER_COMMAND_START};
use crate::error::{DispatchError, Result};
use crate::handler::{CommandHandler, Context, HandlerError};

/// Configuration for dispatcher behavior.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Install the built-in link commands (ping, sync) on construction.
    pub install_builtins: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            install_builtins: true,
        }
    }
}

struct Entry {
    handler: Box<dyn CommandHandler>,
    /// `None` means any source may issue the command.
    sources: Option<Vec<u8>>,
}

/// The command table: maps command bytes to handlers.
///
/// `process_command` is total over `(u8, u8)` — every input pair produces a
/// status byte, and no input can panic the dispatcher. Unknown commands are
/// answered, logged, and otherwise ignored; a noisy line must not take the
/// device down.
pub struct Dispatcher {
    table: [Option<Entry>; 256],
}

impl Dispatcher {
    /// Create a dispatcher with default configuration (built-ins installed).
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    /// Create a dispatcher with explicit configuration.
    pub fn with_config(config: DispatchConfig) -> Self {
        let mut dispatcher = Self {
            table: std::array::from_fn(|_| None),
        };
        if config.install_builtins {
            builtin::install(&mut dispatcher);
        }
        dispatcher
    }

    /// Register a closure for a command byte, accepting it from any source.
    ///
    /// Replaces any previous handler for the same byte. Registrations inside
    /// the reserved link range are accepted but logged; use
    /// [`Dispatcher::try_register`] to refuse them instead.
    pub fn register<F>(&mut self, command: u8, handler: F)
    where
        F: FnMut(&mut Context<'_>) -> std::result::Result<Status, HandlerError> + 'static,
    {
        self.register_entry(command, None, Box::new(handler));
    }

    /// Register a closure that only accepts the command from the given sources.
    ///
    /// Commands arriving from any other source are answered with NAK.
    pub fn register_for<F>(&mut self, command: u8, sources: &[u8], handler: F)
    where
        F: FnMut(&mut Context<'_>) -> std::result::Result<Status, HandlerError> + 'static,
    {
        self.register_entry(command, Some(sources.to_vec()), Box::new(handler));
    }

    /// Register a [`CommandHandler`] implementation (stateful handler types).
    pub fn register_handler(&mut self, command: u8, handler: impl CommandHandler + 'static) {
        self.register_entry(command, None, Box::new(handler));
    }

    /// Register a closure, refusing command bytes in the reserved link range.
    pub fn try_register<F>(&mut self, command: u8, handler: F) -> Result<()>
    where
        F: FnMut(&mut Context<'_>) -> std::result::Result<Status, HandlerError> + 'static,
    {
        if command < USER_COMMAND_START {
            return Err(DispatchError::ReservedCommand(command));
        }
        self.register_entry(command, None, Box::new(handler));
        Ok(())
    }

    fn register_entry(&mut self, command: u8, sources: Option<Vec<u8>>, handler: Box<dyn CommandHandler>) {
        if command < USER_COMMAND_START {
            debug!(
                command = format_args!("0x{command:02X}"),
                name = command_name(command),
                "registering handler in reserved link range"
            );
        }
        self.table[command as usize] = Some(Entry { handler, sources });
    }

    /// Remove the handler for a command byte. Returns true if one was present.
    pub fn unregister(&mut self, command: u8) -> bool {
        self.table[command as usize].take().is_some()
    }

    /// True if a handler is registered for the command byte.
    pub fn is_registered(&self, command: u8) -> bool {
        self.table[command as usize].is_some()
    }

    /// All command bytes with a registered handler, ascending.
    pub fn registered_commands(&self) -> Vec<u8> {
        (0u8..=255)
            .filter(|&command| self.is_registered(command))
            .collect()
    }

    /// Process one command byte from a source and produce its status byte.
    ///
    /// `reply` is the transmit path handlers may use for payload bytes; the
    /// returned status is NOT written to it — the caller owns that, so the
    /// status byte ordering stays in one place.
    pub fn process_command(&mut self, command: u8, source: u8, reply: &mut dyn Write) -> Status {
        let entry = match &mut self.table[command as usize] {
            Some(entry) => entry,
            None => {
                warn!(
                    command = format_args!("0x{command:02X}"),
                    source = source_name(source),
                    "unknown command"
                );
                return Status::Unknown;
            }
        };

        if let Some(sources) = &entry.sources {
            if !sources.contains(&source) {
                warn!(
                    command = format_args!("0x{command:02X}"),
                    source = source_name(source),
                    "command not allowed from this source"
                );
                return Status::Nak;
            }
        }

        let mut ctx = Context::new(command, source, reply);
        match entry.handler.execute(&mut ctx) {
            Ok(status) => {
                debug!(
                    command = format_args!("0x{command:02X}"),
                    source = source_name(source),
                    status = %status,
                    "command processed"
                );
                status
            }
            Err(err) if err.is_busy() => {
                debug!(
                    command = format_args!("0x{command:02X}"),
                    source = source_name(source),
                    "device busy"
                );
                Status::Busy
            }
            Err(err) => {
                warn!(
                    command = format_args!("0x{command:02X}"),
                    source = source_name(source),
                    error = %err,
                    "handler failed"
                );
                Status::Nak
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registered", &self.registered_commands().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use cmdlink_wire::{LOOPBACK, SERIAL, USB};

    use super::*;
    use crate::builtin::CMD_PING;
    use crate::handler::HandlerError;

    fn sink() -> Cursor<Vec<u8>> {
        Cursor::new(Vec::new())
    }

    #[test]
    fn unknown_command_answers_unknown() {
        let mut dispatcher = Dispatcher::with_config(DispatchConfig {
            install_builtins: false,
        });
        let status = dispatcher.process_command(0x99, USB, &mut sink());
        assert_eq!(status, Status::Unknown);
    }

    #[test]
    fn registered_handler_decides_status() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(0x41, |_| Ok(Status::Ack));
        dispatcher.register(0x42, |_| Ok(Status::Nak));

        assert_eq!(dispatcher.process_command(0x41, USB, &mut sink()), Status::Ack);
        assert_eq!(dispatcher.process_command(0x42, USB, &mut sink()), Status::Nak);
    }

    #[test]
    fn handler_error_maps_to_nak() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(0x43, |_| {
            Err(HandlerError::new("motor stalled"))
        });
        assert_eq!(dispatcher.process_command(0x43, USB, &mut sink()), Status::Nak);
    }

    #[test]
    fn busy_error_maps_to_busy() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(0x44, |_| Err(HandlerError::busy()));
        assert_eq!(
            dispatcher.process_command(0x44, USB, &mut sink()),
            Status::Busy
        );
    }

    #[test]
    fn source_restriction_naks_other_sources() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register_for(0x45, &[USB], |_| Ok(Status::Ack));

        assert_eq!(dispatcher.process_command(0x45, USB, &mut sink()), Status::Ack);
        assert_eq!(
            dispatcher.process_command(0x45, SERIAL, &mut sink()),
            Status::Nak
        );
        assert_eq!(
            dispatcher.process_command(0x45, LOOPBACK, &mut sink()),
            Status::Nak
        );
    }

    #[test]
    fn every_input_pair_produces_a_status() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(0x20, |_| Ok(Status::Ack));

        let mut reply = sink();
        for command in 0u8..=255 {
            for source in [USB, SERIAL, LOOPBACK, 0x10, 0xFF] {
                let _ = dispatcher.process_command(command, source, &mut reply);
            }
        }
    }

    #[test]
    fn handler_sees_command_and_source() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(0x46, |ctx| {
            assert_eq!(ctx.command, 0x46);
            assert_eq!(ctx.source, SERIAL);
            Ok(Status::Ack)
        });
        dispatcher.process_command(0x46, SERIAL, &mut sink());
    }

    #[test]
    fn handler_reply_bytes_precede_status_on_the_callers_wire() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(b'v', |ctx| {
            ctx.reply_all(b"1.0").map_err(|e| HandlerError::new(e.to_string()))?;
            Ok(Status::Ack)
        });

        let mut reply = sink();
        let status = dispatcher.process_command(b'v', USB, &mut reply);
        assert_eq!(status, Status::Ack);
        // The dispatcher writes only the payload; the status byte is the caller's.
        assert_eq!(reply.into_inner(), b"1.0");
    }

    #[test]
    fn unregister_and_is_registered() {
        let mut dispatcher = Dispatcher::with_config(DispatchConfig {
            install_builtins: false,
        });
        assert!(!dispatcher.is_registered(0x50));
        dispatcher.register(0x50, |_| Ok(Status::Ack));
        assert!(dispatcher.is_registered(0x50));
        assert!(dispatcher.unregister(0x50));
        assert!(!dispatcher.unregister(0x50));
        assert_eq!(
            dispatcher.process_command(0x50, USB, &mut sink()),
            Status::Unknown
        );
    }

    #[test]
    fn try_register_refuses_reserved_range() {
        let mut dispatcher = Dispatcher::new();
        let err = dispatcher
            .try_register(CMD_PING, |_| Ok(Status::Ack))
            .unwrap_err();
        assert!(matches!(err, DispatchError::ReservedCommand(_)));

        dispatcher
            .try_register(0x20, |_| Ok(Status::Ack))
            .unwrap();
    }

    #[test]
    fn replacing_a_handler_takes_effect() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(0x51, |_| Ok(Status::Nak));
        dispatcher.register(0x51, |_| Ok(Status::Ack));
        assert_eq!(dispatcher.process_command(0x51, USB, &mut sink()), Status::Ack);
    }

    #[test]
    fn registered_commands_lists_builtins() {
        let dispatcher = Dispatcher::new();
        let commands = dispatcher.registered_commands();
        assert!(commands.contains(&CMD_PING));
    }

    #[test]
    fn stateful_handler_mutates_across_calls() {
        let mut dispatcher = Dispatcher::new();
        let mut count = 0u32;
        dispatcher.register(0x52, move |ctx| {
            count += 1;
            ctx.reply_byte(count as u8)
                .map_err(|e| HandlerError::new(e.to_string()))?;
            Ok(Status::Ack)
        });

        let mut reply = sink();
        dispatcher.process_command(0x52, USB, &mut reply);
        dispatcher.process_command(0x52, USB, &mut reply);
        assert_eq!(reply.into_inner(), vec![1, 2]);
    }
}
