//! Built-in link commands.
//!
//! Command bytes 0x00-0x1F are the reserved link range: protocol-neutral
//! management commands every cmdlink instrument answers, independent of the
//! application command set. Printable ASCII (0x20 and up) belongs to the
//! application.

use cmdlink_wire::Status;

use crate::table::Dispatcher;

/// Link command: liveness probe (ASCII ENQ). Always answered with ACK.
pub const CMD_PING: u8 = 0x05;

/// Link command: resynchronization point (ASCII SUB).
///
/// A host that has lost track of the exchange sends SYNC and discards
/// everything until the ACK. No device state is touched.
pub const CMD_SYNC: u8 = 0x1A;

/// Last command byte of the reserved link range.
pub const RESERVED_COMMAND_END: u8 = 0x1F;

/// First command byte available to the application.
pub const USER_COMMAND_START: u8 = 0x20;

/// Returns a human-readable name for a command byte.
pub fn command_name(command: u8) -> &'static str {
    match command {
        CMD_PING => "PING",
        CMD_SYNC => "SYNC",
        0x00..=RESERVED_COMMAND_END => "RESERVED",
        _ => "USER",
    }
}

/// Install the built-in link commands into a dispatcher.
pub fn install(dispatcher: &mut Dispatcher) {
    dispatcher.register(CMD_PING, |_| Ok(Status::Ack));
    dispatcher.register(CMD_SYNC, |_| Ok(Status::Ack));
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use cmdlink_wire::USB;

    use super::*;

    #[test]
    fn ping_and_sync_are_acked_by_default() {
        let mut dispatcher = Dispatcher::new();
        let mut reply = Cursor::new(Vec::<u8>::new());

        assert_eq!(
            dispatcher.process_command(CMD_PING, USB, &mut reply),
            Status::Ack
        );
        assert_eq!(
            dispatcher.process_command(CMD_SYNC, USB, &mut reply),
            Status::Ack
        );
        assert!(reply.into_inner().is_empty(), "builtins send no payload");
    }

    #[test]
    fn command_names() {
        assert_eq!(command_name(CMD_PING), "PING");
        assert_eq!(command_name(CMD_SYNC), "SYNC");
        assert_eq!(command_name(0x01), "RESERVED");
        assert_eq!(command_name(b'a'), "USER");
    }

    #[test]
    fn ranges_are_adjacent() {
        assert_eq!(RESERVED_COMMAND_END + 1, USER_COMMAND_START);
        assert!(CMD_PING <= RESERVED_COMMAND_END);
        assert!(CMD_SYNC <= RESERVED_COMMAND_END);
    }
}
