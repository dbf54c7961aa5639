//! Built-in source identifiers.
//!
//! The dispatcher's second parameter: one byte naming where a command byte
//! came from. Sources 0x00-0x0F are reserved for built-in use; 0x10-0xFF
//! are available for application-defined ports.

/// USB-CDC endpoint.
pub const USB: u8 = 0x00;

/// Hardware UART.
pub const SERIAL: u8 = 0x01;

/// In-process loopback (tests, mock instruments).
pub const LOOPBACK: u8 = 0x02;

/// First application-defined source identifier.
pub const USER_SOURCE_START: u8 = 0x10;

/// Returns a human-readable name for a source identifier.
pub fn source_name(id: u8) -> &'static str {
    match id {
        USB => "USB",
        SERIAL => "SERIAL",
        LOOPBACK => "LOOPBACK",
        0x03..=0x0F => "RESERVED",
        _ => "USER",
    }
}

/// Returns true if the source identifier is in the reserved range.
pub fn is_reserved(id: u8) -> bool {
    id < USER_SOURCE_START
}

/// Returns true if the source identifier names a built-in source.
pub fn is_builtin(id: u8) -> bool {
    id <= LOOPBACK
}
