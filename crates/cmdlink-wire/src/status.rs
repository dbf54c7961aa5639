//! Link status vocabulary.
//!
//! The dispatcher answers every command byte with exactly one status byte.
//! The vocabulary uses ASCII control bytes, plus `'?'` for commands the
//! instrument does not recognize. These values are a wire contract and
//! must never change.

/// Result of processing one command byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Command accepted and executed (ASCII ACK).
    Ack = 0x06,
    /// Command recognized, execution failed (ASCII NAK).
    Nak = 0x15,
    /// Device busy, retry later (ASCII SYN).
    Busy = 0x16,
    /// Command byte not in the table (ASCII `'?'`).
    Unknown = 0x3F,
}

impl Status {
    /// The wire representation of this status.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Parse a received status byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x06 => Some(Self::Ack),
            0x15 => Some(Self::Nak),
            0x16 => Some(Self::Busy),
            0x3F => Some(Self::Unknown),
            _ => None,
        }
    }

    /// True for the one status that signals success.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ack)
    }

    /// Short uppercase name, as printed by diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ack => "ACK",
            Self::Nak => "NAK",
            Self::Busy => "BUSY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
