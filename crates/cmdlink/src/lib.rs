//! Single-byte command links for instruments and development kits.
//!
//! cmdlink provides the host/device boundary used by small instruments:
//! command bytes go toward the device one at a time, are dispatched against
//! a command table, and are answered with a single status byte.
//!
//! # Crate Structure
//!
//! - [`port`] — Byte port abstraction (tty character devices, bridge sockets)
//! - [`wire`] — Link vocabulary (sources, status bytes) and transmit/receive primitives
//! - [`dispatch`] — Command table, handlers, session pump (behind `dispatch` feature)

/// Re-export port types.
pub mod port {
    pub use cmdlink_port::*;
}

/// Re-export wire types.
pub mod wire {
    pub use cmdlink_wire::*;
}

/// Re-export dispatch types (requires `dispatch` feature).
#[cfg(feature = "dispatch")]
pub mod dispatch {
    pub use cmdlink_dispatch::*;
}
