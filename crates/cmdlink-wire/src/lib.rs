//! Single-byte link vocabulary and transmit/receive primitives.
//!
//! This is the wire layer of cmdlink. A command link carries two kinds of
//! bytes: command bytes going toward the instrument, and status bytes coming
//! back. This crate fixes the shared vocabulary (source identifiers, status
//! bytes) and provides the transmit primitive used by everything above it:
//! one byte out, retried until it is actually on the wire.

pub mod config;
pub mod error;
pub mod receiver;
pub mod sender;
pub mod source;
pub mod status;

pub use config::WireConfig;
pub use error::{Result, WireError};
pub use receiver::ByteReceiver;
pub use sender::{transmit, ByteSender};
pub use source::{source_name, LOOPBACK, SERIAL, USB, USER_SOURCE_START};
pub use status::Status;
