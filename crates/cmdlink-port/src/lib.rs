//! Byte port abstraction for instrument command links.
//!
//! Provides a unified interface over the two ways a host reaches an instrument:
//! - A tty character device (`/dev/ttyUSB0` style), configured raw at a fixed baud rate
//! - A Unix domain "bridge" socket standing in for the instrument when no hardware
//!   is attached (mock devices, tests)
//!
//! This is the lowest layer of cmdlink. Everything else builds on top of the
//! [`LinkPort`] type provided here.

pub mod error;
pub mod port;

#[cfg(unix)]
pub mod bridge;
#[cfg(unix)]
pub mod tty;

pub use error::{PortError, Result};
pub use port::LinkPort;

#[cfg(unix)]
pub use bridge::BridgeSocket;
#[cfg(unix)]
pub use tty::{Baud, TtyPort};
