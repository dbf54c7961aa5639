use std::io::{ErrorKind, Write};

use cmdlink_port::LinkPort;
use tracing::trace;

use crate::config::WireConfig;
use crate::error::{Result, WireError};
use crate::status::Status;

/// Write a single byte to any `Write` sink, retrying until it is on the wire.
///
/// This is the transmit primitive of the link: `Interrupted` and `WouldBlock`
/// are retried, a zero-length write means the far end is gone.
pub fn transmit(inner: &mut (impl Write + ?Sized), byte: u8) -> Result<()> {
    loop {
        match inner.write(&[byte]) {
            Ok(0) => return Err(WireError::Closed),
            Ok(_) => return Ok(()),
            Err(err)
                if err.kind() == ErrorKind::Interrupted
                    || err.kind() == ErrorKind::WouldBlock =>
            {
                trace!(kind = ?err.kind(), "write retried");
                continue;
            }
            Err(err) => return Err(WireError::Io(err)),
        }
    }
}

/// Transmits bytes to the instrument.
///
/// Wraps any `Write` stream and guarantees that every accepted byte was
/// actually handed to the kernel, with flushing handled per configuration.
pub struct ByteSender<T> {
    inner: T,
    config: WireConfig,
}

impl<T: Write> ByteSender<T> {
    /// Create a new sender with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new sender with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self { inner, config }
    }

    /// Transmit one byte (blocking).
    ///
    /// Flushes afterwards unless `flush_each_byte` is disabled.
    pub fn send(&mut self, tx: u8) -> Result<()> {
        transmit(&mut self.inner, tx)?;
        if self.config.flush_each_byte {
            self.flush()?;
        }
        Ok(())
    }

    /// Transmit a slice of bytes, flushing once at the end.
    pub fn send_all(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            transmit(&mut self.inner, byte)?;
        }
        self.flush()
    }

    /// Transmit a status byte.
    pub fn send_status(&mut self, status: Status) -> Result<()> {
        self.send(status.as_byte())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the sender and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current sender configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

impl ByteSender<LinkPort> {
    /// Create a sender for a [`LinkPort`] and apply the write timeout from config.
    pub fn with_config_port(inner: LinkPort, config: WireConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(port_to_wire_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn port_to_wire_error(err: cmdlink_port::PortError) -> WireError {
    match err {
        cmdlink_port::PortError::Io(io) | cmdlink_port::PortError::Accept(io) => WireError::Io(io),
        cmdlink_port::PortError::Open { source, .. }
        | cmdlink_port::PortError::Bind { source, .. }
        | cmdlink_port::PortError::Connect { source, .. } => WireError::Io(source),
        other => WireError::Io(std::io::Error::other(other.to_string())),
    }
}
