use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use cmdlink_port::LinkPort;
use tracing::{trace, warn};

use crate::config::WireConfig;
use crate::error::{Result, WireError};
use crate::sender::port_to_wire_error;
use crate::status::Status;

const READ_CHUNK_SIZE: usize = 512;

/// Reads bytes from the instrument.
///
/// Handles partial reads internally — callers always get one byte at a time,
/// in arrival order, regardless of how the kernel chunks the stream.
pub struct ByteReceiver<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Read> ByteReceiver<T> {
    /// Create a new receiver with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new receiver with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            config,
        }
    }

    /// Read the next byte (blocking).
    ///
    /// Returns `Err(WireError::Closed)` when EOF is reached.
    pub fn next_byte(&mut self) -> Result<u8> {
        loop {
            if !self.buf.is_empty() {
                return Ok(self.buf.get_u8());
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                return Err(WireError::Closed);
            }

            trace!(read, "buffered link bytes");
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next byte and parse it as a status.
    ///
    /// Bytes outside the status vocabulary are an error; the link is supposed
    /// to answer a command with nothing else.
    pub fn next_status(&mut self) -> Result<Status> {
        let byte = self.next_byte()?;
        Status::from_byte(byte).ok_or_else(|| {
            warn!(
                byte = format_args!("0x{byte:02X}"),
                "reply byte outside the status vocabulary"
            );
            WireError::InvalidStatus(byte)
        })
    }

    /// Number of buffered bytes not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the receiver and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current receiver configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

impl ByteReceiver<LinkPort> {
    /// Create a receiver for a [`LinkPort`] and apply the read timeout from config.
    pub fn with_config_port(inner: LinkPort, config: WireConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(port_to_wire_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::sender::ByteSender;

    #[test]
    fn reads_bytes_in_order() {
        let mut receiver = ByteReceiver::new(Cursor::new(vec![0x05, 0x41, 0x42]));
        assert_eq!(receiver.next_byte().unwrap(), 0x05);
        assert_eq!(receiver.next_byte().unwrap(), 0x41);
        assert_eq!(receiver.next_byte().unwrap(), 0x42);
    }

    #[test]
    fn closed_on_eof() {
        let mut receiver = ByteReceiver::new(Cursor::new(Vec::<u8>::new()));
        let err = receiver.next_byte().unwrap_err();
        assert!(matches!(err, WireError::Closed));
    }

    #[test]
    fn closed_after_draining_buffer() {
        let mut receiver = ByteReceiver::new(Cursor::new(vec![0x01]));
        assert_eq!(receiver.next_byte().unwrap(), 0x01);
        assert!(matches!(receiver.next_byte(), Err(WireError::Closed)));
    }

    #[test]
    fn status_parsing() {
        let mut receiver = ByteReceiver::new(Cursor::new(vec![0x06, 0x15, 0x00]));
        assert_eq!(receiver.next_status().unwrap(), Status::Ack);
        assert_eq!(receiver.next_status().unwrap(), Status::Nak);
        assert!(matches!(
            receiver.next_status(),
            Err(WireError::InvalidStatus(0x00))
        ));
    }

    #[test]
    fn byte_by_byte_stream() {
        struct ByteByByteReader {
            bytes: Vec<u8>,
            pos: usize,
        }
        impl Read for ByteByByteReader {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.pos >= self.bytes.len() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.bytes[self.pos];
                self.pos += 1;
                Ok(1)
            }
        }

        let mut receiver = ByteReceiver::new(ByteByByteReader {
            bytes: vec![0x10, 0x20, 0x30],
            pos: 0,
        });
        assert_eq!(receiver.next_byte().unwrap(), 0x10);
        assert_eq!(receiver.next_byte().unwrap(), 0x20);
        assert_eq!(receiver.next_byte().unwrap(), 0x30);
    }

    #[test]
    fn interrupted_read_retries() {
        struct InterruptedOnce {
            interrupted: bool,
        }
        impl Read for InterruptedOnce {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                buf[0] = 0x55;
                Ok(1)
            }
        }

        let mut receiver = ByteReceiver::new(InterruptedOnce { interrupted: false });
        assert_eq!(receiver.next_byte().unwrap(), 0x55);
    }

    #[test]
    fn timed_out_read_propagates() {
        struct AlwaysTimedOut;
        impl Read for AlwaysTimedOut {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(ErrorKind::TimedOut))
            }
        }

        let mut receiver = ByteReceiver::new(AlwaysTimedOut);
        let err = receiver.next_byte().unwrap_err();
        assert!(matches!(err, WireError::Io(e) if e.kind() == ErrorKind::TimedOut));
    }

    #[test]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut sender = ByteSender::new(left);
        let mut receiver = ByteReceiver::new(right);

        sender.send(0x05).unwrap();
        sender.send_status(Status::Ack).unwrap();

        assert_eq!(receiver.next_byte().unwrap(), 0x05);
        assert_eq!(receiver.next_status().unwrap(), Status::Ack);
    }

    #[test]
    fn buffered_counts_unconsumed_bytes() {
        let mut receiver = ByteReceiver::new(Cursor::new(vec![0x01, 0x02, 0x03]));
        assert_eq!(receiver.buffered(), 0);
        let _ = receiver.next_byte().unwrap();
        assert_eq!(receiver.buffered(), 2);
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut receiver = ByteReceiver::new(Cursor::new(Vec::<u8>::new()));
        let _ = receiver.get_ref();
        let _ = receiver.get_mut();
        let _ = receiver.config();
        let _inner = receiver.into_inner();
    }
}
