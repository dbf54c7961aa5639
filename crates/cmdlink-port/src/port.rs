use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A connected byte port — implements Read + Write.
///
/// This is the fundamental I/O type returned by port operations.
/// It wraps either a raw-mode tty character device or a Unix domain
/// socket stream acting as an instrument bridge.
pub struct LinkPort {
    inner: LinkPortInner,
}

enum LinkPortInner {
    #[cfg(unix)]
    Tty(std::fs::File),
    #[cfg(unix)]
    Bridge(std::os::unix::net::UnixStream),
}

impl Read for LinkPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkPortInner::Tty(file) => file.read(buf),
            #[cfg(unix)]
            LinkPortInner::Bridge(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkPortInner::Tty(file) => file.write(buf),
            #[cfg(unix)]
            LinkPortInner::Bridge(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkPortInner::Tty(file) => file.flush(),
            #[cfg(unix)]
            LinkPortInner::Bridge(stream) => stream.flush(),
        }
    }
}

impl LinkPort {
    /// Create a LinkPort from an already-configured tty device file.
    #[cfg(unix)]
    pub(crate) fn from_tty(file: std::fs::File) -> Self {
        Self {
            inner: LinkPortInner::Tty(file),
        }
    }

    /// Create a LinkPort from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_bridge(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: LinkPortInner::Bridge(stream),
        }
    }

    /// Set read timeout on the underlying port.
    ///
    /// For tty ports this maps to termios `VTIME` (decisecond resolution);
    /// sub-100ms timeouts are rounded up to one decisecond.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            LinkPortInner::Tty(file) => crate::tty::set_read_timeout(file, timeout),
            #[cfg(unix)]
            LinkPortInner::Bridge(stream) => {
                stream.set_read_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Set write timeout on the underlying port.
    ///
    /// Tty writes are governed by the kernel line discipline and do not take
    /// a timeout; the call is a no-op for tty ports.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            LinkPortInner::Tty(_) => Ok(()),
            #[cfg(unix)]
            LinkPortInner::Bridge(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Try to clone this port (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            LinkPortInner::Tty(file) => {
                let cloned = file.try_clone()?;
                Ok(Self::from_tty(cloned))
            }
            #[cfg(unix)]
            LinkPortInner::Bridge(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_bridge(cloned))
            }
        }
    }

    /// Port kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            LinkPortInner::Tty(_) => "tty",
            #[cfg(unix)]
            LinkPortInner::Bridge(_) => "bridge",
        }
    }
}

impl std::fmt::Debug for LinkPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkPort").field("kind", &self.kind()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn bridge_port_read_write_roundtrip() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut a = LinkPort::from_bridge(left);
        let mut b = LinkPort::from_bridge(right);

        a.write_all(&[0x41]).unwrap();
        a.flush().unwrap();

        let mut buf = [0u8; 1];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], 0x41);
    }

    #[test]
    fn bridge_port_try_clone_shares_stream() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let a = LinkPort::from_bridge(left);
        let mut clone = a.try_clone().unwrap();
        let mut b = LinkPort::from_bridge(right);

        clone.write_all(b"xy").unwrap();
        let mut buf = [0u8; 2];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"xy");
    }

    #[test]
    fn bridge_port_read_timeout_applies() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut a = LinkPort::from_bridge(left);
        a.set_read_timeout(Some(Duration::from_millis(10))).unwrap();

        let mut buf = [0u8; 1];
        let err = a.read_exact(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn debug_names_port_kind() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let a = LinkPort::from_bridge(left);
        assert_eq!(a.kind(), "bridge");
        assert!(format!("{a:?}").contains("bridge"));
    }
}
