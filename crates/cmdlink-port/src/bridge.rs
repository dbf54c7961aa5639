use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{PortError, Result};
use crate::port::LinkPort;

/// Default permission mode for created socket paths. A command link is a
/// device-control surface, so only the owner gets it.
pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

/// Unix `sockaddr_un.sun_path` capacity: 108 bytes on Linux, 104 on the BSDs.
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 104;

/// (dev, inode) pair of the socket file this process created.
///
/// Cleanup on drop compares against it so a path that was replaced behind
/// our back is left alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SocketIdentity {
    dev: u64,
    ino: u64,
}

impl SocketIdentity {
    fn of(path: &Path) -> io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }
}

/// Unix domain socket standing in for an instrument.
///
/// A "bridge" lets the rest of the stack run without hardware: a mock
/// instrument binds the socket and services command bytes, and hosts open a
/// [`LinkPort`] by connecting to it. Byte semantics are identical to a tty
/// port, so everything above this layer is transport-agnostic.
#[derive(Debug)]
pub struct BridgeSocket {
    listener: UnixListener,
    path: PathBuf,
    identity: SocketIdentity,
}

impl BridgeSocket {
    /// Bind and listen on a bridge socket path with owner-only permissions.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, DEFAULT_SOCKET_MODE)
    }

    /// Bind and listen on a bridge socket path with an explicit mode.
    ///
    /// A stale socket left by a previous instrument is removed first; any
    /// other kind of file at `path` is refused.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        prepare_bind_path(&path)?;

        let listener = UnixListener::bind(&path).map_err(|e| bind_err(&path, e))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(|e| bind_err(&path, e))?;
        let identity = SocketIdentity::of(&path).map_err(|e| bind_err(&path, e))?;

        info!(?path, "bridge socket listening");
        Ok(Self {
            listener,
            path,
            identity,
        })
    }

    /// Accept an incoming link (blocking).
    pub fn accept(&self) -> Result<LinkPort> {
        self.accept_configured(None)
    }

    /// Accept an incoming link and apply a read timeout before handing it out.
    ///
    /// Servers that poll a shutdown flag want the timeout in place before the
    /// first read, not after; this closes that window.
    pub fn accept_configured(&self, read_timeout: Option<Duration>) -> Result<LinkPort> {
        let (stream, _addr) = self.listener.accept().map_err(PortError::Accept)?;
        let port = LinkPort::from_bridge(stream);
        port.set_read_timeout(read_timeout)?;
        debug!(timeout = ?read_timeout, "accepted bridge link");
        Ok(port)
    }

    /// Connect to a listening bridge socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<LinkPort> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| PortError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to bridge socket");
        Ok(LinkPort::from_bridge(stream))
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BridgeSocket {
    fn drop(&mut self) {
        match SocketIdentity::of(&self.path) {
            Ok(current) if current == self.identity => {
                debug!(path = ?self.path, "removing bridge socket file");
                let _ = std::fs::remove_file(&self.path);
            }
            Ok(_) => {
                debug!(path = ?self.path, "socket path was replaced; leaving it");
            }
            Err(_) => {}
        }
    }
}

/// Validate the path and clear a stale socket. Refuses to touch anything
/// that is not a unix socket.
fn prepare_bind_path(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= MAX_PATH_LEN {
        return Err(PortError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max: MAX_PATH_LEN,
        });
    }

    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(bind_err(path, e)),
    };

    if !metadata.file_type().is_socket() {
        return Err(bind_err(
            path,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                "existing path is not a unix socket",
            ),
        ));
    }

    debug!(?path, "removing stale bridge socket");
    std::fs::remove_file(path).map_err(|e| bind_err(path, e))
}

fn bind_err(path: &Path, source: io::Error) -> PortError {
    PortError::Bind {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn temp_sock(tag: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("cmdlink-bridge-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sock = dir.join("link.sock");
        (dir, sock)
    }

    #[test]
    fn command_byte_in_status_byte_out() {
        let (dir, sock_path) = temp_sock("exchange");
        let socket = BridgeSocket::bind(&sock_path).unwrap();

        let host = std::thread::spawn({
            let sock_path = sock_path.clone();
            move || {
                let mut port = BridgeSocket::connect(&sock_path).unwrap();
                // ENQ command byte out, one status byte back.
                port.write_all(&[0x05]).unwrap();
                let mut status = [0u8; 1];
                port.read_exact(&mut status).unwrap();
                status[0]
            }
        });

        let mut instrument = socket.accept().unwrap();
        let mut command = [0u8; 1];
        instrument.read_exact(&mut command).unwrap();
        assert_eq!(command[0], 0x05);
        instrument.write_all(&[0x06]).unwrap();

        assert_eq!(host.join().unwrap(), 0x06, "host should see the ACK byte");

        drop(socket);
        assert!(!sock_path.exists(), "socket file removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn accept_configured_applies_read_timeout() {
        let (dir, sock_path) = temp_sock("timeout");
        let socket = BridgeSocket::bind(&sock_path).unwrap();

        let _host = BridgeSocket::connect(&sock_path).unwrap();
        let mut quiet = socket
            .accept_configured(Some(Duration::from_millis(10)))
            .unwrap();

        let mut buf = [0u8; 1];
        let err = quiet.read_exact(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_rebinds_over_a_stale_socket_only() {
        let (dir, sock_path) = temp_sock("stale");

        // Leave a stale socket file behind by leaking the listener fd.
        let first = BridgeSocket::bind(&sock_path).unwrap();
        std::mem::forget(first);
        assert!(sock_path.exists());

        let second = BridgeSocket::bind(&sock_path).unwrap();
        drop(second);

        // A regular file at the path must be refused, not unlinked.
        std::fs::write(&sock_path, b"device config, do not delete").unwrap();
        let err = BridgeSocket::bind(&sock_path).unwrap_err();
        assert!(matches!(err, PortError::Bind { .. }));
        assert!(sock_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_is_owner_only_by_default() {
        let (dir, sock_path) = temp_sock("mode");
        let socket = BridgeSocket::bind(&sock_path).unwrap();

        let mode = std::fs::metadata(socket.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, DEFAULT_SOCKET_MODE);

        drop(socket);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn overlong_path_is_rejected_up_front() {
        let long = std::env::temp_dir().join("l".repeat(MAX_PATH_LEN));
        let err = BridgeSocket::bind(&long).unwrap_err();
        assert!(matches!(err, PortError::PathTooLong { len, .. } if len >= MAX_PATH_LEN));
    }

    #[test]
    fn drop_leaves_a_replaced_path_alone() {
        let (dir, sock_path) = temp_sock("replaced");
        let socket = BridgeSocket::bind(&sock_path).unwrap();

        std::fs::remove_file(&sock_path).unwrap();
        std::fs::write(&sock_path, b"someone else's file now").unwrap();

        drop(socket);
        assert!(sock_path.exists(), "replaced path must survive drop");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
