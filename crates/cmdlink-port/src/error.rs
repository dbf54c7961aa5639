use std::path::PathBuf;

/// Errors that can occur in port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Failed to open a tty device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to bind a bridge socket.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to a bridge socket.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming bridge connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the port.
    #[error("port I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path exists but is not a tty character device.
    #[error("{path} is not a character device")]
    NotACharDevice { path: PathBuf },

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The requested baud rate is not supported on this platform.
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaud(u32),
}

pub type Result<T> = std::result::Result<T, PortError>;
