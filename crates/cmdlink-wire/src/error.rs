/// Errors that can occur on the byte link.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// An I/O error occurred while transmitting or receiving.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed before the operation completed.
    #[error("link closed")]
    Closed,

    /// A received byte is not part of the status vocabulary.
    #[error("invalid status byte 0x{0:02X}")]
    InvalidStatus(u8),
}

pub type Result<T> = std::result::Result<T, WireError>;
