/// Errors that can occur in dispatch operations.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Wire-level error.
    #[error("wire error: {0}")]
    Wire(#[from] cmdlink_wire::WireError),

    /// Port-level error.
    #[error("port error: {0}")]
    Port(#[from] cmdlink_port::PortError),

    /// Attempt to register a user handler on a reserved link command.
    #[error("command 0x{0:02X} is in the reserved link range")]
    ReservedCommand(u8),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
