/// Configuration for the byte sender and receiver.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Flush the underlying stream after every transmitted byte.
    ///
    /// Command links are latency-bound, not throughput-bound; a buffered
    /// command byte that never reaches the instrument stalls the whole
    /// exchange. Disable only for bulk replies.
    pub flush_each_byte: bool,
    /// Read timeout applied to ports that support one.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout applied to ports that support one.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            flush_each_byte: true,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
