use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use cmdlink_port::{Baud, BridgeSocket, LinkPort, TtyPort};

use crate::exit::{port_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod envinfo;
pub mod probe;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a command byte and print the status byte that comes back.
    Send(SendArgs),
    /// Run a mock instrument on a bridge socket.
    Serve(ServeArgs),
    /// Ping an instrument and report round-trip health.
    Probe(ProbeArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Serve(args) => serve::run(args, format),
        Command::Probe(args) => probe::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Port path: a tty device or a bridge socket.
    pub path: PathBuf,
    /// Command byte: decimal (65), hex (0x41), or a single character (A).
    #[arg(long, short = 'c')]
    pub command: String,
    /// Baud rate for tty ports.
    #[arg(long, default_value = "115200")]
    pub baud: u32,
    /// Do not wait for the status byte.
    #[arg(long)]
    pub no_wait: bool,
    /// Maximum time to wait for the status byte (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bridge socket path to bind.
    pub path: PathBuf,
    /// Source identifier incoming commands are attributed to.
    #[arg(long, default_value_t = cmdlink_wire::LOOPBACK)]
    pub source: u8,
    /// ACK every printable command byte (link bring-up aid).
    #[arg(long)]
    pub echo_printable: bool,
    /// Exit after servicing one connection.
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Port path: a tty device or a bridge socket.
    pub path: PathBuf,
    /// Baud rate for tty ports.
    #[arg(long, default_value = "115200")]
    pub baud: u32,
    /// Probe timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

/// Open a port by path: character devices get the tty treatment, everything
/// else is assumed to be a bridge socket.
pub(crate) fn open_port(path: &Path, baud: u32) -> CliResult<LinkPort> {
    let is_char_device = {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            std::fs::metadata(path)
                .map(|m| m.file_type().is_char_device())
                .unwrap_or(false)
        }
        #[cfg(not(unix))]
        {
            false
        }
    };

    if is_char_device {
        let baud = Baud::from_bits_per_second(baud)
            .map_err(|err| port_error("invalid baud rate", err))?;
        TtyPort::open(path, baud).map_err(|err| port_error("open failed", err))
    } else {
        BridgeSocket::connect(path).map_err(|err| port_error("connect failed", err))
    }
}

/// Parse a command byte argument: decimal, `0x`-prefixed hex, or one character.
pub(crate) fn parse_command_byte(input: &str) -> CliResult<u8> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "command byte must not be empty"));
    }

    if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16)
            .map_err(|_| CliError::new(USAGE, format!("invalid hex command byte: {input}")));
    }

    if let Ok(value) = input.parse::<u8>() {
        return Ok(value);
    }

    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii() => Ok(ch as u8),
        _ => Err(CliError::new(
            USAGE,
            format!("invalid command byte: {input} (use decimal, 0x.., or one ASCII character)"),
        )),
    }
}

/// Parse `5s` / `500ms` style durations.
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_byte_forms() {
        assert_eq!(parse_command_byte("65").unwrap(), 65);
        assert_eq!(parse_command_byte("0x41").unwrap(), 0x41);
        assert_eq!(parse_command_byte("0X05").unwrap(), 0x05);
        assert_eq!(parse_command_byte("A").unwrap(), b'A');
        assert_eq!(parse_command_byte("?").unwrap(), b'?');
    }

    #[test]
    fn parse_command_byte_rejects_garbage() {
        assert!(parse_command_byte("").is_err());
        assert!(parse_command_byte("0xZZ").is_err());
        assert!(parse_command_byte("256").is_err());
        assert!(parse_command_byte("ab").is_err());
        assert!(parse_command_byte("é").is_err());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn open_port_missing_bridge_socket_fails() {
        let err = open_port(Path::new("/nonexistent/link.sock"), 115_200).unwrap_err();
        assert!(err.message.contains("connect failed"));
    }
}
