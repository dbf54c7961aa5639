use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{PortError, Result};
use crate::port::LinkPort;

/// Supported baud rates for tty ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Baud {
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
    B230400,
    #[cfg(target_os = "linux")]
    B460800,
    #[cfg(target_os = "linux")]
    B921600,
}

impl Baud {
    /// Map a numeric rate to a supported baud constant.
    pub fn from_bits_per_second(rate: u32) -> Result<Self> {
        match rate {
            9600 => Ok(Self::B9600),
            19200 => Ok(Self::B19200),
            38400 => Ok(Self::B38400),
            57600 => Ok(Self::B57600),
            115_200 => Ok(Self::B115200),
            230_400 => Ok(Self::B230400),
            #[cfg(target_os = "linux")]
            460_800 => Ok(Self::B460800),
            #[cfg(target_os = "linux")]
            921_600 => Ok(Self::B921600),
            other => Err(PortError::UnsupportedBaud(other)),
        }
    }

    /// The numeric rate in bits per second.
    pub fn bits_per_second(self) -> u32 {
        match self {
            Self::B9600 => 9600,
            Self::B19200 => 19200,
            Self::B38400 => 38400,
            Self::B57600 => 57600,
            Self::B115200 => 115_200,
            Self::B230400 => 230_400,
            #[cfg(target_os = "linux")]
            Self::B460800 => 460_800,
            #[cfg(target_os = "linux")]
            Self::B921600 => 921_600,
        }
    }

    fn speed(self) -> libc::speed_t {
        match self {
            Self::B9600 => libc::B9600,
            Self::B19200 => libc::B19200,
            Self::B38400 => libc::B38400,
            Self::B57600 => libc::B57600,
            Self::B115200 => libc::B115200,
            Self::B230400 => libc::B230400,
            #[cfg(target_os = "linux")]
            Self::B460800 => libc::B460800,
            #[cfg(target_os = "linux")]
            Self::B921600 => libc::B921600,
        }
    }
}

impl Default for Baud {
    fn default() -> Self {
        Self::B115200
    }
}

impl std::fmt::Display for Baud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

/// Tty character device port.
///
/// Opens a serial/USB-CDC device node and configures it raw (no echo, no
/// canonical mode, 8N1) at the requested baud rate. The instrument side of
/// a command link is usually reached this way.
pub struct TtyPort;

impl TtyPort {
    /// Open a tty device and configure it for a command link.
    ///
    /// Fails with [`PortError::NotACharDevice`] when `path` exists but is not
    /// a character device. Configuration is applied with `TCSANOW` and both
    /// directions are flushed, so no stale bytes survive from a previous user.
    pub fn open(path: impl AsRef<Path>, baud: Baud) -> Result<LinkPort> {
        let path = path.as_ref();

        let metadata = std::fs::metadata(path).map_err(|e| PortError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        if !metadata.file_type().is_char_device() {
            return Err(PortError::NotACharDevice {
                path: path.to_path_buf(),
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| PortError::Open {
                path: path.to_path_buf(),
                source: e,
            })?;

        configure_raw(&file, baud)?;
        info!(?path, baud = baud.bits_per_second(), "opened tty port");

        Ok(LinkPort::from_tty(file))
    }
}

/// Put the device into raw mode: no echo, no canonical processing, 8N1,
/// modem status lines ignored, blocking single-byte reads.
fn configure_raw(file: &File, baud: Baud) -> Result<()> {
    let fd = file.as_raw_fd();

    let mut termios = get_termios(fd)?;

    // SAFETY: `termios` is a valid, initialized termios struct.
    unsafe { libc::cfmakeraw(&mut termios) };

    termios.c_cflag |= libc::CLOCAL | libc::CREAD;
    termios.c_cflag &= !(libc::CSTOPB | libc::PARENB | libc::CRTSCTS);
    termios.c_cc[libc::VMIN] = 1;
    termios.c_cc[libc::VTIME] = 0;

    // SAFETY: `termios` is valid for the duration of both calls.
    let rc = unsafe {
        if libc::cfsetispeed(&mut termios, baud.speed()) != 0 {
            -1
        } else {
            libc::cfsetospeed(&mut termios, baud.speed())
        }
    };
    if rc != 0 {
        return Err(PortError::Io(std::io::Error::last_os_error()));
    }

    set_termios(fd, &termios)?;

    // SAFETY: `fd` is an open descriptor owned by `file`.
    if unsafe { libc::tcflush(fd, libc::TCIOFLUSH) } != 0 {
        return Err(PortError::Io(std::io::Error::last_os_error()));
    }

    debug!(fd, "tty configured raw");
    Ok(())
}

/// Apply a read timeout via `VTIME`/`VMIN`.
///
/// `None` restores blocking single-byte reads. Timeouts are rounded up to
/// the next decisecond and clamped to the `cc_t` range (25.5s).
pub(crate) fn set_read_timeout(file: &File, timeout: Option<Duration>) -> Result<()> {
    let fd = file.as_raw_fd();
    let mut termios = get_termios(fd)?;

    match timeout {
        Some(timeout) => {
            let deciseconds = timeout.as_millis().div_ceil(100).clamp(1, 255) as libc::cc_t;
            termios.c_cc[libc::VMIN] = 0;
            termios.c_cc[libc::VTIME] = deciseconds;
        }
        None => {
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;
        }
    }

    set_termios(fd, &termios)
}

fn get_termios(fd: std::os::fd::RawFd) -> Result<libc::termios> {
    let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
    // SAFETY: `termios` points to writable memory of the correct size, and
    // `fd` is an open descriptor.
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(PortError::Io(std::io::Error::last_os_error()));
    }
    // SAFETY: tcgetattr succeeded, so the struct is fully initialized.
    Ok(unsafe { termios.assume_init() })
}

fn set_termios(fd: std::os::fd::RawFd, termios: &libc::termios) -> Result<()> {
    // SAFETY: `termios` is a valid initialized struct and `fd` is open.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) } != 0 {
        return Err(PortError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}
