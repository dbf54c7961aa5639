//! Logging setup for the cmdlink binary.
//!
//! Diagnostics go to stderr so the structured output on stdout stays
//! machine-readable. The level can also come from the `CMDLINK_LOG_LEVEL`
//! environment variable (the `--log-level` flag wins); JSON log format is
//! for piping the diagnostics themselves into tooling.

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;

/// Environment variable that sets the default log level.
pub const LOG_LEVEL_ENV: &str = "CMDLINK_LOG_LEVEL";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
