use std::io::IsTerminal;
use std::time::Duration;

use clap::ValueEnum;
use cmdlink_dispatch::command_name;
use cmdlink_wire::{source_name, Status};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One completed command/status exchange, as seen from the host side.
#[derive(Debug, Clone, Copy)]
pub struct Exchange {
    pub command: u8,
    pub source: u8,
    pub status: Status,
    pub elapsed: Option<Duration>,
}

#[derive(Serialize)]
struct ExchangeOutput<'a> {
    schema_id: &'a str,
    command: u8,
    command_display: String,
    command_name: &'a str,
    source: u8,
    source_name: &'a str,
    status: u8,
    status_name: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<u128>,
}

pub fn print_exchange(exchange: &Exchange, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ExchangeOutput {
                schema_id: "https://schemas.cmdlink.dev/cli/v1/exchange.schema.json",
                command: exchange.command,
                command_display: byte_display(exchange.command),
                command_name: command_name(exchange.command),
                source: exchange.source,
                source_name: source_name(exchange.source),
                status: exchange.status.as_byte(),
                status_name: exchange.status.name(),
                ok: exchange.status.is_ok(),
                elapsed_ms: exchange.elapsed.map(|d| d.as_millis()),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "SOURCE", "STATUS", "ELAPSED"])
                .add_row(vec![
                    byte_display(exchange.command),
                    source_name(exchange.source).to_string(),
                    exchange.status.name().to_string(),
                    elapsed_display(exchange.elapsed),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "command={} source={} status={} elapsed={}",
                byte_display(exchange.command),
                source_name(exchange.source),
                exchange.status.name(),
                elapsed_display(exchange.elapsed),
            );
        }
        OutputFormat::Raw => {
            println!("{}", exchange.status.name());
        }
    }
}

/// Hex plus the character when printable: `0x41 'A'`, otherwise just hex.
pub fn byte_display(byte: u8) -> String {
    if byte.is_ascii_graphic() {
        format!("0x{byte:02X} '{}'", byte as char)
    } else {
        format!("0x{byte:02X}")
    }
}

fn elapsed_display(elapsed: Option<Duration>) -> String {
    match elapsed {
        Some(elapsed) => format!("{}ms", elapsed.as_millis()),
        None => "-".to_string(),
    }
}
