use std::time::Instant;

use cmdlink_wire::{ByteReceiver, ByteSender, WireConfig, LOOPBACK, SERIAL};

use crate::cmd::{open_port, parse_command_byte, parse_duration, SendArgs};
use crate::exit::{port_error, wire_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_exchange, Exchange, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let command = parse_command_byte(&args.command)?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;

    let port = open_port(&args.path, args.baud)?;
    let source = if port.kind() == "tty" { SERIAL } else { LOOPBACK };

    let mut receiver = if args.no_wait {
        None
    } else {
        let reader = port
            .try_clone()
            .map_err(|err| port_error("port clone failed", err))?;
        let config = WireConfig {
            read_timeout: Some(wait_timeout),
            ..WireConfig::default()
        };
        let receiver = ByteReceiver::with_config_port(reader, config)
            .map_err(|err| wire_error("port setup failed", err))?;
        Some(receiver)
    };

    let mut sender = ByteSender::new(port);
    let started = Instant::now();
    sender
        .send(command)
        .map_err(|err| wire_error("send failed", err))?;

    let Some(receiver) = receiver.as_mut() else {
        return Ok(SUCCESS);
    };

    let status = receiver
        .next_status()
        .map_err(|err| wire_error("status wait failed", err))?;
    let elapsed = started.elapsed();

    print_exchange(
        &Exchange {
            command,
            source,
            status,
            elapsed: Some(elapsed),
        },
        format,
    );

    if status.is_ok() {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}
