use std::time::Instant;

use cmdlink_dispatch::CMD_PING;
use cmdlink_wire::{ByteReceiver, ByteSender, Status, WireConfig, LOOPBACK, SERIAL};

use crate::cmd::{open_port, parse_duration, ProbeArgs};
use crate::exit::{port_error, wire_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_exchange, Exchange, OutputFormat};

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;

    let port = open_port(&args.path, args.baud)?;
    let source = if port.kind() == "tty" { SERIAL } else { LOOPBACK };

    let reader = port
        .try_clone()
        .map_err(|err| port_error("port clone failed", err))?;
    let config = WireConfig {
        read_timeout: Some(timeout),
        ..WireConfig::default()
    };
    let mut receiver = ByteReceiver::with_config_port(reader, config)
        .map_err(|err| wire_error("port setup failed", err))?;
    let mut sender = ByteSender::new(port);

    let started = Instant::now();
    sender
        .send(CMD_PING)
        .map_err(|err| wire_error("ping failed", err))?;
    let status = receiver
        .next_status()
        .map_err(|err| wire_error("ping wait failed", err))?;
    let elapsed = started.elapsed();

    print_exchange(
        &Exchange {
            command: CMD_PING,
            source,
            status,
            elapsed: Some(elapsed),
        },
        format,
    );

    if status == Status::Ack {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}
