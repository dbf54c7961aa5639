use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cmdlink_dispatch::{Dispatcher, Session};
use cmdlink_port::{BridgeSocket, PortError};
use cmdlink_wire::{source_name, Status};
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{dispatch_error, port_error, CliError, CliResult, SUCCESS};
use crate::output::OutputFormat;

// Accepted links poll at this cadence so Ctrl-C is honored on a quiet link.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

pub fn run(args: ServeArgs, _format: OutputFormat) -> CliResult<i32> {
    let socket =
        BridgeSocket::bind(&args.path).map_err(|err| port_error("bind failed", err))?;
    info!(
        path = %args.path.display(),
        source = source_name(args.source),
        "serving command link"
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let port = match socket.accept_configured(Some(SHUTDOWN_POLL)) {
            Ok(port) => port,
            Err(PortError::Accept(err)) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(port_error("accept failed", err)),
        };

        let reader = port
            .try_clone()
            .map_err(|err| port_error("port clone failed", err))?;

        let mut session = Session::new(reader, port, build_dispatcher(&args), args.source)
            .with_shutdown(running.clone());
        let summary = session
            .run()
            .map_err(|err| dispatch_error("session failed", err))?;
        info!(
            processed = summary.processed,
            accepted = summary.accepted,
            "link closed"
        );

        if args.once {
            break;
        }
    }

    Ok(SUCCESS)
}

fn build_dispatcher(args: &ServeArgs) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    if args.echo_printable {
        for command in 0x20..=0x7Eu8 {
            dispatcher.register(command, |_| Ok(Status::Ack));
        }
    }
    dispatcher
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn serve_args(echo_printable: bool) -> ServeArgs {
        ServeArgs {
            path: PathBuf::from("/tmp/unused.sock"),
            source: cmdlink_wire::LOOPBACK,
            echo_printable,
            once: true,
        }
    }

    #[test]
    fn default_dispatcher_keeps_builtins_only() {
        let dispatcher = build_dispatcher(&serve_args(false));
        assert!(dispatcher.is_registered(cmdlink_dispatch::CMD_PING));
        assert!(!dispatcher.is_registered(b'a'));
    }

    #[test]
    fn echo_printable_covers_the_printable_range() {
        let dispatcher = build_dispatcher(&serve_args(true));
        assert!(dispatcher.is_registered(0x20));
        assert!(dispatcher.is_registered(b'~'));
        assert!(!dispatcher.is_registered(0x7F));
    }
}
