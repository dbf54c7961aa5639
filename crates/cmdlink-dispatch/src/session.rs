use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cmdlink_wire::{source_name, ByteReceiver, ByteSender, WireError};
use tracing::{debug, info};

use crate::error::Result;
use crate::table::Dispatcher;

/// Counters for one completed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Command bytes processed.
    pub processed: u64,
    /// Commands answered with ACK.
    pub accepted: u64,
    /// Commands answered with anything else.
    pub rejected: u64,
}

/// Services one command link: the firmware main-loop shape.
///
/// Reads one command byte at a time, hands it to the dispatcher, and puts
/// the resulting status byte back on the wire. Runs until the far end goes
/// away or the shutdown flag is raised.
pub struct Session<R, W> {
    receiver: ByteReceiver<R>,
    sender: ByteSender<W>,
    dispatcher: Dispatcher,
    source: u8,
    shutdown: Option<Arc<AtomicBool>>,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Create a session over a reader/writer pair.
    ///
    /// `source` is the identifier this link's commands are attributed to.
    pub fn new(reader: R, writer: W, dispatcher: Dispatcher, source: u8) -> Self {
        Self {
            receiver: ByteReceiver::new(reader),
            sender: ByteSender::new(writer),
            dispatcher,
            source,
            shutdown: None,
        }
    }

    /// Attach a shutdown flag; the loop exits once it reads false.
    ///
    /// Pair this with a read timeout on the port, otherwise a quiet link
    /// never re-checks the flag.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    /// Mutable access to the dispatcher (register handlers mid-session).
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Service the link until it closes or shutdown is requested.
    pub fn run(&mut self) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();

        loop {
            if let Some(flag) = &self.shutdown {
                if !flag.load(Ordering::SeqCst) {
                    debug!("session shutdown requested");
                    break;
                }
            }

            let command = match self.receiver.next_byte() {
                Ok(byte) => byte,
                Err(WireError::Closed) => {
                    debug!("link closed by peer");
                    break;
                }
                Err(WireError::Io(err))
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    // Quiet link; loop around to re-check the shutdown flag.
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let status =
                self.dispatcher
                    .process_command(command, self.source, self.sender.get_mut());

            summary.processed += 1;
            if status.is_ok() {
                summary.accepted += 1;
            } else {
                summary.rejected += 1;
            }

            // A host that disconnects before its status byte lands ends the
            // session; it must not error out a serving loop.
            match self.sender.send_status(status) {
                Ok(()) => {}
                Err(WireError::Closed) => {
                    debug!("link closed before status byte");
                    break;
                }
                Err(WireError::Io(err)) if is_disconnect(err.kind()) => {
                    debug!(kind = ?err.kind(), "link dropped while replying");
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            source = source_name(self.source),
            processed = summary.processed,
            accepted = summary.accepted,
            rejected = summary.rejected,
            "session ended"
        );
        Ok(summary)
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}
