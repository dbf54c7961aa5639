//! Mock instrument — accepts one host connection and answers command bytes.
//!
//! Run with:
//!   cargo run --example mock-instrument
//!
//! In another terminal:
//!   cargo run --features cli -- send /tmp/cmdlink-mock-<pid>/link.sock \
//!     --command 0x05
//!
//! The instrument ACKs ping and sync, counts 'c' commands, and refuses
//! everything from an unexpected source.

use std::fs;

use cmdlink::dispatch::{Dispatcher, HandlerError, Session};
use cmdlink::port::BridgeSocket;
use cmdlink::wire::{Status, LOOPBACK};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("cmdlink-mock-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("link.sock");

    let socket = BridgeSocket::bind(&sock_path)?;
    eprintln!("Instrument listening on {}", sock_path.display());

    let mut dispatcher = Dispatcher::new();

    // A stateful command: count how many times 'c' was seen and reply
    // with the count as ASCII before the status byte.
    let mut count: u32 = 0;
    dispatcher.register(b'c', move |ctx| {
        count += 1;
        ctx.reply_all(count.to_string().as_bytes())
            .map_err(|err| HandlerError::new(err.to_string()))?;
        Ok(Status::Ack)
    });

    // A command the instrument knows but cannot service right now.
    dispatcher.register(b'b', |_| Err(HandlerError::busy()));

    let port = socket.accept()?;
    eprintln!("Host connected");

    let reader = port.try_clone()?;
    let mut session = Session::new(reader, port, dispatcher, LOOPBACK);
    let summary = session.run()?;
    eprintln!(
        "Session ended: {} processed, {} accepted",
        summary.processed, summary.accepted
    );

    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
