//! Network edge: the TCP listener and the per-connection read/write tasks.
//! Everything interesting happens in the game loop; these tasks only frame
//! lines, filter telnet noise, and shuttle bytes.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::watch;

use crate::game::GameEvent;
use crate::SessionId;

/// Per-session output channel. Unbounded on purpose: a room broadcast must
/// never block on one slow client. A session that cannot drain gets torn
/// down by its write task instead.
pub type Outbox = mpsc::UnboundedSender<String>;

/// Accept loop. Each connection gets a session id, an outbox, and a pair of
/// I/O tasks; the game loop hears about all of it through `events`.
pub async fn run_listener(
    listener: TcpListener,
    events: mpsc::UnboundedSender<GameEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut next_session: SessionId = 1;
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let session = next_session;
                        next_session += 1;
                        log::info!("Connection from {addr} (session {session})");

                        if let Err(e) = stream.set_nodelay(true) {
                            log::debug!("set_nodelay failed for {addr}: {e}");
                        }
                        let (read_half, write_half) = stream.into_split();
                        let (outbox, outbox_rx) = mpsc::unbounded_channel::<String>();

                        tokio::task::spawn_local(write_task(session, write_half, outbox_rx, events.clone()));
                        tokio::task::spawn_local(read_task(session, read_half, events.clone()));

                        if events
                            .send(GameEvent::Connected { session, outbox, addr: addr.to_string() })
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(e) => {
                        log::error!("Accept failed: {e}");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    log::info!("Listener shutting down.");
                    return;
                }
            }
        }
    }
}

/// Read newline-delimited input. Telnet IAC negotiation (lines whose first
/// byte is 0xFF) is swallowed as an empty line so it can never reach the
/// dispatcher.
async fn read_task(
    session: SessionId,
    read_half: OwnedReadHalf,
    events: mpsc::UnboundedSender<GameEvent>,
) {
    let mut reader = BufReader::new(read_half);
    let mut buffer = Vec::with_capacity(256);
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => {
                let line = if buffer.first() == Some(&0xFF) {
                    String::new()
                } else {
                    String::from_utf8_lossy(&buffer).trim().to_string()
                };
                if events.send(GameEvent::Line { session, line }).is_err() {
                    return;
                }
            }
            Err(e) => {
                log::debug!("Read error on session {session}: {e}");
                break;
            }
        }
    }
    let _ = events.send(GameEvent::Disconnected { session });
}

/// Drain the outbox to the socket. A failed write tears the session down.
async fn write_task(
    session: SessionId,
    mut write_half: OwnedWriteHalf,
    mut outbox_rx: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<GameEvent>,
) {
    while let Some(message) = outbox_rx.recv().await {
        if let Err(e) = write_half.write_all(message.as_bytes()).await {
            log::debug!("Write error on session {session}: {e}");
            let _ = events.send(GameEvent::Disconnected { session });
            return;
        }
        if let Err(e) = write_half.flush().await {
            log::debug!("Flush error on session {session}: {e}");
            let _ = events.send(GameEvent::Disconnected { session });
            return;
        }
    }
    // Outbox closed: the game loop dropped the session; close politely.
    let _ = write_half.shutdown().await;
}
