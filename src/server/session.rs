//! One duplex session
//!
//! The socket is split: a writer task drains the connection's outbound
//! channel while the session loop feeds inbound text frames to the
//! connection manager. Whichever side finishes first ends the session.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::connection::Outbound;
use super::manager::ConnectionManager;

/// Drive an upgraded socket until either side closes it
pub async fn run_session(socket: WebSocket, remote: SocketAddr, manager: Arc<ConnectionManager>) {
    let (conn, outbound) = manager.register(remote);
    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_frames(sink, outbound, remote));

    loop {
        tokio::select! {
            _ = &mut writer => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    manager.handle_text(&conn, text.as_str());
                }
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => {
                        manager.handle_text(&conn, text);
                    }
                    Err(_) => warn!("({}) Dropping non-UTF-8 binary frame", remote),
                },
                Some(Ok(Message::Close(_))) | None => break,
                // Protocol-level ping/pong is answered by the socket itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("({}) An error occurred: {}", remote, e);
                    break;
                }
            },
        }
    }

    writer.abort();
    manager.unregister(&conn);
}

async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    remote: SocketAddr,
) {
    while let Some(frame) = outbound.recv().await {
        match frame {
            Outbound::Text(text) => {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    debug!("({}) Write failed: {}", remote, e);
                    return;
                }
            }
            // Ends the session without a close frame
            Outbound::Terminate => return,
        }
    }
}
