//! Per-connection handler
//!
//! Runs the WebSocket handshake, binds the connection to its room, pumps
//! inbound frames into the room, and tears membership down exactly once
//! however the connection ends.
//!
//! Each admitted connection is split in two tasks:
//!
//! ```text
//!   socket ──► read loop ──► registry.broadcast()
//!   socket ◄── writer task ◄── mpsc ◄── PeerHandle (held by the room)
//! ```
//!
//! The room owns the only sender for the writer's channel. Once the room
//! drops it on leave, eviction or shutdown, the writer sends a close frame and
//! exits, which also ends the read loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message, Utf8Bytes};
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};

use crate::error::{Error, Result};
use crate::registry::{RejectReason, RelayFrame, Room, RoomCode, RoomRegistry};
use crate::server::config::ServerConfig;
use crate::session::{
    ConnectionContext, ConnectionId, ConnectionState, MembershipPhase, PeerHandle,
};

/// Text notice sent to a client turned away from a full room
pub const ROOM_FULL_NOTICE: &str = "Room is full";

type WsStream = WebSocketStream<TcpStream>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// A single client connection
pub struct Connection {
    ctx: ConnectionContext,
    socket: Option<TcpStream>,
    config: ServerConfig,
    registry: Arc<RoomRegistry>,
    state: ConnectionState,
    membership: MembershipPhase,
}

impl Connection {
    /// Wrap an accepted socket
    pub fn new(
        conn_id: ConnectionId,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        registry: Arc<RoomRegistry>,
    ) -> Self {
        Self {
            ctx: ConnectionContext::new(conn_id, peer_addr),
            socket: Some(socket),
            config,
            registry,
            state: ConnectionState::Connecting,
            membership: MembershipPhase::Unjoined,
        }
    }

    /// Current transport state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drive the connection to completion
    ///
    /// Transport errors end the connection the same way a clean close does;
    /// they are only returned for logging.
    pub async fn run(&mut self) -> Result<()> {
        let Some(socket) = self.socket.take() else {
            return Ok(());
        };

        let (ws, code) = match self.handshake(socket).await {
            Ok(accepted) => accepted,
            Err(e) => {
                self.state.close();
                return Err(e);
            }
        };
        self.state.open();
        self.ctx.room = Some(code.clone());

        let (mut sink, source) = ws.split();
        let (peer, rx) = PeerHandle::channel(self.ctx.conn_id, self.config.outbound_buffer);

        let (room, admission) = match self.registry.join(&code, peer).await {
            Ok(joined) => joined,
            Err(rejection) => {
                tracing::warn!(
                    conn_id = %self.ctx.conn_id,
                    room = %code,
                    reason = %rejection.reason,
                    "Join rejected"
                );
                self.reject(&mut sink, rejection.reason).await;
                self.state.close();
                return Ok(());
            }
        };
        self.membership.join();

        tracing::debug!(
            conn_id = %self.ctx.conn_id,
            peer = %self.ctx.peer_addr,
            room = %code,
            members = admission.members,
            "Joined room"
        );

        let mut writer = tokio::spawn(write_loop(
            sink,
            rx,
            admission.catchup,
            self.config.room.send_timeout,
            self.ctx.conn_id,
        ));

        let result = tokio::select! {
            result = self.read_loop(source, &room) => result,
            _ = &mut writer => Ok(()),
        };

        self.teardown(&room).await;

        // Give the writer a chance to flush its close frame
        if !writer.is_finished()
            && time::timeout(self.config.room.send_timeout, &mut writer)
                .await
                .is_err()
        {
            writer.abort();
        }

        self.state.close();
        result
    }

    /// Accept the WebSocket upgrade and extract the room code from the path
    async fn handshake(&self, socket: TcpStream) -> Result<(WsStream, RoomCode)> {
        let prefix = self.config.path_prefix.as_str();
        let mut requested_path: Option<String> = None;

        let callback = |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
            let path = req.uri().path();
            requested_path = Some(path.to_string());

            if RoomCode::from_path(path, prefix).is_some() {
                Ok(resp)
            } else {
                let mut err = ErrorResponse::new(Some("unknown room path".to_string()));
                *err.status_mut() = StatusCode::NOT_FOUND;
                Err(err)
            }
        };

        let accepted = time::timeout(self.config.handshake_timeout, accept_hdr_async(socket, callback)).await;
        let path = requested_path.unwrap_or_default();

        let ws = match accepted {
            Ok(Ok(ws)) => ws,
            Ok(Err(tungstenite::Error::Http(_))) => return Err(Error::InvalidPath(path)),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(Error::HandshakeTimeout(self.config.handshake_timeout)),
        };

        let code = RoomCode::from_path(&path, prefix).ok_or(Error::InvalidPath(path))?;
        Ok((ws, code))
    }

    /// Relay inbound frames until the client goes away
    async fn read_loop(&self, mut source: WsSource, room: &Room) -> Result<()> {
        while let Some(msg) = source.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(msg) => {
                    if let Some(frame) = RelayFrame::from_message(msg) {
                        self.registry.broadcast(room, self.ctx.conn_id, frame).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Tell a rejected client why, then close
    async fn reject(&self, sink: &mut WsSink, reason: RejectReason) {
        let timeout = self.config.room.send_timeout;
        let notice = match reason {
            RejectReason::RoomFull => ROOM_FULL_NOTICE.to_string(),
            other => other.to_string(),
        };

        let _ = time::timeout(timeout, sink.send(Message::text(notice))).await;

        let close = rejection_close_frame(reason);
        let _ = time::timeout(timeout, sink.send(Message::Close(Some(close)))).await;
    }

    /// Leave the room and drop it if empty; runs at most once
    async fn teardown(&mut self, room: &Room) {
        if !self.membership.leave() {
            return;
        }

        self.registry.leave(room, self.ctx.conn_id).await;

        tracing::debug!(
            conn_id = %self.ctx.conn_id,
            room = %room.code(),
            duration_ms = self.ctx.duration().as_millis() as u64,
            "Left room"
        );
    }
}

/// Close frame for a rejected join, carrying the rejection reason
fn rejection_close_frame(reason: RejectReason) -> CloseFrame {
    let code = match reason {
        RejectReason::RoomFull | RejectReason::RoomClosed => CloseCode::Again,
        RejectReason::ServerClosed => CloseCode::Away,
        RejectReason::AlreadyJoined => CloseCode::Policy,
    };

    CloseFrame {
        code,
        reason: Utf8Bytes::from(reason.to_string()),
    }
}

/// Drain the outbound channel into the socket
///
/// Catchup frames go out first. Ends when the room drops the peer handle
/// or a write fails or stalls past `send_timeout`.
async fn write_loop(
    mut sink: WsSink,
    mut rx: mpsc::Receiver<RelayFrame>,
    catchup: Vec<RelayFrame>,
    send_timeout: Duration,
    conn_id: ConnectionId,
) {
    for frame in catchup {
        if !send_message(&mut sink, frame.into_message(), send_timeout).await {
            tracing::debug!(conn_id = %conn_id, "Catchup write failed");
            return;
        }
    }

    while let Some(frame) = rx.recv().await {
        if !send_message(&mut sink, frame.into_message(), send_timeout).await {
            tracing::debug!(conn_id = %conn_id, "Socket write failed");
            return;
        }
    }

    // The room released this connection
    let close = CloseFrame {
        code: CloseCode::Away,
        reason: Utf8Bytes::from_static("room closed"),
    };
    send_message(&mut sink, Message::Close(Some(close)), send_timeout).await;
}

async fn send_message(sink: &mut WsSink, msg: Message, timeout: Duration) -> bool {
    matches!(time::timeout(timeout, sink.send(msg)).await, Ok(Ok(())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_close_frame_matches_reason() {
        let full = rejection_close_frame(RejectReason::RoomFull);
        assert_eq!(full.code, CloseCode::Again);
        assert_eq!(full.reason.as_str(), "room is full");

        let shutdown = rejection_close_frame(RejectReason::ServerClosed);
        assert_eq!(shutdown.code, CloseCode::Away);
        assert_eq!(shutdown.reason.as_str(), "server is shutting down");

        let duplicate = rejection_close_frame(RejectReason::AlreadyJoined);
        assert_eq!(duplicate.code, CloseCode::Policy);
        assert_eq!(duplicate.reason.as_str(), "connection already joined");
    }
}
