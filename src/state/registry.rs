//! Connected sockets: the single host seat and the audience roster.

use axum::extract::ws::Message;
use indexmap::IndexMap;
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;
use crate::types::ClientId;

/// Process-unique id for one WebSocket connection's lifetime. A client that
/// reconnects keeps its `ClientId` but gets a fresh `ConnId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

pub type OutboundTx = mpsc::UnboundedSender<Message>;

/// Handle for queueing frames to one socket's writer task.
#[derive(Debug, Clone)]
pub struct ConnHandle {
    pub conn_id: ConnId,
    tx: OutboundTx,
}

impl ConnHandle {
    pub fn new(conn_id: ConnId, tx: OutboundTx) -> Self {
        Self { conn_id, tx }
    }

    /// Queue a message for this socket. Failures mean the writer task is
    /// gone; the disconnect path cleans up, so they are dropped here.
    pub fn send(&self, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => {
                let _ = self.tx.send(Message::Text(json.into()));
            }
            Err(e) => {
                tracing::error!("Failed to serialize server message: {}", e);
            }
        }
    }

    /// Ask the writer task to close the socket after draining the queue.
    pub fn close(&self) {
        let _ = self.tx.send(Message::Close(None));
    }
}

/// An audience member's live connection plus their registered nickname.
#[derive(Debug, Clone)]
pub struct AudienceConn {
    pub nickname: String,
    pub handle: ConnHandle,
}

/// Who is connected right now. At most one host; audience entries are keyed
/// by client id and kept in first-join order.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    host: Option<ConnHandle>,
    audience: IndexMap<ClientId, AudienceConn>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(&self) -> Option<&ConnHandle> {
        self.host.as_ref()
    }

    pub fn is_host(&self, conn_id: ConnId) -> bool {
        self.host
            .as_ref()
            .is_some_and(|host| host.conn_id == conn_id)
    }

    /// Seat a host connection, displacing any previous one.
    pub fn set_host(&mut self, handle: ConnHandle) {
        self.host = Some(handle);
    }

    /// Register an audience connection. A known client id keeps its place
    /// in the roster; its nickname and socket handle are replaced.
    pub fn upsert_audience(&mut self, client_id: &str, nickname: String, handle: ConnHandle) {
        if let Some(existing) = self.audience.get_mut(client_id) {
            existing.nickname = nickname;
            existing.handle = handle;
        } else {
            self.audience
                .insert(client_id.to_string(), AudienceConn { nickname, handle });
        }
    }

    pub fn contains_audience(&self, client_id: &str) -> bool {
        self.audience.contains_key(client_id)
    }

    pub fn audience_nickname(&self, client_id: &str) -> Option<&str> {
        self.audience
            .get(client_id)
            .map(|conn| conn.nickname.as_str())
    }

    pub fn audience(&self) -> impl Iterator<Item = (&ClientId, &AudienceConn)> {
        self.audience.iter()
    }

    pub fn audience_len(&self) -> usize {
        self.audience.len()
    }

    /// Drop the host seat if this connection holds it.
    pub fn remove_host_conn(&mut self, conn_id: ConnId) -> bool {
        if self.is_host(conn_id) {
            self.host = None;
            true
        } else {
            false
        }
    }

    /// Drop whichever audience entry owns this connection, returning its
    /// client id. A stale conn id (already replaced by a rejoin) is a no-op.
    pub fn remove_audience_conn(&mut self, conn_id: ConnId) -> Option<ClientId> {
        let client_id = self
            .audience
            .iter()
            .find(|(_, conn)| conn.handle.conn_id == conn_id)
            .map(|(id, _)| id.clone())?;
        self.audience.shift_remove(&client_id);
        Some(client_id)
    }

    /// Close every audience socket and empty the roster.
    pub fn close_all_audience(&mut self) {
        for (_, conn) in self.audience.drain(..) {
            conn.handle.close();
        }
    }
}
