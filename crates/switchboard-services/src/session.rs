//! Connection sessions — per-connection protocol state and outbound handles.
//!
//! A [`ConnectionSession`] is owned by its connection's reader task and dies
//! with the connection; a switch's table record can outlive the connection
//! that last updated it. The [`ConnectionTable`] holds the fire-and-forget
//! outbound channel for every live connection.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use switchboard_core::wire::ServerMessage;

/// Protocol state for one live connection.
///
/// `synced` starts false, is set on the connection's first accepted pulse,
/// and is never reset. It gates only the expiry-sweep + snapshot delivery;
/// pulses are applied to the table in both states.
#[derive(Debug)]
pub struct ConnectionSession {
    pub id: u64,
    /// Transport-observed public IPv4 address, fixed for the connection's
    /// lifetime. Validated once at connection open.
    pub public_ip: Ipv4Addr,
    synced: bool,
}

impl ConnectionSession {
    pub fn new(id: u64, public_ip: Ipv4Addr) -> Self {
        Self {
            id,
            public_ip,
            synced: false,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn mark_synced(&mut self) {
        self.synced = true;
    }
}

/// Outbound side of a connection, registered for the connection's lifetime.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub remote_addr: SocketAddr,
    /// Mirror of the session's one-shot sync state, readable by observers
    /// (the status API) that never touch the reader-task-owned session.
    synced: AtomicBool,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ConnectionHandle {
    pub fn new(remote_addr: SocketAddr, tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            remote_addr,
            synced: AtomicBool::new(false),
            tx,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_synced(&self) {
        self.synced.store(true, Ordering::Relaxed);
    }
}

/// All live connections, keyed by connection id.
/// Shared between the accept loop, the dispatcher, and the status API.
pub type ConnectionTable = Arc<DashMap<u64, ConnectionHandle>>;

/// Create a new empty connection table.
pub fn new_connection_table() -> ConnectionTable {
    Arc::new(DashMap::new())
}

/// Deliver a message to one connection only. Fire-and-forget: a missing or
/// closed receiver means the connection is tearing down and the message is
/// dropped.
pub fn send_to(connections: &ConnectionTable, id: u64, msg: ServerMessage) {
    if let Some(handle) = connections.get(&id) {
        let _ = handle.tx.send(msg);
    }
}

/// Deliver a message to every live connection, sender included.
pub fn broadcast(connections: &ConnectionTable, msg: &ServerMessage) {
    for entry in connections.iter() {
        let _ = entry.value().tx.send(msg.clone());
    }
}
