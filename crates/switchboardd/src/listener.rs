//! Registry connection listener.
//!
//! Accepts switch connections, validates the transport-observed address
//! once at accept time, and runs one reader and one writer task per
//! connection. A connection whose observed address cannot be classified as
//! IPv4 is closed immediately; nothing else is affected.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};

use switchboard_core::validate::normalize_observed_ip;
use switchboard_core::wire::ClientMessage;
use switchboard_services::{ConnectionHandle, ConnectionSession, ConnectionTable, PulseDispatcher};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

pub struct RegistryListener {
    listener: TcpListener,
    connections: ConnectionTable,
    dispatcher: Arc<PulseDispatcher>,
    shutdown: broadcast::Receiver<()>,
}

impl RegistryListener {
    pub fn new(
        listener: TcpListener,
        connections: ConnectionTable,
        dispatcher: Arc<PulseDispatcher>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            listener,
            connections,
            dispatcher,
            shutdown,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("registry listener shutting down");
                    return Ok(());
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let connections = self.connections.clone();
                            let dispatcher = self.dispatcher.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, remote_addr, connections, dispatcher)
                                    .await;
                            });
                        }
                        Err(e) => tracing::warn!(error = %e, "accept failed"),
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    connections: ConnectionTable,
    dispatcher: Arc<PulseDispatcher>,
) {
    // Protocol violation, fatal for this connection only. Dropping the
    // stream closes it.
    let public_ip = match normalize_observed_ip(remote_addr.ip()) {
        Some(ip) => ip,
        None => {
            tracing::warn!(peer = %remote_addr, "rejecting connection: observed address is not IPv4");
            return;
        }
    };

    let id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    tracing::info!(conn = id, peer = %remote_addr, "switch connected");

    let (read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    connections.insert(id, ConnectionHandle::new(remote_addr, tx));

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let mut line = msg.to_line();
            line.push('\n');
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut session = ConnectionSession::new(id, public_ip);
    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match ClientMessage::parse_line(&line) {
                Some(ClientMessage::Pulse {
                    switch_ip,
                    vpn_port,
                }) => {
                    dispatcher
                        .handle_pulse(&mut session, &switch_ip, vpn_port, Instant::now())
                        .await;
                }
                None => tracing::trace!(conn = id, "ignoring unparseable line"),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(conn = id, error = %e, "read failed");
                break;
            }
        }
    }

    connections.remove(&id);
    writer.abort();
    tracing::info!(conn = id, peer = %remote_addr, "switch disconnected");
}
