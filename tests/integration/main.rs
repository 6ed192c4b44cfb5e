//! Switchboard integration test harness.
//!
//! Each test spins up a complete in-process registry on a loopback port and
//! drives it with real TCP clients speaking the line protocol. Clients
//! connect over 127.0.0.1, so the registry observes every switch at that
//! public address — identities distinguish them.

mod pulse_flow;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use switchboard_core::wire::{ClientMessage, ServerMessage};
use switchboard_services::{new_connection_table, new_shared_table, PulseDispatcher};
use switchboardd::listener::RegistryListener;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A registry running inside the test process. Shuts down on drop.
pub struct TestRegistry {
    pub addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
}

impl Drop for TestRegistry {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// Start a registry with the given staleness window on an ephemeral port.
pub async fn start_registry(expiry: Duration) -> Result<TestRegistry> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let table = new_shared_table(expiry);
    let connections = new_connection_table();
    let dispatcher = Arc::new(PulseDispatcher::new(table, connections.clone()));
    let (shutdown, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(RegistryListener::new(listener, connections, dispatcher, shutdown_rx).run());
    Ok(TestRegistry { addr, shutdown })
}

/// A switch-side client for the line protocol.
pub struct Switch {
    write: OwnedWriteHalf,
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl Switch {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read, write) = stream.into_split();
        Ok(Self {
            write,
            lines: BufReader::new(read).lines(),
        })
    }

    pub async fn pulse(&mut self, switch_ip: &str, vpn_port: u32) -> Result<()> {
        let msg = ClientMessage::Pulse {
            switch_ip: switch_ip.to_string(),
            vpn_port,
        };
        self.send_raw(&serde_json::to_string(&msg)?).await
    }

    pub async fn send_raw(&mut self, line: &str) -> Result<()> {
        self.write.write_all(line.as_bytes()).await?;
        self.write.write_all(b"\n").await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<ServerMessage> {
        let line = tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .context("timed out waiting for a registry message")??
            .context("registry closed the connection")?;
        serde_json::from_str(&line).context("unparseable registry message")
    }

    /// Assert nothing arrives within `window`.
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        match tokio::time::timeout(window, self.lines.next_line()).await {
            Err(_) => Ok(()),
            Ok(Ok(Some(line))) => anyhow::bail!("unexpected message: {line}"),
            Ok(Ok(None)) => anyhow::bail!("registry closed the connection"),
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

// ── Message shorthands ────────────────────────────────────────────────────────

pub fn set_addr(switch_ip: &str, public_ip: &str, vpn_port: u16) -> ServerMessage {
    ServerMessage::SetRemoteAddr {
        switch_ip: switch_ip.to_string(),
        public_ip: public_ip.parse().unwrap(),
        vpn_port,
    }
}

pub fn delete_addr(switch_ip: &str) -> ServerMessage {
    ServerMessage::DeleteRemoteAddr {
        switch_ip: switch_ip.to_string(),
    }
}
