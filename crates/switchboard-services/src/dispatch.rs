//! Pulse handling — validation, initial sync, change-detecting broadcast.
//!
//! Suppressing broadcasts for unchanged endpoints is what keeps steady-state
//! traffic proportional to topology churn rather than to the pulse rate:
//! switches pulse on a fixed interval forever, and without change detection
//! every heartbeat would fan out to every connection.

use std::time::Instant;

use switchboard_core::validate::{is_valid_ipv4_literal, is_valid_port};
use switchboard_core::wire::ServerMessage;

use crate::session::{self, ConnectionSession, ConnectionTable};
use crate::table::{Endpoint, SharedPeerTable, UpsertOutcome};

/// Routes accepted pulses into the peer table and decides which outbound
/// notices, if any, each one produces.
pub struct PulseDispatcher {
    table: SharedPeerTable,
    connections: ConnectionTable,
}

impl PulseDispatcher {
    pub fn new(table: SharedPeerTable, connections: ConnectionTable) -> Self {
        Self { table, connections }
    }

    /// Handle one inbound pulse from `session`.
    ///
    /// Malformed input is a silent no-op. Otherwise: on the session's first
    /// accepted pulse, sweep expired records (deletions broadcast to all)
    /// and deliver the live snapshot to this session only; then upsert and
    /// broadcast the endpoint to everyone, sender included, iff it actually
    /// changed.
    pub async fn handle_pulse(
        &self,
        session: &mut ConnectionSession,
        switch_ip: &str,
        vpn_port: u32,
        now: Instant,
    ) {
        if !is_valid_ipv4_literal(switch_ip) || !is_valid_port(vpn_port) {
            tracing::trace!(conn = session.id, switch_ip, vpn_port, "dropping malformed pulse");
            return;
        }
        let vpn_port = vpn_port as u16;

        // One lock across the whole sweep + snapshot + upsert sequence:
        // pulses from other connections must not observe a half-applied
        // update, and the snapshot must reflect the just-run sweep.
        let mut table = self.table.lock().await;

        if !session.is_synced() {
            let removed = table.sweep_expired(now);
            for identity in removed {
                tracing::debug!(switch_ip = %identity, "switch record expired");
                session::broadcast(
                    &self.connections,
                    &ServerMessage::DeleteRemoteAddr {
                        switch_ip: identity,
                    },
                );
            }

            for (identity, endpoint) in table.snapshot() {
                session::send_to(
                    &self.connections,
                    session.id,
                    ServerMessage::SetRemoteAddr {
                        switch_ip: identity,
                        public_ip: endpoint.public_ip,
                        vpn_port: endpoint.vpn_port,
                    },
                );
            }

            session.mark_synced();
            if let Some(handle) = self.connections.get(&session.id) {
                handle.mark_synced();
            }
        }

        let endpoint = Endpoint {
            public_ip: session.public_ip,
            vpn_port,
        };
        if table.upsert(switch_ip, endpoint, now) == UpsertOutcome::Changed {
            tracing::info!(
                switch_ip,
                public_ip = %endpoint.public_ip,
                vpn_port,
                "switch endpoint updated"
            );
            session::broadcast(
                &self.connections,
                &ServerMessage::SetRemoteAddr {
                    switch_ip: switch_ip.to_string(),
                    public_ip: endpoint.public_ip,
                    vpn_port,
                },
            );
        }
    }
}
