//! Peer table — the last-known public endpoint for every switch identity.
//!
//! Records are created and updated only by accepted pulses and removed only
//! by the expiry sweep. The sweep runs once per newly joined session, at its
//! first accepted pulse, which bounds sweep cost and guarantees each session
//! sees only live peers in its initial snapshot.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use switchboard_core::wire::EXPIRY_WINDOW_MS;

/// The (address, port) pair other switches should use to reach a switch,
/// as observed by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub public_ip: Ipv4Addr,
    pub vpn_port: u16,
}

/// Tracked state for one switch identity.
#[derive(Debug, Clone)]
pub struct SwitchRecord {
    pub endpoint: Endpoint,
    /// Time of the most recent accepted pulse.
    pub last_seen: Instant,
}

/// Result of [`PeerTable::upsert`].
///
/// `Unchanged` means a record already existed with an identical endpoint;
/// the `last_seen` timestamp is refreshed either way, but a timestamp-only
/// update is not a change for broadcast purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Changed,
    Unchanged,
}

/// The switch registry. Keyed by self-declared logical identity.
#[derive(Debug)]
pub struct PeerTable {
    switches: HashMap<String, SwitchRecord>,
    expiry: Duration,
}

impl PeerTable {
    pub fn new(expiry: Duration) -> Self {
        Self {
            switches: HashMap::new(),
            expiry,
        }
    }

    /// Table with the protocol-default 20-minute staleness window.
    pub fn with_default_expiry() -> Self {
        Self::new(Duration::from_millis(EXPIRY_WINDOW_MS))
    }

    /// Remove every record whose last pulse is strictly older than the
    /// expiry window relative to `now`, returning the removed identities.
    /// A record exactly at the boundary is retained.
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<String> {
        let expiry = self.expiry;
        let stale: Vec<String> = self
            .switches
            .iter()
            .filter(|(_, record)| now.saturating_duration_since(record.last_seen) > expiry)
            .map(|(identity, _)| identity.clone())
            .collect();
        for identity in &stale {
            self.switches.remove(identity);
        }
        stale
    }

    /// All records currently present. Used to populate a newly joined
    /// session's view; call after [`sweep_expired`] so the view is live.
    pub fn snapshot(&self) -> Vec<(String, Endpoint)> {
        self.switches
            .iter()
            .map(|(identity, record)| (identity.clone(), record.endpoint))
            .collect()
    }

    /// Insert or replace the record for `identity`, refreshing `last_seen`.
    pub fn upsert(&mut self, identity: &str, endpoint: Endpoint, now: Instant) -> UpsertOutcome {
        match self.switches.get_mut(identity) {
            Some(record) => {
                let outcome = if record.endpoint == endpoint {
                    UpsertOutcome::Unchanged
                } else {
                    UpsertOutcome::Changed
                };
                record.endpoint = endpoint;
                record.last_seen = now;
                outcome
            }
            None => {
                self.switches.insert(
                    identity.to_string(),
                    SwitchRecord {
                        endpoint,
                        last_seen: now,
                    },
                );
                UpsertOutcome::Changed
            }
        }
    }

    pub fn get(&self, identity: &str) -> Option<&SwitchRecord> {
        self.switches.get(identity)
    }

    pub fn records(&self) -> impl Iterator<Item = (&String, &SwitchRecord)> {
        self.switches.iter()
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
}

/// The table shared between connection tasks and the status API.
///
/// One exclusive lock guards the whole table; a pulse's entire
/// sweep + snapshot + upsert + broadcast sequence runs under it.
pub type SharedPeerTable = Arc<Mutex<PeerTable>>;

/// Create a new shared table with the given staleness window.
pub fn new_shared_table(expiry: Duration) -> SharedPeerTable {
    Arc::new(Mutex::new(PeerTable::new(expiry)))
}
