//! Switchboard wire format — on-wire types for all registry communication.
//!
//! The registry speaks a line-oriented protocol over TCP: each line is one
//! JSON object tagged by an `event` field. Changing a field name or event
//! name here is a breaking change for every deployed switch.
//!
//! A line that does not parse as a known inbound event (unknown event, wrong
//! field types, truncated JSON) is dropped without closing the connection —
//! a misbehaving switch must never disturb the others.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

// ── Inbound (switch → registry) ───────────────────────────────────────────────

/// Events a switch may send to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Periodic announcement of presence.
    ///
    /// `switch_ip` is the switch's self-declared logical identity (an
    /// IPv4-formatted key, validated before use). `vpn_port` is the port the
    /// switch's tunnel endpoint listens on. The public IP is taken from the
    /// transport-observed remote address, never from the message body —
    /// a switch cannot announce an endpoint it does not hold.
    ///
    /// Carried as `u32` so out-of-range ports (65536, ...) reach the
    /// validator instead of failing inside serde.
    Pulse { switch_ip: String, vpn_port: u32 },
}

impl ClientMessage {
    /// Parse one protocol line. `None` means "silently drop" (§ error
    /// taxonomy: malformed pulses are non-fatal and produce no reply).
    pub fn parse_line(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }
}

// ── Outbound (registry → switch) ──────────────────────────────────────────────

/// Events the registry emits to connected switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Announce or update a switch's public endpoint.
    /// Unicast during a session's initial sync; broadcast on confirmed change.
    SetRemoteAddr {
        switch_ip: String,
        public_ip: Ipv4Addr,
        vpn_port: u16,
    },

    /// Announce that a switch's record expired. Always broadcast.
    DeleteRemoteAddr { switch_ip: String },
}

impl ServerMessage {
    /// Serialize to one protocol line, without the trailing newline.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).expect("server message serialization failed")
    }
}

// ── Constants ─────────────────────────────────────────────────────────────────

/// Staleness window for switch records, in milliseconds (20 minutes).
/// A record whose last accepted pulse is strictly older than this is removed
/// at the next sweep and must not be exposed to newly joining sessions.
pub const EXPIRY_WINDOW_MS: u64 = 1_200_000;

/// Default registry listen port.
pub const DEFAULT_LISTEN_PORT: u16 = 5000;

// ── Tests ─────────────────────────────────────────────────────────────────────
