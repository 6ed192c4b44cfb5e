//! /status, /switches, /connections handlers. Read-only diagnostics.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use switchboard_services::{ConnectionTable, SharedPeerTable};

/// Shared handles the daemon passes in at startup.
#[derive(Clone)]
pub struct ApiState {
    pub table: SharedPeerTable,
    pub connections: ConnectionTable,
    pub started_at: Instant,
}

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub connections: usize,
    pub switches: usize,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let switches = state.table.lock().await.len();
    Json(StatusResponse {
        uptime_secs: state.started_at.elapsed().as_secs(),
        connections: state.connections.len(),
        switches,
    })
}

// ── /switches ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SwitchesResponse {
    pub switches: Vec<SwitchInfo>,
}

#[derive(Serialize)]
pub struct SwitchInfo {
    pub switch_ip: String,
    pub public_ip: String,
    pub vpn_port: u16,
    pub last_seen_secs: u64,
}

pub async fn handle_switches(State(state): State<ApiState>) -> Json<SwitchesResponse> {
    let table = state.table.lock().await;
    let switches = table
        .records()
        .map(|(identity, record)| SwitchInfo {
            switch_ip: identity.clone(),
            public_ip: record.endpoint.public_ip.to_string(),
            vpn_port: record.endpoint.vpn_port,
            last_seen_secs: record.last_seen.elapsed().as_secs(),
        })
        .collect();

    Json(SwitchesResponse { switches })
}

// ── /connections ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<ConnectionInfo>,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub id: u64,
    pub remote_addr: String,
    pub synced: bool,
}

pub async fn handle_connections(State(state): State<ApiState>) -> Json<ConnectionsResponse> {
    let mut connections: Vec<ConnectionInfo> = state
        .connections
        .iter()
        .map(|e| ConnectionInfo {
            id: *e.key(),
            remote_addr: e.value().remote_addr.to_string(),
            synced: e.value().is_synced(),
        })
        .collect();
    connections.sort_by_key(|c| c.id);

    Json(ConnectionsResponse { connections })
}
