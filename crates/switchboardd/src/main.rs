//! switchboardd — Switchboard rendezvous registry daemon.
//!
//! Keeps the current best-known public endpoint for every mesh switch
//! behind NAT and pushes changes to all connected switches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use switchboard_core::config::SwitchboardConfig;
use switchboard_services::{new_connection_table, new_shared_table, PulseDispatcher};

use switchboardd::listener::RegistryListener;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = SwitchboardConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = SwitchboardConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        SwitchboardConfig::default()
    });

    // Shared state
    let table = new_shared_table(Duration::from_secs(config.registry.expiry_secs));
    let connections = new_connection_table();
    let dispatcher = Arc::new(PulseDispatcher::new(table.clone(), connections.clone()));

    let listener = TcpListener::bind(("0.0.0.0", config.network.listen_port))
        .await
        .context("failed to bind registry listen socket")?;
    tracing::info!(
        port = config.network.listen_port,
        expiry_secs = config.registry.expiry_secs,
        "switchboardd starting"
    );

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let registry_task = tokio::spawn(
        RegistryListener::new(listener, connections.clone(), dispatcher, shutdown_tx.subscribe())
            .run(),
    );

    let api_task = {
        let state = switchboard_api::ApiState {
            table,
            connections,
            started_at: Instant::now(),
        };
        let api_port = config.network.api_port;
        tokio::spawn(async move {
            if let Err(e) = switchboard_api::serve(state, api_port).await {
                tracing::error!(error = %e, "status server failed");
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = registry_task      => tracing::error!("registry listener exited: {:?}", r),
        r = api_task           => tracing::error!("status server exited: {:?}", r),
    }

    Ok(())
}
