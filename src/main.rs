//! Gatewright server entry point (§10.4 bootstrap sequence).

use gatewright::config::GatewayConfig;
use gatewright::pipeline::GatewayState;
use gatewright::store::{snapshot, DocumentStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("gatewright v{} starting", gatewright::VERSION);

    let config = GatewayConfig::from_env();
    let bind_addr = config.bind_addr.clone();
    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    let state = Arc::new(GatewayState::new(config));
    load_snapshot(&state.store, &state.config);

    let store_for_dump = state.store.clone();
    let config_for_dump = state.config.clone();
    let result = gatewright::server::run(state, &bind_addr, request_timeout).await;

    dump_snapshot(&store_for_dump, &config_for_dump);
    result
}

/// Load-on-startup half of §10.4's persistence step: a missing file is the
/// ordinary cold-start case, not an error.
fn load_snapshot(store: &Arc<dyn DocumentStore>, config: &GatewayConfig) {
    let (Some(key), Some(path)) = (&config.mem_encryption_key, &config.mem_dump_path) else { return };
    match std::fs::read(path) {
        Ok(bytes) => match snapshot::restore(&bytes, key) {
            Ok(data) => {
                store.load_all(data);
                info!("restored store snapshot from {path}");
            }
            Err(e) => tracing::warn!("failed to restore snapshot from {path}: {e}"),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("failed to read snapshot file {path}: {e}"),
    }
}

/// Dump-on-shutdown half of §10.4's persistence step, run after the server's
/// graceful shutdown completes.
fn dump_snapshot(store: &Arc<dyn DocumentStore>, config: &GatewayConfig) {
    let (Some(key), Some(path)) = (&config.mem_encryption_key, &config.mem_dump_path) else { return };
    match snapshot::dump(&store.snapshot_all(), key) {
        Ok(bytes) => match std::fs::write(path, bytes) {
            Ok(()) => info!("dumped store snapshot to {path}"),
            Err(e) => tracing::warn!("failed to write snapshot to {path}: {e}"),
        },
        Err(e) => tracing::warn!("failed to encode snapshot: {e}"),
    }
}
