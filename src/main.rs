//! Risk radar service: binary entrypoint.
//! Loads configuration, starts the refresh scheduler and serves the
//! published document over HTTP.

use std::sync::Arc;

use risk_radar::{
    api,
    config::RadarConfig,
    metrics::Metrics,
    pipeline::Pipeline,
    scheduler::spawn_scheduler,
    store::{DocumentStore, FileStore},
};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - RADAR_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("RADAR_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("radar=info,warn"));

    // The Shuttle runtime may already own the global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = RadarConfig::from_env().map_err(shuttle_runtime::Error::Custom)?;
    let metrics = Metrics::init(cfg.interval.as_secs()).map_err(shuttle_runtime::Error::Custom)?;

    let store: Arc<dyn DocumentStore> =
        Arc::new(FileStore::new(cfg.data_dir.clone(), cfg.storage_key.clone()));
    let pipeline =
        Arc::new(Pipeline::from_config(&cfg, store.clone()).map_err(shuttle_runtime::Error::Custom)?);

    // The sender is dropped on return, so the scheduler runs for the life
    // of the process.
    let (_stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let _scheduler = spawn_scheduler(pipeline, cfg.interval, stop_rx);

    let router = api::router(store).merge(metrics.router());
    Ok(router.into())
}
