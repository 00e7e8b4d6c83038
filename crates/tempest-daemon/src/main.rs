//! Tempest gateway daemon
//!
//! This binary coordinates:
//! - Observation collection (API poller, UDP listener, or simulator)
//! - The shared in-memory observation store
//! - The HTTP surface for the dashboard and alerting engine

mod scheduler;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use tempest_config::GatewayConfig;
use tempest_core::ObservationStore;
use tempest_ingest::{ApiSource, SimulatorSource, StationSource, UdpSource};

use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    tempest_obs::init("tempestd");

    let config = GatewayConfig::load().context("Failed to load configuration")?;
    info!("Loaded configuration: {:?}", config);

    let store = Arc::new(ObservationStore::new(config.history.max_points));

    let mut source = build_source(&config)?;
    source
        .start()
        .await
        .context("Failed to start observation source")?;
    info!("Observation source started: {}", source.name());

    let (router, app_state) = tempest_web::build_app(Arc::clone(&store), &config);
    let listener = tokio::net::TcpListener::bind(config.http_bind())
        .await
        .with_context(|| format!("Failed to bind {}", config.http_bind()))?;
    info!("HTTP server listening on {}", config.http_bind());

    let mut scheduler = Scheduler::new(source, store);
    tempest_web::set_ready(&app_state, true);

    info!("Gateway running - press Ctrl+C to stop");

    tokio::select! {
        result = scheduler.run() => {
            if let Err(e) = result {
                error!("Scheduler error: {}", e);
                return Err(e);
            }
        }
        result = async move { axum::serve(listener, router).await } => {
            result.context("HTTP server failed")?;
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            scheduler.stop().await?;
        }
    }

    info!("Gateway stopped");
    Ok(())
}

/// Pick the observation source from configuration. An unrecognized kind is
/// corrected to the simulator rather than treated as fatal.
fn build_source(config: &GatewayConfig) -> Result<Box<dyn StationSource>> {
    let source: Box<dyn StationSource> = match config.source.kind.as_str() {
        "simulator" => Box::new(SimulatorSource::new(config.source.interval_secs)),
        "udp" => {
            let bind = config
                .source
                .udp_bind
                .parse()
                .context("Invalid source.udp_bind address")?;
            Box::new(UdpSource::new(bind))
        }
        "api" => Box::new(ApiSource::new(
            config.source.api_base.clone(),
            config.source.station_id,
            config.source.api_token.clone(),
            config.source.interval_secs,
        )),
        other => {
            warn!(kind = other, "unknown source.kind, using simulator");
            Box::new(SimulatorSource::new(config.source.interval_secs))
        }
    };
    Ok(source)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install signal handler: {}", e);
    }
}
