//! Backend entry-point: loads settings, wires adapters, starts the
//! fulfillment workers, and serves the REST API until a shutdown signal.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use seckill::inbound::http::health::HealthState;
use server::{AppSettings, ServerConfig, build_wiring, create_server, start_workers};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().map_err(|err| eyre!("failed to load settings: {err}"))?;
    let bind_addr = settings.bind_addr()?;

    let wiring = build_wiring(&settings, Arc::new(DefaultClock))
        .await
        .wrap_err("failed to wire adapters")?;
    let workers = start_workers(wiring.materializers)
        .await
        .wrap_err("failed to create the fulfillment consumer group")?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state.clone(),
        ServerConfig::new(bind_addr, wiring.http_state),
    )?;
    info!(%bind_addr, "seckill server listening");

    // Actix stops accepting on SIGINT/SIGTERM and drains in-flight requests.
    let served = server.await;
    health_state.mark_unhealthy();
    workers.shutdown().await;
    served.wrap_err("http server failed")
}
