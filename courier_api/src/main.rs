mod error;
mod pagination;
mod state;
mod tracking;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{http::Method, serve};
use clap::Parser;
use courier_tracking::{config::TrackingConfig, ingest_coordinator::IngestCoordinator};
use mimalloc::MiMalloc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{Level, info};

use crate::{state::AppState, tracking::routes::tracking_routes};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Address the HTTP server listens on
    #[arg(short, long, env = "COURIER_BIND_ADDR", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let config = TrackingConfig::from_env().context("invalid tracking configuration")?;
    info!(
        recent_threshold_seconds = config.recent_threshold.as_secs(),
        min_moving_speed_kmh = config.min_moving_speed.value(),
        subscriber_buffer = config.subscriber_buffer,
        "Loaded tracking configuration"
    );

    let state = Arc::new(AppState {
        coordinator: IngestCoordinator::builder(config).build(),
    });

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    let app = tracking_routes(state).layer(ServiceBuilder::new().layer(cors_layer));

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("could not bind {}", cli.bind))?;

    info!(address = %cli.bind, "Courier tracking API listening");
    serve(listener, app).await?;

    Ok(())
}
