//! The Lantern HTTP server: GenAI endpoints, health check and Prometheus scrape endpoint.

mod error;
mod instrumentation;
pub mod logger;

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use config::Config;
use genai::GenAiClient;
use telemetry::{Exposition, Telemetry};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::Error;
pub use instrumentation::{HttpTelemetryLayer, REQUEST_ID_HEADER};

pub type Result<T> = std::result::Result<T, Error>;

pub struct ServeConfig {
    pub listen_address: SocketAddr,
    pub config: Config,
    /// Cancelled to shut the server down gracefully.
    pub shutdown_signal: CancellationToken,
    pub log_filter: String,
}

pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        log_filter,
    }: ServeConfig,
) -> crate::Result<()> {
    logger::init(&log_filter);

    let (telemetry, telemetry_guard) = telemetry::init(&config.telemetry, &config.instrumentation)
        .await
        .map_err(Error::Telemetry)?;

    log::info!(
        "Recording GenAI telemetry with origin(s): {}",
        telemetry
            .recorders()
            .origins()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let app = router(&config, &telemetry)?;

    let listener = TcpListener::bind(listen_address).await.map_err(Error::Bind)?;

    match &config.server.tls {
        Some(tls_config) => {
            // Both ring and aws-lc-rs are linked in, so rustls needs an explicit default.
            let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| Error::Tls(e.to_string()))?;

            log::info!("Lantern listening on https://{listen_address}");

            // Convert tokio listener to std listener for axum-server
            let std_listener = listener.into_std().map_err(Error::Bind)?;

            let handle = Handle::new();

            tokio::spawn({
                let handle = handle.clone();
                let shutdown_signal = shutdown_signal.clone();

                async move {
                    shutdown_signal.cancelled().await;
                    handle.graceful_shutdown(None);
                }
            });

            axum_server::from_tcp_rustls(std_listener, rustls_config)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .map_err(|e| Error::Server(std::io::Error::other(e)))?;
        }
        None => {
            log::info!("Lantern listening on http://{listen_address}");

            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move { shutdown_signal.cancelled().await })
                .await
                .map_err(Error::Server)?;
        }
    }

    log::info!("Server stopped, flushing telemetry");

    if let Err(e) = telemetry_guard.force_flush() {
        log::error!("{e}");
    }

    Ok(())
}

/// All routes of the server for the given configuration.
pub fn router(config: &Config, telemetry: &Telemetry) -> crate::Result<Router> {
    let client = GenAiClient::new(config, telemetry)?;
    let mut app = genai::router(client);

    if config.server.health.enabled {
        app = app.route(&config.server.health.path, get(health));
    }

    match (config.telemetry.prometheus(), telemetry.exposition()) {
        (Some(prometheus), Some(exposition)) => {
            log::debug!("Prometheus metrics exposed at {}", prometheus.path);

            let metrics_routes = Router::new()
                .route(&prometheus.path, get(metrics))
                .with_state(exposition.clone());

            app = app.merge(metrics_routes);
        }
        _ => log::debug!("Prometheus exposition disabled"),
    }

    Ok(app.layer(HttpTelemetryLayer::new(telemetry.recorders().clone())))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn metrics(State(exposition): State<Exposition>) -> impl IntoResponse {
    ([(CONTENT_TYPE, telemetry::exposition::CONTENT_TYPE)], exposition.render())
}
