//! HTTP gateway for ragchat.
//!
//! Exposes the streaming chat endpoint, the document upload endpoint, and a
//! health check. Built on Axum; every handler shares one [`Services`].

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Json, Router, extract::State, routing::get};
use ragchat_chat::Services;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub use api_v1::SharedServices;

/// Build the full router.
///
/// Layers applied:
/// - CORS mirroring the request origin (or the configured allow-list), with credentials
/// - Request body size limit from `gateway.max_upload_bytes`
/// - HTTP trace logging
pub fn build_router(services: SharedServices) -> Router {
    let cors = cors_layer(&services.config.gateway.allowed_origins);
    let body_limit = services.config.gateway.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .with_state(services.clone())
        .nest("/v1", api_v1::v1_router(services))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Bind and serve until Ctrl-C.
pub async fn start(services: Services) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", services.config.gateway.host, services.config.gateway.port);
    let app = build_router(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Health ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    retrieval: bool,
    tools: bool,
}

async fn health_handler(State(services): State<SharedServices>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        retrieval: services.retrieval_enabled(),
        tools: services.tools_enabled(),
    })
}
