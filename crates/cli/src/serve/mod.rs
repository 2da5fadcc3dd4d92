//! `visaflow serve` -- HTTP JSON API for the visa workflow backend.
//!
//! Exposes the identifier allocator and the workflow tracker as an async
//! HTTP service using `axum` + `tokio`.
//!
//! Security:
//! - Optional API key (`server.api_key` / `VISAFLOW_API_KEY`)
//! - Caller identity from `X-Actor-Role` and `X-Actor-Id`
//! - CORS headers on all responses (permissive)
//!
//! Endpoints:
//! - GET   /health                            - Server status (exempt from auth)
//! - POST  /applications                      - Create an application (AP-...)
//! - POST  /agents                            - Create an agent company (AG-...)
//! - POST  /tickets                           - Create a ticket (TK-...)
//! - POST  /students                          - Create student information
//! - GET   /records                           - List records visible to the caller
//! - GET   /records/{id}                      - Read by id or identifier
//! - PATCH /records/{id}/sections/{section}   - Change a section status
//! - GET   /records/{id}/history              - Transition audit trail
//! - POST  /identifiers/{category}            - Allocate a bare identifier (admin)
//!
//! All responses use Content-Type: application/json.

mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use self::handlers::{
    handle_allocate_identifier, handle_create_agent, handle_create_application,
    handle_create_student, handle_create_ticket, handle_get_record, handle_health,
    handle_history, handle_list_records, handle_not_found, handle_transition,
};
use self::middleware::{actor_middleware, auth_middleware};
use self::state::AppState;
use crate::config::VisaflowConfig;

/// Construct a JSON error response with the given status code, kind and message.
fn json_error(status: StatusCode, kind: &str, message: &str) -> impl IntoResponse {
    (
        status,
        Json(serde_json::json!({"error": message, "kind": kind})),
    )
}

/// Build the router over `state`.
fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/applications", post(handle_create_application))
        .route("/agents", post(handle_create_agent))
        .route("/tickets", post(handle_create_ticket))
        .route("/students", post(handle_create_student))
        .route("/records", get(handle_list_records))
        .route("/records/{id}", get(handle_get_record))
        .route("/records/{id}/sections/{section}", patch(handle_transition))
        .route("/records/{id}/history", get(handle_history))
        .route("/identifiers/{category}", post(handle_allocate_identifier))
        .route_layer(axum_middleware::from_fn(actor_middleware))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Start the HTTP server as `config` describes.
///
/// When TLS cert/key paths are provided, the server listens over HTTPS
/// using `axum-server` with rustls. Otherwise it uses plain HTTP.
pub async fn start_server(
    config: VisaflowConfig,
    _tls_cert: Option<std::path::PathBuf>,
    _tls_key: Option<std::path::PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_config(&config)?);
    if state.api_key.is_some() {
        info!("API key authentication enabled");
    }
    info!(
        policy = %config.workflow.transition_policy,
        notifications = %config.workflow.notifications,
        utc_offset_hours = config.calendar.utc_offset_hours,
        "workflow configured"
    );

    let app = router(state, config.server.max_body_bytes);
    let port = config.server.port;
    let addr = format!("0.0.0.0:{}", port);

    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&_tls_cert, &_tls_key) {
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
        let socket_addr: std::net::SocketAddr = addr.parse()?;
        info!("visaflow listening on https://0.0.0.0:{}", port);
        axum_server::bind_rustls(socket_addr, tls)
            .serve(app.into_make_service())
            .await?;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("visaflow listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
