//! Router assembly
//!
//! Routes, CORS policy and request tracing middleware.

use crate::api;
use crate::config::ServerConfig;
use crate::state::AppState;
use crate::websocket;
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
    routing::{any, get, post},
    Router,
};
use std::time::Instant;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

/// CORS policy from configuration
///
/// No origin list means any origin. An explicit list also allows credentials,
/// so methods and headers are mirrored instead of wildcarded.
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    match &config.allowed_origins {
        None => CorsLayer::permissive(),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
        }
    }
}

/// Build the complete router with all routes and middleware
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        // Health check and hello world
        .route("/", get(api::status::hello_world))
        .route("/api/health", get(api::status::health_check))
        // Sessions and chat
        .route("/api/sessions", post(api::sessions::create_session))
        .route(
            "/api/chat/:session_id",
            get(api::chat::get_chat_history).post(api::chat::send_message),
        )
        .route("/api/status/:session_id", get(api::status::get_status))
        // WebSocket for real-time updates
        .route("/ws/:session_id", get(websocket::websocket_handler));

    if state.adk_proxy.is_some() {
        router = router
            .route(api::proxy::ADK_PREFIX, any(api::proxy::forward_to_adk))
            .route("/adk/*path", any(api::proxy::forward_to_adk));
    }

    router
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(cors_layer(config))
        .with_state(state)
}
