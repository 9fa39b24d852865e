//! ADK pass-through
//!
//! Requests under `/adk` are forwarded to the ADK api_server so its REST API
//! and web UI stay reachable through the gateway.

use crate::agent::AgentError;
use crate::error::AppError;
use crate::state::AppState;
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{StatusCode, Uri},
    response::Response,
};
use tracing::debug;

/// Path prefix the ADK app is mounted under
pub const ADK_PREFIX: &str = "/adk";

/// Largest request body forwarded upstream
const MAX_PROXY_BODY: usize = 10 * 1024 * 1024;

/// Headers that apply to a single connection and must not be forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Reverse proxy to the ADK server
pub struct AdkProxy {
    client: reqwest::Client,
    base_url: String,
}

impl AdkProxy {
    /// Create a proxy for the ADK server at `base_url`
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        // Redirects are passed back to the browser untouched
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(anyhow!("Failed to build proxy client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Upstream URL for a gateway URI under `/adk`
    pub fn upstream_url(&self, uri: &Uri) -> String {
        let path = uri.path().strip_prefix(ADK_PREFIX).unwrap_or(uri.path());
        let path = if path.is_empty() { "/" } else { path };
        match uri.query() {
            Some(query) => format!("{}{}?{}", self.base_url, path, query),
            None => format!("{}{}", self.base_url, path),
        }
    }

    /// Forward one request and translate the upstream response
    pub async fn forward(&self, request: Request) -> Result<Response, AppError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, MAX_PROXY_BODY)
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read request body: {}", e)))?;

        let url = self.upstream_url(&parts.uri);
        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|e| AppError::InvalidInput(format!("Unsupported method: {}", e)))?;
        debug!(method = %method, url = %url, "Forwarding to ADK");

        let mut upstream = self.client.request(method, &url);
        for (name, value) in parts.headers.iter() {
            if !is_hop_by_hop(name.as_str()) {
                upstream = upstream.header(name.as_str(), value.as_bytes());
            }
        }

        let response = upstream
            .body(body)
            .send()
            .await
            .map_err(AgentError::from)?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| AppError::Internal(anyhow!("Invalid upstream status: {}", e)))?;
        let mut builder = Response::builder().status(status);
        for (name, value) in response.headers().iter() {
            if !is_hop_by_hop(name.as_str()) {
                builder = builder.header(name.as_str(), value.as_bytes());
            }
        }

        // Streamed so server-sent events from /run_sse reach the client as they arrive
        builder
            .body(Body::from_stream(response.bytes_stream()))
            .map_err(|e| AppError::Internal(anyhow!("Failed to build proxy response: {}", e)))
    }
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// ANY /adk/*path - Forward to the ADK server
pub async fn forward_to_adk(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, AppError> {
    let proxy = state
        .adk_proxy
        .clone()
        .ok_or_else(|| AppError::Internal(anyhow!("ADK proxy is not configured")))?;
    proxy.forward(request).await
}
