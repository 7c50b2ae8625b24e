//! HTTP server wiring (§6): a single fallback handler routes every wire
//! path into the pipeline, adapted from the teacher's `RestApiServer` —
//! one shared `Router` built once and served behind `axum::serve`, with
//! the teacher's trace/timeout/body-limit layering kept as-is.

use crate::pipeline::{self, GatewayState, IncomingRequest};
use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<GatewayState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", axum::routing::get(healthz))
        .fallback(axum::routing::any(gateway_fallback))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn gateway_fallback(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = IncomingRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().unwrap_or("").to_string(),
        headers,
        body: body.to_vec(),
        peer_ip: peer.ip(),
    };

    let resp = pipeline::handle(&state, req).await;
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    if let Some(builder_headers) = builder.headers_mut() {
        *builder_headers = resp.headers;
    }
    builder.body(Body::from(resp.body)).unwrap_or_else(|_| {
        (StatusCode::INTERNAL_SERVER_ERROR, "response build failed").into_response()
    })
}

/// Bind and serve, returning once the listener fails or the process is
/// signalled to stop (§10.4 bootstrap).
pub async fn run(state: Arc<GatewayState>, bind_addr: &str, request_timeout: Duration) -> std::io::Result<()> {
    let router = build_router(state, request_timeout);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("gateway listening on {bind_addr}");
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
