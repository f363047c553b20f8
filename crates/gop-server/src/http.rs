//! The demo HTTP service.
//!
//! Every request holds an in-flight guard for as long as its handler runs, so
//! the restart coordinator can tell when this generation is idle.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use gop_ecdysis::{InFlight, ServeContext};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

use crate::app::App;

#[derive(Clone)]
pub struct HttpState {
    pub app: Arc<App>,
    pub in_flight: InFlight,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(hello_handler))
        .route("/_gop/config", get(config_handler))
        .route("/_gop/health", get(health_handler))
        .layer(middleware::from_fn_with_state(state.clone(), track_in_flight))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Accept/serve loop handed to the restart coordinator.
///
/// Stops accepting once `ctx.stop_accepting` fires; otherwise runs until the
/// process exits.
pub async fn serve(listener: TcpListener, app: Arc<App>, ctx: ServeContext) {
    let local = listener.local_addr().ok();
    let router = router(HttpState {
        app,
        in_flight: ctx.in_flight,
    });
    let stop = ctx.stop_accepting;

    info!(?local, "Starting Axum HTTP server");
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            stop.cancelled().await;
            info!("HTTP server stopped accepting, finishing open connections");
        })
        .await;

    if let Err(e) = result {
        error!(error = %e, "HTTP server failed");
    }
}

async fn track_in_flight(State(state): State<HttpState>, request: Request, next: Next) -> Response {
    let _guard = state.in_flight.guard();
    next.run(request).await
}

#[derive(Debug, Deserialize)]
struct HelloParams {
    sleep_ms: Option<u64>,
}

/// Greeting; `?sleep_ms=N` holds the request open for N milliseconds.
async fn hello_handler(
    State(state): State<HttpState>,
    Query(params): Query<HelloParams>,
) -> impl IntoResponse {
    let slept_ms = params.sleep_ms.unwrap_or(0);
    if slept_ms > 0 {
        tokio::time::sleep(Duration::from_millis(slept_ms)).await;
    }

    (
        StatusCode::OK,
        Json(json!({
            "message": format!("Hello from {}/{}", state.app.project, state.app.name),
            "pid": std::process::id(),
            "slept_ms": slept_ms,
        })),
    )
}

async fn config_handler(State(state): State<HttpState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.app.snapshot().await))
}

async fn health_handler(State(state): State<HttpState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "gop-server",
            "version": env!("CARGO_PKG_VERSION"),
            "pid": std::process::id(),
            "in_flight": state.in_flight.count(),
            "config_reloads": state.app.reloads(),
        })),
    )
}
