use super::handlers::{handle_executor, handle_health, handle_judge, handle_scheduler};
use super::{AppState, MAX_BODY_SIZE, REQUEST_TIMEOUT_SECS};

use crate::config::Config;
use crate::diagnostics::health;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Returns true when the bind address is not a loopback address.
fn is_public_bind(host: &str) -> bool {
    !matches!(
        host,
        "127.0.0.1" | "localhost" | "::1" | "[::1]" | "0:0:0:0:0:0:0:1"
    )
}

/// Bind `host:port` and serve the gateway.
pub async fn run_gateway(host: &str, port: u16, config: &Config, state: AppState) -> Result<()> {
    if is_public_bind(host) && !config.gateway.allow_public_bind {
        anyhow::bail!(
            "Refusing to bind to {host}: the gateway would be reachable from other hosts.\n\
             Fix: use --host 127.0.0.1 (default), put a reverse proxy in front, or set\n\
             [gateway] allow_public_bind = true in config.toml."
        );
    }

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("parse gateway bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind gateway socket")?;

    run_gateway_with_listener(host, listener, config, state).await
}

/// Serve the gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    host: &str,
    listener: tokio::net::TcpListener,
    config: &Config,
    state: AppState,
) -> Result<()> {
    let actual_port = listener
        .local_addr()
        .context("get gateway listener local address")?
        .port();
    let display_addr = format!("{host}:{actual_port}");

    if state.internal_token.is_none() {
        tracing::warn!("no internal token configured; authenticated routes will reject every call");
    }
    print_gateway_banner(&display_addr);
    tracing::info!(addr = %display_addr, "gateway listening");
    health::mark_component_ok("gateway");

    let app = build_app(state, &config.gateway.cors_origins);
    axum::serve(listener, app)
        .await
        .context("serve HTTP gateway")?;

    Ok(())
}

fn print_gateway_banner(display_addr: &str) {
    println!("Gateway listening on {display_addr}");
    println!("  GET  /health");
    println!("  POST /scheduler");
    println!("  POST /executor  {{\"job_id\": ...}}");
    println!("  POST /judge     {{\"run_id\": ...}}");
}

pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/scheduler", post(handle_scheduler))
        .route("/executor", post(handle_executor))
        .route("/judge", post(handle_judge));

    let mut app = app
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ));

    if !cors_origins.is_empty() {
        let origins: Vec<_> = cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ]),
        );
    }

    app
}
