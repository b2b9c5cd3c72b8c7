//! Webhook HTTP server (axum, single port).

use crate::channels::{verify_signature, LineChannel, WebhookRequest};
use crate::config::{self, Config};
use crate::dispatch;
use crate::llm::GeminiClient;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

const LIVENESS_BODY: &str = "AI Auto Posting Webhook is running";

/// Shared state for the gateway (config, LINE channel, Gemini client).
/// Built once at startup; credentials are resolved here, not read from
/// globals at request time.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Channel secret used to verify webhook signatures, resolved at startup.
    pub channel_secret: Option<String>,
    pub line: LineChannel,
    pub gemini: GeminiClient,
}

impl AppState {
    /// Resolve credentials from config and environment and build the clients.
    pub fn from_config(config: Config) -> Self {
        let channel_secret = config::resolve_line_channel_secret(&config);
        let line = LineChannel::new(
            config::resolve_line_access_token(&config),
            config.channels.line.api_base.clone(),
        );
        let gemini = GeminiClient::new(
            config::resolve_gemini_api_key(&config),
            config.generation.model.clone(),
            config.generation.api_base.clone(),
        );
        Self {
            config: Arc::new(config),
            channel_secret,
            line,
            gemini,
        }
    }
}

/// Build the router (liveness + webhook).
fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/line/webhook", post(line_webhook))
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:resolved port.
/// Blocks until shutdown (Ctrl+C or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    let port = config::resolve_port(&config);
    let bind = config.gateway.bind.trim().to_string();
    let state = AppState::from_config(config);

    if state.line.has_token() {
        log::info!("line channel configured");
    } else {
        log::warn!("LINE_CHANNEL_ACCESS_TOKEN not configured; replies will fail");
    }
    if state.channel_secret.is_none() {
        log::warn!("LINE_CHANNEL_SECRET not configured; webhook signatures are not verified");
    }

    let app = router(state);
    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            log::error!("failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => {
                log::error!("failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}

/// GET / — fixed plaintext liveness string (for probes and the LINE console check).
async fn liveness() -> &'static str {
    LIVENESS_BODY
}

/// POST /line/webhook — verifies x-line-signature against the raw body,
/// parses the event batch, and dispatches. 200 on normal completion even
/// when individual generation calls degraded to warning replies; 500 only
/// on an uncaught fault (remaining events in the batch are dropped and
/// LINE is responsible for redelivery).
async fn line_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref secret) = state.channel_secret {
        let signature = headers
            .get("x-line-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !verify_signature(secret, signature, &body) {
            log::warn!("webhook signature verification failed");
            return StatusCode::FORBIDDEN;
        }
    }
    let request: WebhookRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("webhook body is not a valid event batch: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    match dispatch::handle_events(&state, request.events).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            log::error!("webhook batch processing failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
