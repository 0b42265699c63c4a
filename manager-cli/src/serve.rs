//! Webhook endpoint: each GET/POST on the configured path runs one fresh [`BotManager`].

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{ConnectInfo, Query, Request, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use bot_manager::{BotManager, RequestContext};
use manager_core::{BotClient, ManagerError};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

/// Largest accepted update body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds a client for one invocation from the bot parameters.
pub type ClientFactory<C> = Arc<dyn Fn(&Value) -> manager_core::Result<C> + Send + Sync>;

pub struct ServeState<C> {
    config: Arc<Value>,
    factory: ClientFactory<C>,
}

impl<C> Clone for ServeState<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<C: BotClient + 'static> ServeState<C> {
    pub fn new<F>(config: Value, factory: F) -> Self
    where
        F: Fn(&Value) -> manager_core::Result<C> + Send + Sync + 'static,
    {
        Self {
            config: Arc::new(config),
            factory: Arc::new(factory),
        }
    }
}

/// Router answering GET and POST on `path`.
pub fn build_router<C: BotClient + 'static>(path: &str, state: ServeState<C>) -> Router {
    Router::new()
        .route(path, get(handle_invocation::<C>).post(handle_invocation::<C>))
        .with_state(state)
}

/// Binds `listen` and serves until the process ends.
pub async fn serve<C: BotClient + 'static>(
    listen: SocketAddr,
    path: &str,
    state: ServeState<C>,
) -> Result<()> {
    let app = build_router(path, state);
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Bind webhook listener on {}", listen))?;

    info!(listen = %listen, path = %path, "step: webhook endpoint listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Webhook server failed")
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Maps one HTTP request onto a [`RequestContext`]. The body is kept only when non-empty.
fn request_context(
    query: BTreeMap<String, String>,
    headers: &HeaderMap,
    remote: Option<SocketAddr>,
    body: &[u8],
) -> RequestContext {
    let mut request = RequestContext::http(query);
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        request = request.with_forwarded_for(forwarded);
    }
    if let Some(client_ip) = header_value(headers, "client-ip") {
        request = request.with_client_ip(client_ip);
    }
    if let Some(remote) = remote {
        request = request.with_remote_addr(remote.ip());
    }
    if !body.is_empty() {
        request = request.with_body(String::from_utf8_lossy(body).into_owned());
    }
    request
}

#[instrument(skip_all)]
async fn handle_invocation<C: BotClient + 'static>(
    State(state): State<ServeState<C>>,
    Query(query): Query<BTreeMap<String, String>>,
    request: Request,
) -> (StatusCode, String) {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let headers = request.headers().clone();
    let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "step: unreadable request body");
            return (StatusCode::BAD_REQUEST, format!("Invalid body: {}", e));
        }
    };

    let context = request_context(query, &headers, remote, &body);
    match run_invocation(&state, context).await {
        Ok(output) => (StatusCode::OK, output),
        Err(ManagerError::InvalidAccess) => {
            warn!(remote = ?remote, "step: invocation rejected");
            (StatusCode::FORBIDDEN, ManagerError::InvalidAccess.to_string())
        }
        Err(e) => {
            error!(error = %e, "step: invocation failed");
            (StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

async fn run_invocation<C: BotClient>(
    state: &ServeState<C>,
    request: RequestContext,
) -> manager_core::Result<String> {
    let client = (state.factory)(&state.config)?;
    let mut manager = BotManager::new(state.config.as_ref().clone(), request, client)?;
    manager.run().await?;
    Ok(manager.output())
}
