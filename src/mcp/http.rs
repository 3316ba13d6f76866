//! HTTP transports: a plain JSON-RPC endpoint and the legacy SSE session
//! protocol, both feeding [`McpServer::handle_text`].

use crate::mcp::server::{HealthStatus, McpServer};
use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Messages buffered per SSE session before senders wait
const SESSION_BUFFER: usize = 32;
const MESSAGES_PATH: &str = "/messages/";

struct HttpState {
    server: Arc<McpServer>,
    sessions: RwLock<HashMap<String, mpsc::Sender<String>>>,
}

impl HttpState {
    async fn session(&self, id: &str) -> Option<mpsc::Sender<String>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    async fn close_session(&self, id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(id).is_some() {
            debug!("Closed SSE session {}", id);
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

/// Router with `/health`, `/mcp`, `/sse` and `/messages/`
#[inline]
pub fn router(server: Arc<McpServer>) -> Router {
    let state = Arc::new(HttpState {
        server,
        sessions: RwLock::new(HashMap::new()),
    });

    Router::new()
        .route("/health", get(health))
        .route("/mcp", post(post_message))
        .route("/sse", get(open_session))
        .route("/messages/", post(post_session_message))
        .route("/messages", post(post_session_message))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `host:port` and serve until Ctrl-C
#[inline]
pub async fn serve(server: Arc<McpServer>, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Starting MCP server with HTTP transport on http://{}", addr);
    info!("  POST /mcp           JSON-RPC");
    info!("  GET  /sse           SSE session");
    info!("  GET  /health        health check");

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn health(State(state): State<Arc<HttpState>>) -> Json<HealthStatus> {
    Json(state.server.health().await)
}

async fn post_message(State(state): State<Arc<HttpState>>, body: String) -> Response {
    match state.server.handle_text(&body).await {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn open_session(
    State(state): State<Arc<HttpState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::channel::<String>(SESSION_BUFFER);

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id.clone(), tx.clone());
    }
    info!("Opened SSE session {}", session_id);

    // The receiver lives in the response stream, so it drops on disconnect
    let reaper_state = Arc::clone(&state);
    let reaper_id = session_id.clone();
    tokio::spawn(async move {
        tx.closed().await;
        reaper_state.close_session(&reaper_id).await;
    });

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}?session_id={}", MESSAGES_PATH, session_id));
    let messages = ReceiverStream::new(rx)
        .map(|json| Ok::<_, Infallible>(Event::default().event("message").data(json)));

    let stream = tokio_stream::once(Ok::<_, Infallible>(endpoint)).chain(messages);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn post_session_message(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> Response {
    let Some(sender) = state.session(&query.session_id).await else {
        warn!("Message for unknown SSE session {}", query.session_id);
        return (StatusCode::NOT_FOUND, "Session not found").into_response();
    };

    if let Some(reply) = state.server.handle_text(&body).await {
        let json = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize reply: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        // Client went away between lookup and send
        if sender.send(json).await.is_err() {
            state.close_session(&query.session_id).await;
            return (StatusCode::NOT_FOUND, "Session not found").into_response();
        }
    }

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
