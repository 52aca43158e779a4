// src/server/mod.rs

use crate::context::ContextFactory;
use crate::session::SessionStore;
use crate::shell::{self, Action, ShellError, View};
use crate::ui::{self, PageLabels};
use axum::{
    Form, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::trace::TraceLayer;

pub const SESSION_COOKIE: &str = "chat_session";

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    sessions: SessionStore,
    factory: ContextFactory,
    labels: Arc<PageLabels>,
}

impl AppState {
    pub fn new(factory: ContextFactory, labels: PageLabels) -> Self {
        Self {
            sessions: SessionStore::new(),
            factory,
            labels: Arc::new(labels),
        }
    }

    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

#[derive(Debug, Deserialize)]
struct SendForm {
    #[serde(default)]
    message: String,
}

/// Errors that end an interaction with the host's generic error page.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error("session lock poisoned")]
    Poisoned,
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "❌ interaction failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal server error: {self}"),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/send", post(send))
        .route("/clear", post(clear))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let sessions = state.sessions().clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            sessions.sweep();
        }
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 chat UI listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ServerError> {
    let (view, cookie) = interact(&state, &headers, Action::Idle).await?;
    let response = Html(ui::render_page(&view, &state.labels)).into_response();
    Ok(with_cookie(response, cookie))
}

/// Runs the agent, then redirects so a browser refresh does not resubmit.
async fn send(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SendForm>,
) -> Result<Response, ServerError> {
    let (_, cookie) = interact(&state, &headers, Action::Submit(form.message)).await?;
    Ok(with_cookie(Redirect::to("/").into_response(), cookie))
}

async fn clear(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ServerError> {
    let (_, cookie) = interact(&state, &headers, Action::Clear).await?;
    Ok(with_cookie(Redirect::to("/").into_response(), cookie))
}

/// Runs the shell for the caller's session on the blocking pool. The second
/// value is the id to set as a cookie when a new session was started.
async fn interact(
    state: &AppState,
    headers: &HeaderMap,
    action: Action,
) -> Result<(View, Option<String>), ServerError> {
    let cookie_id = session_id(headers);
    let (id, handle, created) = state.sessions.get_or_create(cookie_id.as_deref());
    let factory = state.factory.clone();

    let view = tokio::task::spawn_blocking(move || {
        let mut session = handle.lock().map_err(|_| ServerError::Poisoned)?;
        shell::interact(&mut session, action, &factory).map_err(ServerError::from)
    })
    .await??;

    Ok((view, created.then_some(id)))
}

fn with_cookie(mut response: Response, id: Option<String>) -> Response {
    if let Some(id) = id {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

/// Pulls the session id out of the request's `Cookie` headers.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}
