//! REST API handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::types::{
    CreateSessionRequest, CreateSessionResponse, ErrorResponse, ListSessionsResponse,
    SessionStatusResponse, SessionSummary,
};
use crate::error::GatewayError;
use crate::pty::{PtySize, SpawnSpec};
use crate::session::{SessionName, SessionRegistry};

/// Defaults applied to session creation when a request omits them,
/// typically sourced from the gateway's configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionDefaults {
    /// Command to run when the request names none.
    pub command: Option<String>,
    /// Environment overrides applied to every session.
    pub env: HashMap<String, String>,
    /// Initial terminal size.
    pub size: PtySize,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub defaults: SessionDefaults,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            defaults: SessionDefaults::default(),
        }
    }

    pub fn with_defaults(defaults: SessionDefaults) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            defaults,
        }
    }

    /// Merge a creation request over the configured defaults.
    fn spawn_spec(&self, req: CreateSessionRequest) -> SpawnSpec {
        let mut env = self.defaults.env.clone();
        env.extend(req.env);

        SpawnSpec {
            command: req.command.or_else(|| self.defaults.command.clone()),
            working_dir: req.working_dir,
            env,
            size: PtySize::new(
                req.rows.unwrap_or(self.defaults.size.rows),
                req.cols.unwrap_or(self.defaults.size.cols),
            ),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "term-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// List all sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ListSessionsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let names = state.registry.list_names().map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal_error(e.to_string())),
        )
    })?;

    let mut sessions = Vec::with_capacity(names.len());
    for name in names {
        if let Ok(status) = state.registry.status(name).await {
            sessions.push(SessionSummary {
                name: status.name.to_string(),
                alive: status.alive,
                rows: status.size.rows,
                cols: status.size.cols,
            });
        }
    }

    Ok(Json(ListSessionsResponse {
        count: sessions.len(),
        sessions,
    }))
}

/// Create a new session.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), (StatusCode, Json<ErrorResponse>)> {
    let spec = state.spawn_spec(req);

    let name = state.registry.create_session(spec).map_err(|e| match e {
        GatewayError::Spawn(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::spawn_failed(msg)),
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal_error(other.to_string())),
        ),
    })?;

    Ok((StatusCode::CREATED, Json(CreateSessionResponse::new(name))))
}

/// Get session status.
pub async fn get_session(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SessionStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let name: SessionName = name.parse().map_err(|_| not_found(&name))?;

    let status = state
        .registry
        .status(name)
        .await
        .map_err(|_| not_found(&name.to_string()))?;

    Ok(Json(SessionStatusResponse::from_status(&status)))
}

/// Terminate and remove a session.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let parsed: SessionName = name.parse().map_err(|_| not_found(&name))?;

    match state.registry.terminate(parsed, true).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(GatewayError::UnknownSession(_)) => Err(not_found(&name)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal_error(e.to_string())),
        )),
    }
}

fn not_found(name: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::session_not_found(name)),
    )
}
