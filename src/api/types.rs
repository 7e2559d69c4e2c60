//! API request and response types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::session::{SessionName, SessionStatus};

/// Request to create a new session.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateSessionRequest {
    /// Command to run (e.g., "bash", "powershell.exe"). Defaults to the
    /// configured shell.
    #[serde(default)]
    pub command: Option<String>,
    /// Initial working directory.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Environment overrides for the spawned process.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Initial terminal rows.
    #[serde(default)]
    pub rows: Option<u16>,
    /// Initial terminal columns.
    #[serde(default)]
    pub cols: Option<u16>,
}

/// Response for session creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionResponse {
    /// The assigned session name.
    pub name: String,
}

impl CreateSessionResponse {
    pub fn new(name: SessionName) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Response for a session status query.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusResponse {
    /// Session name.
    pub name: String,
    /// Process ID, when the platform reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Whether the session process is still running.
    pub alive: bool,
    /// Current terminal rows.
    pub rows: u16,
    /// Current terminal columns.
    pub cols: u16,
}

impl SessionStatusResponse {
    pub fn from_status(status: &SessionStatus) -> Self {
        Self {
            name: status.name.to_string(),
            pid: status.pid,
            alive: status.alive,
            rows: status.size.rows,
            cols: status.size.cols,
        }
    }
}

/// One entry in the session listing.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub name: String,
    pub alive: bool,
    pub rows: u16,
    pub cols: u16,
}

/// Response for the session listing.
#[derive(Debug, Clone, Serialize)]
pub struct ListSessionsResponse {
    pub count: usize,
    pub sessions: Vec<SessionSummary>,
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "SESSION_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn session_not_found(name: &str) -> Self {
        Self::new("SESSION_NOT_FOUND", format!("Session '{name}' not found"))
    }

    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self::new("SPAWN_FAILED", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::PtySize;

    #[test]
    fn test_create_request_defaults() {
        let req: CreateSessionRequest = serde_json::from_str("{}").unwrap();
        assert!(req.command.is_none());
        assert!(req.working_dir.is_none());
        assert!(req.env.is_empty());
        assert!(req.rows.is_none());
    }

    #[test]
    fn test_create_request_full() {
        let json = r#"{
            "command": "bash",
            "working_dir": "/tmp",
            "env": {"TERM": "xterm-256color"},
            "rows": 40,
            "cols": 120
        }"#;
        let req: CreateSessionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.command.as_deref(), Some("bash"));
        assert_eq!(req.working_dir.as_deref(), Some("/tmp"));
        assert_eq!(req.env.get("TERM").map(String::as_str), Some("xterm-256color"));
        assert_eq!(req.rows, Some(40));
        assert_eq!(req.cols, Some(120));
    }

    #[test]
    fn test_status_response_from_status() {
        let status = SessionStatus {
            name: SessionName::from_raw(3),
            pid: Some(4242),
            alive: true,
            size: PtySize::new(30, 100),
        };

        let resp = SessionStatusResponse::from_status(&status);
        assert_eq!(resp.name, "3");
        assert_eq!(resp.pid, Some(4242));
        assert!(resp.alive);
        assert_eq!(resp.rows, 30);
        assert_eq!(resp.cols, 100);
    }

    #[test]
    fn test_error_response_serialization() {
        let err = ErrorResponse::session_not_found("9");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("SESSION_NOT_FOUND"));
        assert!(json.contains('9'));
    }
}
