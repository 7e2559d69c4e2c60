//! API layer for term-gateway.
//!
//! This module provides the REST endpoints for session lifecycle management
//! and the WebSocket endpoint carrying each session's duplex channel.
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check
//! - `GET /api/v1/` - API information
//!
//! ### Sessions
//! - `GET /api/v1/sessions` - List all sessions
//! - `POST /api/v1/sessions` - Create a new session
//! - `GET /api/v1/sessions/{name}` - Get session status
//! - `DELETE /api/v1/sessions/{name}` - Terminate a session
//! - `WS /api/v1/sessions/{name}/ws` - Duplex session channel
//!
//! ## Example
//!
//! ```no_run
//! use term_gateway::api::{ServerConfig, serve};
//!
//! #[tokio::main]
//! async fn main() -> term_gateway::Result<()> {
//!     let config = ServerConfig::new("127.0.0.1", 3000);
//!     serve(config).await
//! }
//! ```

pub mod handlers;
pub mod protocol;
pub mod router;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use handlers::{AppState, SessionDefaults};
pub use protocol::{ClientMessage, ServerMessage};
pub use router::{create_router, create_router_with_state, serve, serve_with_state, ServerConfig};
pub use types::{
    CreateSessionRequest, CreateSessionResponse, ErrorResponse, ListSessionsResponse,
    SessionStatusResponse,
};
