//! # term-gateway
//!
//! Multi-session terminal gateway.
//!
//! This crate spawns local interactive shell processes on pseudo-terminals,
//! exposes each one as a named session, and streams session input/output to
//! remote clients over a WebSocket duplex channel. It supports both Windows
//! (ConPTY) and Unix (PTY) terminals through a unified interface.
//!
//! ## Features
//!
//! - **Cross-platform PTY**: Unified interface for Windows ConPTY and Unix PTY
//! - **Named sessions**: Deterministic lowest-unused-integer naming
//! - **Live streaming**: Per-session output pump with event or poll delivery
//! - **Duplex protocol**: Ordered JSON-array messages for control and data
//!
//! ## Quick Start
//!
//! ```no_run
//! use term_gateway::{SessionRegistry, SpawnSpec};
//!
//! #[tokio::main]
//! async fn main() -> term_gateway::Result<()> {
//!     // Initialize logging
//!     term_gateway::logging::try_init().ok();
//!
//!     // Create a session registry
//!     let registry = SessionRegistry::new();
//!
//!     // Spawn a shell session; names start at 1
//!     let name = registry.create_session(SpawnSpec::default())?;
//!     registry.write(name, b"echo hello\n").await?;
//!
//!     registry.terminate(name, false).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pty;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use error::{GatewayError, Result};
pub use pty::{default_shell, PtyEvent, PtyProcess, PtySize, SpawnSpec};
pub use session::{OutputPump, OutputSink, PumpMode, SessionName, SessionRegistry, SessionStatus};
