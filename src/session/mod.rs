//! Session management module.
//!
//! This module provides the session registry (naming, lifecycle, routing)
//! and the per-session output pump that bridges PTY output into whatever
//! sink is currently attached.

mod name;
mod pump;
mod registry;

pub use name::SessionName;
pub use pump::{OutputPump, OutputSink, PumpMode};
pub use registry::{SessionRegistry, SessionStatus};
