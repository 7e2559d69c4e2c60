//! Session registry and lifecycle manager.
//!
//! Owns the name → session mapping: allocates names, spawns session
//! processes, starts output pumps on attach, and routes write/resize/
//! terminate to the right process. Constructed explicitly at startup and
//! passed to collaborators; there is no process-wide singleton.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::pump::{OutputPump, OutputSink, PumpMode};
use super::SessionName;
use crate::error::{GatewayError, Result};
use crate::pty::{PtyProcess, PtySize, SpawnSpec};

/// A registered session: one PTY process plus the currently attached pump.
struct Session {
    process: PtyProcess,
    /// Active output pump; absent until a client attaches.
    pump: std::sync::Mutex<Option<OutputPump>>,
}

/// Point-in-time view of a session, for status reporting.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub name: SessionName,
    pub pid: Option<u32>,
    pub alive: bool,
    pub size: PtySize,
}

/// Registry of all live sessions.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionName, Arc<Session>>>,
    pump_mode: PumpMode,
}

impl SessionRegistry {
    /// Create an empty registry using event-driven output delivery.
    pub fn new() -> Self {
        Self::with_mode(PumpMode::default())
    }

    /// Create an empty registry with an explicit pump mode.
    pub fn with_mode(pump_mode: PumpMode) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            pump_mode,
        }
    }

    /// Lowest positive integer name not currently registered.
    fn lowest_unused(sessions: &HashMap<SessionName, Arc<Session>>) -> SessionName {
        let mut n = 1u32;
        while sessions.contains_key(&SessionName::from_raw(n)) {
            n += 1;
        }
        SessionName::from_raw(n)
    }

    /// Spawn a new session process and register it under a fresh name.
    ///
    /// The name is the lowest unused positive integer at registration time.
    /// On spawn failure nothing is registered and the error surfaces to the
    /// caller.
    pub fn create_session(&self, spec: SpawnSpec) -> Result<SessionName> {
        let process = PtyProcess::spawn(spec)?;
        let pid = process.pid();

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| GatewayError::LockPoisoned)?;

        let name = Self::lowest_unused(&sessions);
        sessions.insert(
            name,
            Arc::new(Session {
                process,
                pump: std::sync::Mutex::new(None),
            }),
        );

        info!(session = %name, pid, "session created");
        Ok(name)
    }

    /// Attach a delivery sink to a session, starting its output pump.
    ///
    /// A second attach pre-empts the first: the previous pump is stopped
    /// before the new one starts, and the replaced sink receives no further
    /// calls. Fails with [`GatewayError::UnknownSession`] if the name is not
    /// registered.
    pub fn attach(&self, name: SessionName, sink: Arc<dyn OutputSink>) -> Result<()> {
        let session = self.get(name)?;

        // Subscribe before the liveness check so a death between the two is
        // observed either by the check or by the event stream, never missed.
        let events = session.process.subscribe();
        let alive = session.process.is_alive();
        let pump = OutputPump::start(name, events, alive, sink, self.pump_mode);

        let mut slot = session.pump.lock().map_err(|_| GatewayError::LockPoisoned)?;
        if let Some(previous) = slot.take() {
            debug!(session = %name, "replacing attached sink");
            previous.stop();
        }
        *slot = Some(pump);

        Ok(())
    }

    /// Forward input bytes to a session's process.
    pub async fn write(&self, name: SessionName, data: &[u8]) -> Result<()> {
        let session = self.get(name)?;
        session.process.write(data).await
    }

    /// Update a session's terminal window size.
    pub async fn resize(&self, name: SessionName, rows: u16, cols: u16) -> Result<()> {
        let session = self.get(name)?;
        session.process.resize(PtySize::new(rows, cols)).await
    }

    /// Terminate a session: deregister, stop its pump, reap the process.
    ///
    /// The registry entry is removed first, so a second terminate (or any
    /// other operation) on the same name fails with
    /// [`GatewayError::UnknownSession`] rather than silently succeeding.
    /// The wait for process exit runs off the async loop.
    pub async fn terminate(&self, name: SessionName, force: bool) -> Result<()> {
        let session = {
            let mut sessions = self
                .sessions
                .write()
                .map_err(|_| GatewayError::LockPoisoned)?;
            sessions
                .remove(&name)
                .ok_or_else(|| GatewayError::UnknownSession(name.to_string()))?
        };

        if let Ok(mut slot) = session.pump.lock() {
            if let Some(pump) = slot.take() {
                pump.stop();
            }
        }

        session.process.terminate(force).await?;

        info!(session = %name, force, "session terminated");
        Ok(())
    }

    /// Whether a session with this name is registered.
    pub fn contains(&self, name: SessionName) -> bool {
        self.sessions
            .read()
            .map(|s| s.contains_key(&name))
            .unwrap_or(false)
    }

    /// Number of registered sessions.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Names of all registered sessions, ascending.
    pub fn list_names(&self) -> Result<Vec<SessionName>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| GatewayError::LockPoisoned)?;
        let mut names: Vec<SessionName> = sessions.keys().copied().collect();
        names.sort();
        Ok(names)
    }

    /// Status snapshot of one session.
    pub async fn status(&self, name: SessionName) -> Result<SessionStatus> {
        let session = self.get(name)?;
        Ok(SessionStatus {
            name,
            pid: session.process.pid(),
            alive: session.process.is_alive(),
            size: session.process.size().await,
        })
    }

    fn get(&self, name: SessionName) -> Result<Arc<Session>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| GatewayError::LockPoisoned)?;
        sessions
            .get(&name)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownSession(name.to_string()))
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
