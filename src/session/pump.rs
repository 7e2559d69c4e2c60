//! Output pump: moves bytes from a session's PTY to its delivery sink.
//!
//! A pump is created each time a client attaches and destroyed when the sink
//! detaches or the process dies. It consumes the PTY's ordered event stream
//! and forwards output to the sink with low latency, signalling process
//! death to the sink exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::SessionName;
use crate::pty::PtyEvent;

/// Tick interval for the polling mode.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Destination capability for a session's output.
///
/// Implemented by the protocol handler. The pump only holds a shared
/// reference; it never controls the sink's lifetime.
pub trait OutputSink: Send + Sync + 'static {
    /// Deliver a chunk of output bytes read from the PTY.
    fn receive_output(&self, data: &[u8]);

    /// The session's process has ended; no further output will be delivered.
    fn notify_process_ended(&self);
}

/// Delivery strategy for the pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PumpMode {
    /// Wake on each readiness event from the PTY reader. Preferred.
    #[default]
    Event,
    /// Check for new output on a fixed 10ms interval, one bounded pull per
    /// tick. For transports with no readiness primitive.
    Poll,
}

impl PumpMode {
    /// Parse a mode string as found in config files ("event" / "poll").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "event" => Some(Self::Event),
            "poll" => Some(Self::Poll),
            _ => None,
        }
    }
}

/// A running output pump tied to one session and one sink.
pub struct OutputPump {
    task: JoinHandle<()>,
}

impl OutputPump {
    /// Start pumping `events` into `sink`.
    ///
    /// `process_alive` is the liveness observation taken after subscribing;
    /// a pump started on a dead process signals the death immediately
    /// instead of waiting for an event that may already have passed.
    pub fn start(
        name: SessionName,
        events: broadcast::Receiver<PtyEvent>,
        process_alive: bool,
        sink: Arc<dyn OutputSink>,
        mode: PumpMode,
    ) -> Self {
        let task = tokio::spawn(async move {
            if !process_alive {
                debug!(session = %name, "pump attached to dead process");
                sink.notify_process_ended();
                return;
            }

            match mode {
                PumpMode::Event => run_event(name, events, sink).await,
                PumpMode::Poll => run_poll(name, events, sink).await,
            }
        });

        Self { task }
    }

    /// Stop the pump. No sink calls are made after this returns.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for OutputPump {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Event-driven delivery: suspend until the reader hands over a chunk.
async fn run_event(
    name: SessionName,
    mut events: broadcast::Receiver<PtyEvent>,
    sink: Arc<dyn OutputSink>,
) {
    loop {
        match events.recv().await {
            Ok(PtyEvent::Output(data)) => sink.receive_output(&data),
            Ok(PtyEvent::Exited) | Err(broadcast::error::RecvError::Closed) => {
                debug!(session = %name, "pump: process ended");
                sink.notify_process_ended();
                break;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Transient, not fatal to the pump
                warn!(session = %name, skipped, "pump lagged behind PTY output");
            }
        }
    }
}

/// Polling delivery: one bounded pull per 10ms tick.
async fn run_poll(
    name: SessionName,
    mut events: broadcast::Receiver<PtyEvent>,
    sink: Arc<dyn OutputSink>,
) {
    let mut tick = tokio::time::interval(POLL_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tick.tick().await;

        match events.try_recv() {
            Ok(PtyEvent::Output(data)) => sink.receive_output(&data),
            Ok(PtyEvent::Exited) | Err(broadcast::error::TryRecvError::Closed) => {
                debug!(session = %name, "pump: process ended");
                sink.notify_process_ended();
                break;
            }
            Err(broadcast::error::TryRecvError::Empty) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(session = %name, skipped, "pump lagged behind PTY output");
            }
        }
    }
}
