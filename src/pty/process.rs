//! Pseudo-terminal process handle.
//!
//! A `PtyProcess` owns exactly one child process and its PTY master. Output
//! is drained by a blocking reader task and broadcast as ordered events;
//! input, resize, and termination go through the handle directly.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize as NativePtySize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, trace};

use super::{default_shell, PtySize};
use crate::error::{GatewayError, Result};

/// Bounded read cap for each pull from the PTY.
const READ_BUFFER_SIZE: usize = 4096;

/// Capacity of the output broadcast channel.
const BROADCAST_CAPACITY: usize = 256;

/// Parameters for spawning a session process.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    /// Command to run. Defaults to the platform shell when `None`.
    pub command: Option<String>,
    /// Initial working directory.
    pub working_dir: Option<String>,
    /// Environment overrides, merged over the inherited process environment.
    pub env: HashMap<String, String>,
    /// Initial terminal size.
    pub size: PtySize,
}

impl Default for SpawnSpec {
    fn default() -> Self {
        Self {
            command: None,
            working_dir: None,
            env: HashMap::new(),
            size: PtySize::default(),
        }
    }
}

/// An event produced by the PTY reader loop.
///
/// `Output` chunks are broadcast in the order they were read; `Exited` is
/// sent exactly once, after the last chunk, when the process is gone.
#[derive(Debug, Clone)]
pub enum PtyEvent {
    /// A chunk of output bytes.
    Output(Vec<u8>),
    /// The child process has ended; no further output will follow.
    Exited,
}

/// Handle to a running PTY process.
///
/// Exclusively owned by its session: the registry writes/resizes/terminates
/// through it, and the session's output pump subscribes to its event stream.
pub struct PtyProcess {
    master: Mutex<Box<dyn MasterPty + Send>>,
    writer: Mutex<Box<dyn Write + Send>>,
    child: Arc<std::sync::Mutex<Box<dyn Child + Send + Sync>>>,
    output_tx: broadcast::Sender<PtyEvent>,
    alive: Arc<AtomicBool>,
    size: RwLock<PtySize>,
    pid: Option<u32>,
}

impl PtyProcess {
    /// Spawn a new process attached to a fresh PTY.
    ///
    /// The child inherits the parent environment with `spec.env` merged on
    /// top. A blocking reader task is started immediately; it performs
    /// bounded reads and broadcasts [`PtyEvent`]s until the process ends.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(spec: SpawnSpec) -> Result<Self> {
        let command = spec.command.unwrap_or_else(default_shell);

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(NativePtySize {
                rows: spec.size.rows,
                cols: spec.size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| GatewayError::Spawn(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&command);
        if let Some(ref dir) = spec.working_dir {
            cmd.cwd(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| GatewayError::Spawn(e.to_string()))?;
        let pid = child.process_id();

        // Only the master side is needed from here on
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| GatewayError::Pty(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| GatewayError::Pty(e.to_string()))?;

        let (output_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let alive = Arc::new(AtomicBool::new(true));

        Self::start_reader(reader, output_tx.clone(), Arc::clone(&alive), pid);

        Ok(Self {
            master: Mutex::new(pair.master),
            writer: Mutex::new(writer),
            child: Arc::new(std::sync::Mutex::new(child)),
            output_tx,
            alive,
            size: RwLock::new(spec.size),
            pid,
        })
    }

    /// Blocking reader loop bridging PTY output into the broadcast channel.
    fn start_reader(
        mut reader: Box<dyn Read + Send>,
        tx: broadcast::Sender<PtyEvent>,
        alive: Arc<AtomicBool>,
        pid: Option<u32>,
    ) {
        tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; READ_BUFFER_SIZE];

            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        debug!(pid, "PTY reader: EOF");
                        break;
                    }
                    Ok(n) => {
                        trace!(pid, bytes = n, "PTY reader: chunk");
                        if tx.send(PtyEvent::Output(buf[..n].to_vec())).is_err() {
                            // No subscribers right now; keep draining so the
                            // child never blocks on a full PTY buffer.
                            trace!(pid, "PTY reader: no receivers");
                        }
                    }
                    Err(e) => {
                        // EIO on Unix means the slave side was closed
                        #[cfg(unix)]
                        if e.raw_os_error() == Some(libc::EIO) {
                            debug!(pid, "PTY reader: PTY closed (EIO)");
                            break;
                        }

                        if e.kind() == std::io::ErrorKind::BrokenPipe {
                            debug!(pid, "PTY reader: broken pipe");
                            break;
                        }

                        error!(pid, error = %e, "PTY reader error");
                        break;
                    }
                }
            }

            alive.store(false, Ordering::SeqCst);
            let _ = tx.send(PtyEvent::Exited);
        });
    }

    /// Process ID of the child, if the platform reports one.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the child process is still running.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Current terminal size.
    pub async fn size(&self) -> PtySize {
        *self.size.read().await
    }

    /// Subscribe to the ordered output event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<PtyEvent> {
        self.output_tx.subscribe()
    }

    /// Write input bytes to the PTY (the process's stdin).
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    /// Resize the PTY window.
    pub async fn resize(&self, size: PtySize) -> Result<()> {
        let master = self.master.lock().await;
        master
            .resize(NativePtySize {
                rows: size.rows,
                cols: size.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| GatewayError::Pty(e.to_string()))?;

        *self.size.write().await = size;
        Ok(())
    }

    /// Terminate the child process and wait for it to be reaped.
    ///
    /// With `force` the child is killed immediately; otherwise it gets one
    /// non-blocking chance to have exited on its own before being killed.
    /// The wait runs on the blocking pool so the async loop keeps serving
    /// other sessions. Post-condition either way: process reaped.
    pub async fn terminate(&self, force: bool) -> Result<()> {
        self.alive.store(false, Ordering::SeqCst);

        let child = Arc::clone(&self.child);
        let pid = self.pid;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut child = child.lock().map_err(|_| GatewayError::LockPoisoned)?;

            // portable-pty exposes a single termination primitive on both
            // platform classes; `force` only skips the exited check.
            let already_exited = !force && matches!(child.try_wait(), Ok(Some(_)));
            if !already_exited {
                // Kill/wait failures mean the process raced us to the exit;
                // the post-condition (reaped) holds either way.
                if let Err(e) = child.kill() {
                    debug!(pid, error = %e, "kill skipped: process already exiting");
                }
                if let Err(e) = child.wait() {
                    debug!(pid, error = %e, "wait skipped: process already reaped");
                }
            }

            debug!(pid, force, "session process reaped");
            Ok(())
        })
        .await
        .map_err(|e| GatewayError::Pty(format!("terminate task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn sh_spec() -> SpawnSpec {
        #[cfg(unix)]
        let command = "/bin/sh".to_string();
        #[cfg(windows)]
        let command = "cmd.exe".to_string();
        SpawnSpec {
            command: Some(command),
            ..Default::default()
        }
    }

    async fn collect_output(
        rx: &mut broadcast::Receiver<PtyEvent>,
        needle: &str,
        budget: Duration,
    ) -> bool {
        let mut collected = Vec::new();
        let deadline = tokio::time::Instant::now() + budget;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match timeout(remaining, rx.recv()).await {
                Ok(Ok(PtyEvent::Output(chunk))) => {
                    collected.extend(chunk);
                    if String::from_utf8_lossy(&collected).contains(needle) {
                        return true;
                    }
                }
                Ok(Ok(PtyEvent::Exited)) => {
                    return String::from_utf8_lossy(&collected).contains(needle);
                }
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                _ => return String::from_utf8_lossy(&collected).contains(needle),
            }
        }
    }

    #[tokio::test]
    async fn test_spawn_default_shell() {
        let process = PtyProcess::spawn(SpawnSpec::default());
        assert!(process.is_ok(), "failed to spawn: {:?}", process.err());

        let process = process.unwrap();
        assert!(process.is_alive());

        let _ = process.terminate(true).await;
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let spec = SpawnSpec {
            command: Some("/nonexistent/binary/hopefully".to_string()),
            ..Default::default()
        };
        // Spawn either fails outright or the reader signals a prompt exit;
        // the spawn error path must map to GatewayError::Spawn.
        if let Err(e) = PtyProcess::spawn(spec) {
            assert!(matches!(e, GatewayError::Spawn(_)));
        }
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_write_and_read_roundtrip() {
        let process = PtyProcess::spawn(sh_spec()).unwrap();
        let mut rx = process.subscribe();

        process.write(b"echo roundtrip_marker\n").await.unwrap();

        let found = collect_output(&mut rx, "roundtrip_marker", Duration::from_secs(5)).await;
        assert!(found, "did not observe echoed output");

        let _ = process.terminate(true).await;
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_output_order_preserved() {
        let process = PtyProcess::spawn(sh_spec()).unwrap();
        let mut rx = process.subscribe();

        process
            .write(b"printf 'one\\ntwo\\nthree\\n'\n")
            .await
            .unwrap();

        let mut collected = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match timeout(remaining, rx.recv()).await {
                Ok(Ok(PtyEvent::Output(chunk))) => {
                    collected.extend(chunk);
                    let text = String::from_utf8_lossy(&collected).to_string();
                    if text.contains("three") {
                        break;
                    }
                }
                _ => break,
            }
        }

        let text = String::from_utf8_lossy(&collected);
        let one = text.find("one").expect("missing 'one'");
        let two = text.rfind("two").expect("missing 'two'");
        let three = text.rfind("three").expect("missing 'three'");
        assert!(one < two && two < three, "output out of order: {text}");

        let _ = process.terminate(true).await;
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_exit_event_on_process_end() {
        let process = PtyProcess::spawn(sh_spec()).unwrap();
        let mut rx = process.subscribe();

        process.write(b"exit\n").await.unwrap();

        let mut saw_exit = false;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match timeout(remaining, rx.recv()).await {
                Ok(Ok(PtyEvent::Exited)) => {
                    saw_exit = true;
                    break;
                }
                Ok(Ok(PtyEvent::Output(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                _ => break,
            }
        }

        assert!(saw_exit, "never observed Exited event");
        assert!(!process.is_alive());
    }

    #[tokio::test]
    async fn test_resize_updates_size() {
        let process = PtyProcess::spawn(SpawnSpec::default()).unwrap();

        assert_eq!(process.size().await, PtySize::new(24, 80));

        process.resize(PtySize::new(40, 120)).await.unwrap();
        assert_eq!(process.size().await, PtySize::new(40, 120));

        let _ = process.terminate(true).await;
    }

    #[tokio::test]
    async fn test_terminate_reaps() {
        let process = PtyProcess::spawn(SpawnSpec::default()).unwrap();
        assert!(process.is_alive());

        process.terminate(true).await.unwrap();
        assert!(!process.is_alive());

        // Terminating an already-reaped process is a no-op at this layer
        process.terminate(true).await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_with_env_override() {
        let mut env = HashMap::new();
        env.insert("GATEWAY_TEST_VAR".to_string(), "inherited".to_string());

        let spec = SpawnSpec {
            env,
            ..Default::default()
        };

        let process = PtyProcess::spawn(spec).unwrap();
        assert!(process.is_alive());

        let _ = process.terminate(true).await;
    }
}
