//! Lifecycle of the single supervised child process.
//!
//! [`ProcessSupervisor`] owns at most one running child at any instant.
//! Stopping is fire-and-forget: SIGTERM is sent and a detached task reaps the
//! child, so the next start is never delayed by a slow shutdown. A child that
//! is still alive after the grace period gets SIGKILL.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};

/// Errors from starting the supervised process.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Entry file {path} doesn't exist")]
    EntryMissing { path: PathBuf },

    #[error("Failed to start {runtime} {entry}: {source}")]
    Spawn {
        runtime: String,
        entry: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Seam between the orchestrator and process management.
pub trait Supervisor: Send {
    /// Start a new process from the entry file.
    fn start(&mut self) -> Result<(), SupervisorError>;

    /// Signal the tracked process to terminate, if any. Never blocks.
    fn stop(&mut self);
}

/// Time a stopped child gets to exit before it is killed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// The tracked child and its pid.
struct SupervisionHandle {
    pid: Option<u32>,
    child: Child,
}

impl SupervisionHandle {
    /// Ask the child to exit. Falls back to a kill where no signal can be sent.
    fn terminate(&mut self) {
        if let Err(e) = send_sigterm(&mut self.child, self.pid) {
            // Fails only when the child already exited
            crate::debug_event!("supervisor", "already exited", "{:?}: {e}", self.pid);
        }
    }

    /// Wait up to `grace` for exit, then kill and reap.
    async fn reap(mut self, grace: Duration) {
        let status = match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(
                    "[supervisor] pid {:?} ignored SIGTERM for {grace:?}, killing",
                    self.pid
                );
                if let Err(e) = self.child.start_kill() {
                    crate::debug_event!("supervisor", "kill failed", "{e}");
                }
                self.child.wait().await
            }
        };
        match status {
            Ok(status) => crate::debug_event!("supervisor", "exited", "{:?} {status}", self.pid),
            Err(e) => tracing::warn!("[supervisor] wait failed: {e}"),
        }
    }
}

#[cfg(unix)]
fn send_sigterm(child: &mut Child, pid: Option<u32>) -> std::io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    // The child is unreaped until `reap`, so its pid cannot be reused yet
    match pid.and_then(|pid| i32::try_from(pid).ok()) {
        Some(pid) => kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(std::io::Error::from),
        None => child.start_kill(),
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child, _pid: Option<u32>) -> std::io::Result<()> {
    child.start_kill()
}

/// Runs `runtime entry` with the terminal's stdio attached.
pub struct ProcessSupervisor {
    runtime: String,
    entry: PathBuf,
    grace_period: Duration,
    current: Option<SupervisionHandle>,
}

impl ProcessSupervisor {
    pub fn new(runtime: impl Into<String>, entry: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
            entry: entry.into(),
            grace_period: DEFAULT_GRACE_PERIOD,
            current: None,
        }
    }

    /// Override how long a stopped child may take to exit.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Pid of the tracked process.
    pub fn pid(&self) -> Option<u32> {
        self.current.as_ref().and_then(|handle| handle.pid)
    }

    /// Stop the tracked process and wait for it to exit.
    ///
    /// Used at shutdown so no orphan outlives the tool.
    pub async fn shutdown(&mut self) {
        if let Some(mut handle) = self.current.take() {
            handle.terminate();
            handle.reap(self.grace_period).await;
        }
    }
}

impl Supervisor for ProcessSupervisor {
    fn start(&mut self) -> Result<(), SupervisorError> {
        // Never track two children at once
        self.stop();

        if !self.entry.is_file() {
            return Err(SupervisorError::EntryMissing {
                path: self.entry.clone(),
            });
        }

        let child = Command::new(&self.runtime)
            .arg(&self.entry)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                runtime: self.runtime.clone(),
                entry: self.entry.clone(),
                source,
            })?;

        let pid = child.id();
        crate::debug_event!("supervisor", "started", "pid {pid:?}");
        self.current = Some(SupervisionHandle { pid, child });
        Ok(())
    }

    fn stop(&mut self) {
        let Some(mut handle) = self.current.take() else {
            return;
        };

        handle.terminate();
        crate::debug_event!("supervisor", "stopping", "pid {:?}", handle.pid);

        tokio::spawn(handle.reap(self.grace_period));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("index.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn is_alive(pid: u32) -> bool {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn wait_until_dead(pid: u32) -> bool {
        for _ in 0..100 {
            if !is_alive(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_missing_entry_is_reported_before_spawn() {
        let dir = TempDir::new().unwrap();
        let mut sup = ProcessSupervisor::new("sh", dir.path().join("missing.sh"));

        let err = sup.start().unwrap_err();

        assert!(matches!(err, SupervisorError::EntryMissing { .. }));
        assert!(!sup.is_running());
    }

    #[tokio::test]
    async fn test_unknown_runtime_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let entry = script(&dir, "exit 0\n");
        let mut sup = ProcessSupervisor::new("hotrun-no-such-runtime", entry);

        let err = sup.start().unwrap_err();

        assert!(matches!(err, SupervisorError::Spawn { .. }));
        assert!(!sup.is_running());
    }

    #[tokio::test]
    async fn test_stop_without_process_is_noop() {
        let mut sup = ProcessSupervisor::new("sh", "/nonexistent/index.sh");
        sup.stop();
        sup.stop();
        assert!(!sup.is_running());
    }

    #[tokio::test]
    async fn test_stop_terminates_without_waiting() {
        let dir = TempDir::new().unwrap();
        let mut sup = ProcessSupervisor::new("sh", script(&dir, "exec sleep 30\n"));

        sup.start().unwrap();
        let pid = sup.pid().unwrap();
        assert!(sup.is_running());

        sup.stop();

        assert!(!sup.is_running());
        assert!(wait_until_dead(pid).await, "process {pid} still alive");
    }

    #[tokio::test]
    async fn test_restart_replaces_previous_process() {
        let dir = TempDir::new().unwrap();
        let mut sup = ProcessSupervisor::new("sh", script(&dir, "exec sleep 30\n"));

        sup.start().unwrap();
        let first = sup.pid().unwrap();
        sup.start().unwrap();
        let second = sup.pid().unwrap();

        assert_ne!(first, second);
        assert!(wait_until_dead(first).await, "old process {first} still alive");
        assert!(is_alive(second));

        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_exit() {
        let dir = TempDir::new().unwrap();
        let mut sup = ProcessSupervisor::new("sh", script(&dir, "exec sleep 30\n"));
        sup.start().unwrap();
        let pid = sup.pid().unwrap();

        sup.shutdown().await;

        assert!(!sup.is_running());
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn test_stop_lets_term_handler_run() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("got_term");
        let body = format!(
            "trap 'echo term > \"{}\"; kill $! 2>/dev/null; exit 0' TERM\nsleep 30 &\nwait\n",
            marker.display()
        );
        let mut sup = ProcessSupervisor::new("sh", script(&dir, &body));

        sup.start().unwrap();
        let pid = sup.pid().unwrap();
        // Let the shell install its trap
        tokio::time::sleep(Duration::from_millis(200)).await;
        sup.stop();

        assert!(wait_until_dead(pid).await, "process {pid} still alive");
        assert!(marker.exists(), "TERM handler did not run");
    }

    #[tokio::test]
    async fn test_child_ignoring_term_is_killed_after_grace_period() {
        let dir = TempDir::new().unwrap();
        let mut sup = ProcessSupervisor::new("sh", script(&dir, "trap '' TERM\nexec sleep 30\n"))
            .with_grace_period(Duration::from_millis(200));

        sup.start().unwrap();
        let pid = sup.pid().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        sup.stop();

        assert!(wait_until_dead(pid).await, "process {pid} still alive");
    }
}
