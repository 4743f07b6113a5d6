//! The watch → transform → supervise state machine.
//!
//! While the watcher's initial scan is running every `Added` file is compiled
//! as part of one batch and no process is started. The scan-complete signal
//! ends the batch: if every file compiled, the supervised process starts once.
//! After that, each change stops the process, recompiles the file and starts
//! the process again.
//!
//! Signals are handled single-flight: one signal, restart included, is fully
//! processed before the next is taken from the queue, so a stop can never
//! race an in-flight start.
//!
//! | State        | Signal               | Action                                  |
//! |--------------|----------------------|-----------------------------------------|
//! | Initializing | Added                | count, compile, remember failure        |
//! | Initializing | Changed              | compile, remember failure               |
//! | Initializing | Removed              | ignored                                 |
//! | Initializing | InitialScanComplete  | start if no failure; become Ready       |
//! | Ready        | Added/Changed/Removed| stop, compile, start on success         |

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::reporter::{Reporter, change_label};
use crate::supervisor::Supervisor;
use crate::transform::{TransformError, UnitTransform};
use crate::watcher::{WatchEvent, WatchEventKind, WatchSignal};

/// Phase of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// The watcher is still reporting pre-existing files.
    Initializing,
    /// The initial scan finished; every event restarts the process.
    Ready,
}

/// Why [`Orchestrator::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Shutdown,
    WatcherClosed,
}

pub struct Orchestrator<U, S, R> {
    transformer: U,
    supervisor: S,
    reporter: R,
    source_root: PathBuf,
    state: LoopState,
    compiled_count: usize,
    had_error: bool,
}

impl<U, S, R> Orchestrator<U, S, R>
where
    U: UnitTransform,
    S: Supervisor,
    R: Reporter,
{
    pub fn new(transformer: U, supervisor: S, reporter: R, source_root: impl Into<PathBuf>) -> Self {
        Self {
            transformer,
            supervisor,
            reporter,
            source_root: source_root.into(),
            state: LoopState::Initializing,
            compiled_count: 0,
            had_error: false,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn compiled_count(&self) -> usize {
        self.compiled_count
    }

    pub fn supervisor(&self) -> &S {
        &self.supervisor
    }

    /// Consume the orchestrator, handing back the supervisor for shutdown.
    pub fn into_supervisor(self) -> S {
        self.supervisor
    }

    /// Process signals until `shutdown` resolves or the watcher goes away.
    pub async fn run<F>(&mut self, signals: &mut mpsc::Receiver<WatchSignal>, shutdown: F) -> RunExit
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    crate::log_event!("orchestrator", "shutdown requested");
                    return RunExit::Shutdown;
                }

                signal = signals.recv() => match signal {
                    Some(signal) => self.handle(signal).await,
                    None => {
                        tracing::warn!("[orchestrator] watcher stopped delivering events");
                        return RunExit::WatcherClosed;
                    }
                },
            }
        }
    }

    /// Apply one signal to the state machine.
    pub async fn handle(&mut self, signal: WatchSignal) {
        match (self.state, signal) {
            (LoopState::Initializing, WatchSignal::Event(event)) => {
                self.compile_initial(event).await;
            }
            (LoopState::Initializing, WatchSignal::InitialScanComplete) => {
                self.finish_initial_scan();
            }
            (LoopState::Ready, WatchSignal::Event(event)) => {
                self.restart(event).await;
            }
            (LoopState::Ready, WatchSignal::InitialScanComplete) => {
                tracing::warn!("[orchestrator] duplicate scan-complete signal ignored");
            }
        }
    }

    /// `SourceWatcher` holds live events back until the scan is complete, so
    /// only `Added` arrives here from it. Other signal sources may interleave.
    async fn compile_initial(&mut self, event: WatchEvent) {
        match event.kind {
            WatchEventKind::Added => self.compiled_count += 1,
            // Recompiled, but the scan already counted it
            WatchEventKind::Changed => {}
            WatchEventKind::Removed => {
                crate::debug_event!(
                    "orchestrator",
                    "removed during scan",
                    "{}",
                    event.path.display()
                );
                return;
            }
        }

        if let Err(e) = self.transformer.transform_unit(&event.path).await {
            self.had_error = true;
            self.reporter.log("Initial compilation failed");
            self.report_error(&e);
        }
    }

    fn finish_initial_scan(&mut self) {
        self.state = LoopState::Ready;

        if self.had_error {
            self.had_error = false;
            crate::debug_event!("orchestrator", "initial batch had errors, not starting");
            return;
        }

        self.reporter
            .log(&format!("Successfully compiled {} files", self.compiled_count));
        self.start_process();
    }

    async fn restart(&mut self, event: WatchEvent) {
        self.reporter.log(&format!(
            "{} {}",
            self.display_path(&event.path).display(),
            change_label(event.kind)
        ));

        self.supervisor.stop();

        match self.transformer.transform_unit(&event.path).await {
            Ok(output) => {
                crate::debug_event!("orchestrator", "wrote", "{}", output.display());
                self.start_process();
            }
            Err(e) => self.report_error(&e),
        }
    }

    fn start_process(&mut self) {
        if let Err(e) = self.supervisor.start() {
            tracing::debug!("[orchestrator] start failed: {e:?}");
            self.reporter.detail(&e.to_string());
        }
    }

    fn report_error(&self, error: &TransformError) {
        if let TransformError::Precondition(inner) = error {
            tracing::error!("[orchestrator] {inner}");
        }
        self.reporter.detail(&error.to_string());
    }

    fn display_path<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.source_root).unwrap_or(path)
    }
}
