//! hotrun: watch a source tree, compile each file into an output tree and keep
//! one process running from the compiled entry file.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod paths;
pub mod reporter;
pub mod supervisor;
pub mod transform;
pub mod watcher;

pub use config::{ResolvedConfig, Settings};
pub use orchestrator::{LoopState, Orchestrator, RunExit};
pub use paths::{PathMapError, PathMapper};
pub use reporter::{ConsoleReporter, Reporter};
pub use supervisor::{ProcessSupervisor, Supervisor, SupervisorError};
pub use transform::{Transform, TransformError, UnitTransform, UnitTransformer};
pub use watcher::{SourceWatcher, WatchEvent, WatchEventKind, WatchSignal};
