//! Source-tree watching.
//!
//! Turns `notify` events plus a one-time directory scan into the ordered
//! stream of [`WatchSignal`]s the orchestrator consumes.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher --raw--> forward task --WatchSignal--> Orchestrator
//!                                      |
//!                          initial scan (ignore::WalkBuilder)
//! ```

mod error;
mod event;
mod filter;
mod source;

pub use error::WatchError;
pub use event::{WatchEvent, WatchEventKind, WatchSignal, classify};
pub use filter::SourceFilter;
pub use source::{SourceWatcher, scan};
