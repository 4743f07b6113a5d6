//! `tracing` setup for diagnostics.
//!
//! hotrun has two output channels. Status lines and compiler errors belong to
//! the user and go through [`crate::reporter`] on stdout, next to the
//! supervised process. Everything here is for debugging hotrun itself and is
//! written to stderr, silent below `warn` unless asked for:
//!
//! ```toml
//! [logging]
//! default = "info"
//!
//! [logging.modules]
//! "hotrun::watcher" = "debug"
//! ```
//!
//! A set `RUST_LOG` replaces the `[logging]` table entirely.

use std::sync::Once;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Local wall clock, `HH:MM:SS.mmm`.
struct WallClock;

impl FormatTime for WallClock {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// `default,module=level,...` as understood by [`EnvFilter`].
fn filter_directives(config: &LoggingConfig) -> String {
    std::iter::once(config.default.clone())
        .chain(
            config
                .modules
                .iter()
                .map(|(module, level)| format!("{module}={level}")),
        )
        .collect::<Vec<_>>()
        .join(",")
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(filter_directives(config)),
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_timer(WallClock)
            .with_filter(build_filter(config));

        tracing_subscriber::registry().with(layer).init();
    });
}

/// Info-level event tagged with the emitting component.
///
/// ```ignore
/// log_event!("app", "cleaned", "{}", output.display());
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-level counterpart of [`log_event!`].
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}
