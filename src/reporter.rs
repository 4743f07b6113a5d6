//! User-facing status lines.
//!
//! Diagnostic logging goes through `tracing` (see [`crate::logging`]); this
//! module is the short, human-oriented status feed of the dev loop:
//!
//! ```text
//! [2026-01-01T12:00:00.000Z]: Successfully compiled 12 files
//! [2026-01-01T12:00:04.120Z]: routes/users.ts changed
//! ```

use std::io::Write;

use console::style;
use is_terminal::IsTerminal;

use crate::watcher::WatchEventKind;

/// Terminal reset sequence, clears the screen and scrollback.
const CLEAR_SCREEN: &str = "\x1Bc";

/// Receives status messages from the orchestrator.
pub trait Reporter: Send + Sync {
    /// A timestamped status line. May clear the display first.
    fn log(&self, message: &str);

    /// Extra output under the last status line, e.g. a compiler error.
    fn detail(&self, message: &str);
}

/// Writes status lines to the terminal.
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    clear_screen: bool,
}

impl ConsoleReporter {
    /// `clear_screen` only takes effect when stdout is a terminal.
    pub fn new(clear_screen: bool) -> Self {
        Self {
            clear_screen: clear_screen && std::io::stdout().is_terminal(),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn log(&self, message: &str) {
        let mut stdout = std::io::stdout().lock();
        if self.clear_screen {
            let _ = write!(stdout, "{CLEAR_SCREEN}");
        }
        let _ = writeln!(stdout, "{}", format_line(&timestamp(), message));
        let _ = stdout.flush();
    }

    fn detail(&self, message: &str) {
        // Same stream as the status line it belongs to
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{message}");
        let _ = stdout.flush();
    }
}

fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn format_line(timestamp: &str, message: &str) -> String {
    format!(
        "{} {}",
        style(format!("[{timestamp}]:")).green(),
        style(message).white()
    )
}

/// Colored label for a change kind, e.g. `created` on a green background.
pub fn change_label(kind: WatchEventKind) -> String {
    let styled = style(kind.label()).black();
    match kind {
        WatchEventKind::Added => styled.on_green(),
        WatchEventKind::Changed => styled.on_yellow(),
        WatchEventKind::Removed => styled.on_red(),
    }
    .to_string()
}

/// `ERROR:` prefix used for fatal startup messages.
pub fn error_prefix() -> String {
    style("ERROR:").red().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_contains_timestamp_and_message() {
        console::set_colors_enabled(false);
        let line = format_line("2026-01-01T00:00:00.000Z", "Successfully compiled 2 files");
        assert_eq!(
            line,
            "[2026-01-01T00:00:00.000Z]: Successfully compiled 2 files"
        );
    }

    #[test]
    fn test_timestamp_is_iso8601_utc() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_change_label_keeps_text() {
        console::set_colors_enabled(false);
        assert_eq!(change_label(WatchEventKind::Removed), "removed");
    }
}
