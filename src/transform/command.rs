//! Transform backed by an external compiler process.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Diagnostic, Transform};

/// Argument token replaced with the source file path.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Runs `program args...` once per file, writing the source to its stdin and
/// reading the compiled output from its stdout.
///
/// A non-zero exit status turns the compiler's stderr into the diagnostic.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    program: String,
    args: Vec<String>,
}

impl CommandTransform {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn expand_args(&self, filename: &Path) -> Vec<String> {
        let file = filename.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(FILE_PLACEHOLDER, &file))
            .collect()
    }
}

#[async_trait]
impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.program
    }

    async fn transform(&self, source: &[u8], filename: &Path) -> Result<Vec<u8>, Diagnostic> {
        let mut child = Command::new(&self.program)
            .args(self.expand_args(filename))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Diagnostic::new(format!("failed to run `{}`: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Diagnostic::new(format!("`{}` has no stdin", self.program)))?;

        // Feed stdin while draining stdout, a large file would otherwise
        // deadlock on a full pipe.
        let feed = async move {
            let result = stdin.write_all(source).await;
            drop(stdin);
            result
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output
            .map_err(|e| Diagnostic::new(format!("`{}` did not finish: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("`{}` exited with {}", self.program, output.status)
            } else {
                stderr.to_string()
            };
            return Err(Diagnostic::new(message));
        }

        // The compiler succeeded, so an early-closed stdin was its choice.
        if let Err(e) = fed {
            tracing::debug!("[transform] stdin closed early by {}: {e}", self.program);
        }

        Ok(output.stdout)
    }
}
