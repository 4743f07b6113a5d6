//! Error types for transforming a single file.

use std::path::PathBuf;

use thiserror::Error;

use crate::paths::PathMapError;

/// Compiler output explaining why a file could not be transformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Diagnostic {
    message: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors from transforming one source file into its output file.
///
/// All variants are recoverable: the loop reports them and waits for the
/// next save.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {diagnostic}")]
    TransformFailed { path: PathBuf, diagnostic: Diagnostic },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Precondition(#[from] PathMapError),
}
