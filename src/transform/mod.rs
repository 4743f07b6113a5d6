//! Source-to-target code transformation.
//!
//! The compiler itself lives outside this crate. [`Transform`] is the seam:
//! it receives the raw bytes of one source file plus its path (used only for
//! diagnostics and source maps) and returns the compiled bytes or a
//! diagnostic. [`UnitTransformer`] wraps a transform with the file I/O around
//! it.
//!
//! # Implementations
//!
//! - [`CommandTransform`] pipes the file through an external compiler over
//!   stdin/stdout (e.g. `npx babel --filename {file}`)
//! - [`Passthrough`] copies bytes unchanged

mod command;
mod error;
mod unit;

use std::path::Path;

use async_trait::async_trait;

pub use command::{CommandTransform, FILE_PLACEHOLDER};
pub use error::{Diagnostic, TransformError};
pub use unit::{UnitTransform, UnitTransformer};

/// A source-to-target code conversion.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &str;

    /// Compile `source`, the contents of `filename`.
    async fn transform(&self, source: &[u8], filename: &Path) -> Result<Vec<u8>, Diagnostic>;
}

/// Identity transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait]
impl Transform for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn transform(&self, source: &[u8], _filename: &Path) -> Result<Vec<u8>, Diagnostic> {
        Ok(source.to_vec())
    }
}
