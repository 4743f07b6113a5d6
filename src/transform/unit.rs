//! Read, transform and write one source file.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::{Transform, TransformError};
use crate::paths::PathMapper;

/// Seam between the orchestrator and the per-file compile step.
#[async_trait]
pub trait UnitTransform: Send + Sync {
    /// Compile `source_path` into the output tree, returning the written path.
    async fn transform_unit(&self, source_path: &Path) -> Result<PathBuf, TransformError>;
}

/// One compiled file, alive only for the duration of a single write.
struct CompiledUnit {
    source_path: PathBuf,
    output_path: PathBuf,
    bytes: Vec<u8>,
}

/// Compiles source files into the output tree using a [`Transform`].
pub struct UnitTransformer {
    mapper: PathMapper,
    transform: Arc<dyn Transform>,
}

impl UnitTransformer {
    pub fn new(mapper: PathMapper, transform: Arc<dyn Transform>) -> Self {
        Self { mapper, transform }
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    async fn compile(&self, source_path: &Path) -> Result<CompiledUnit, TransformError> {
        let source = tokio::fs::read(source_path)
            .await
            .map_err(|source| TransformError::Read {
                path: source_path.to_path_buf(),
                source,
            })?;

        let bytes = self
            .transform
            .transform(&source, source_path)
            .await
            .map_err(|diagnostic| TransformError::TransformFailed {
                path: source_path.to_path_buf(),
                diagnostic,
            })?;

        let output_path = self.mapper.map(source_path)?;

        Ok(CompiledUnit {
            source_path: source_path.to_path_buf(),
            output_path,
            bytes,
        })
    }
}

#[async_trait]
impl UnitTransform for UnitTransformer {
    async fn transform_unit(&self, source_path: &Path) -> Result<PathBuf, TransformError> {
        let unit = self.compile(source_path).await?;
        crate::debug_event!(
            self.transform.name(),
            "compiled",
            "{} ({} bytes)",
            unit.source_path.display(),
            unit.bytes.len()
        );

        let CompiledUnit {
            output_path, bytes, ..
        } = unit;

        let target = output_path.clone();
        tokio::task::spawn_blocking(move || write_output(&target, &bytes))
            .await
            .map_err(std::io::Error::other)
            .and_then(|written| written)
            .map_err(|source| TransformError::Write {
                path: output_path.clone(),
                source,
            })?;

        Ok(output_path)
    }
}

/// Write `bytes` to `path`, creating the parent directories on the first
/// `NotFound` and retrying exactly once.
fn write_output(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("output path has no parent directory"))?;

    match write_atomic(parent, path, bytes) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            std::fs::create_dir_all(parent)?;
            write_atomic(parent, path, bytes)
        }
        other => other,
    }
}

/// Temp file in the target directory, then rename over the target. Readers
/// see either the old file or the complete new one.
fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
