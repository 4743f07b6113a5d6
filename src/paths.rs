//! Mapping from source-tree paths to output-tree paths.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// A path was handed to the mapper that does not live under the source root.
///
/// This is a caller bug, not a runtime condition: the watcher only ever
/// reports paths below the root it was registered on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathMapError {
    #[error("{path} is not inside the source root {root}")]
    OutsideSourceRoot { path: PathBuf, root: PathBuf },
}

/// Maps `source_root/a/b.ts` to `output_root/a/b.js`.
#[derive(Debug, Clone)]
pub struct PathMapper {
    source_root: PathBuf,
    output_root: PathBuf,
    source_extensions: Vec<String>,
    target_extension: String,
}

impl PathMapper {
    pub fn new(
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        source_extensions: impl IntoIterator<Item = impl Into<String>>,
        target_extension: impl Into<String>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            source_extensions: source_extensions.into_iter().map(Into::into).collect(),
            target_extension: target_extension.into(),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Whether `path` carries one of the recognized source extensions.
    pub fn is_recognized(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.source_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    /// Path of `source_path` relative to the source root, for display.
    pub fn relative<'a>(&self, source_path: &'a Path) -> &'a Path {
        source_path
            .strip_prefix(&self.source_root)
            .unwrap_or(source_path)
    }

    /// Compute the output path for `source_path`.
    ///
    /// Only a trailing recognized extension is rewritten; other files keep
    /// their name unchanged.
    pub fn map(&self, source_path: &Path) -> Result<PathBuf, PathMapError> {
        let relative = source_path.strip_prefix(&self.source_root).map_err(|_| {
            PathMapError::OutsideSourceRoot {
                path: source_path.to_path_buf(),
                root: self.source_root.clone(),
            }
        })?;

        let mut output = self.output_root.join(relative);
        if self.is_recognized(&output) {
            output.set_extension(&self.target_extension);
        }
        Ok(output)
    }
}
