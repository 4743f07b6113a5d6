//! Decides which paths under the source root the loop cares about.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use super::WatchError;

/// Extension and ignore-pattern filter for one source root.
///
/// Ignore patterns use gitignore syntax relative to the root, so
/// `node_modules` excludes every `node_modules` directory at any depth
/// together with everything below it.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    root: PathBuf,
    extensions: Vec<String>,
    ignore: Gitignore,
}

impl SourceFilter {
    pub fn new(
        root: impl Into<PathBuf>,
        extensions: &[String],
        ignore_patterns: &[String],
    ) -> Result<Self, WatchError> {
        let root = root.into();
        let mut builder = GitignoreBuilder::new(&root);
        for pattern in ignore_patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| WatchError::InvalidIgnorePattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
        }
        let ignore = builder.build().map_err(|e| WatchError::InvalidIgnorePattern {
            pattern: ignore_patterns.join(", "),
            reason: e.to_string(),
        })?;

        Ok(Self {
            root,
            extensions: extensions.to_vec(),
            ignore,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path`, or any directory between it and the root, is ignored.
    /// Paths outside the root are always ignored.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if !path.starts_with(&self.root) {
            return true;
        }
        if path == self.root {
            return false;
        }
        self.ignore.matched_path_or_any_parents(path, is_dir).is_ignore()
    }

    pub fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Whether a file at `path` should produce events.
    pub fn accepts(&self, path: &Path) -> bool {
        self.has_extension(path) && !self.is_ignored(path, false)
    }
}
