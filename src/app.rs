//! Wires the configured components together and runs the dev loop until
//! Ctrl+C.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;

use crate::config::ResolvedConfig;
use crate::orchestrator::{Orchestrator, RunExit};
use crate::paths::PathMapper;
use crate::reporter::ConsoleReporter;
use crate::supervisor::ProcessSupervisor;
use crate::transform::{CommandTransform, Passthrough, Transform, UnitTransformer};
use crate::watcher::{SourceFilter, SourceWatcher};

/// Problems detected before the loop starts.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Directory {path} doesn't exist!")]
    MissingSourceDir { path: PathBuf },

    #[error("Refusing to clean {output}: it contains the source directory {source_root}")]
    UnsafeClean {
        output: PathBuf,
        source_root: PathBuf,
    },

    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run the watch, compile and supervise loop.
pub async fn run(config: ResolvedConfig) -> anyhow::Result<()> {
    if !config.source_root.is_dir() {
        return Err(StartupError::MissingSourceDir {
            path: config.source_root,
        }
        .into());
    }

    // notify reports canonical paths; keep every root in the same form
    let source_root = config
        .source_root
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", config.source_root.display()))?;
    prepare_output_dir(&config.output_root, &source_root, config.clean)?;
    let output_root = config
        .output_root
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", config.output_root.display()))?;
    let entry = match config.entry.strip_prefix(&config.output_root) {
        Ok(relative) => output_root.join(relative),
        Err(_) => config.entry.clone(),
    };

    let mut ignore = config.ignore.clone();
    if let Some(pattern) = output_ignore_pattern(&source_root, &output_root) {
        crate::debug_event!("app", "ignoring output inside source", "{pattern}");
        ignore.push(pattern);
    }
    let filter = SourceFilter::new(&source_root, &config.extensions, &ignore)
        .context("Invalid ignore pattern")?;

    let transform = build_transform(&config);
    crate::log_event!("app", "transform", "{}", transform.name());
    let mapper = PathMapper::new(
        &source_root,
        &output_root,
        config.extensions.iter().cloned(),
        config.target_extension.clone(),
    );
    let transformer = UnitTransformer::new(mapper, transform);
    let supervisor = ProcessSupervisor::new(config.runtime.clone(), entry);
    let reporter = ConsoleReporter::new(config.clear_screen);

    let (watcher, mut signals) =
        SourceWatcher::start(filter).context("Failed to start file watcher")?;

    let mut orchestrator = Orchestrator::new(transformer, supervisor, reporter, &source_root);
    let exit = orchestrator.run(&mut signals, shutdown_signal()).await;

    drop(watcher);
    orchestrator.into_supervisor().shutdown().await;

    match exit {
        RunExit::Shutdown => Ok(()),
        RunExit::WatcherClosed => anyhow::bail!("File watcher stopped unexpectedly"),
    }
}

fn build_transform(config: &ResolvedConfig) -> Arc<dyn Transform> {
    if config.transform.command.trim().is_empty() {
        Arc::new(Passthrough)
    } else {
        Arc::new(CommandTransform::new(
            config.transform.command.clone(),
            config.transform.args.iter().cloned(),
        ))
    }
}

/// Create the output directory, deleting it first when `clean` is set.
pub fn prepare_output_dir(
    output: &Path,
    source_root: &Path,
    clean: bool,
) -> Result<(), StartupError> {
    if clean && output.exists() {
        let canonical = output.canonicalize().map_err(|source| StartupError::OutputDir {
            path: output.to_path_buf(),
            source,
        })?;
        if source_root.starts_with(&canonical) {
            return Err(StartupError::UnsafeClean {
                output: output.to_path_buf(),
                source_root: source_root.to_path_buf(),
            });
        }
        std::fs::remove_dir_all(output).map_err(|source| StartupError::OutputDir {
            path: output.to_path_buf(),
            source,
        })?;
        crate::log_event!("app", "cleaned", "{}", output.display());
    }

    std::fs::create_dir_all(output).map_err(|source| StartupError::OutputDir {
        path: output.to_path_buf(),
        source,
    })
}

/// Anchored ignore pattern for an output directory nested in the source tree.
fn output_ignore_pattern(source_root: &Path, output_root: &Path) -> Option<String> {
    let relative = output_root.strip_prefix(source_root).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(format!("/{}", relative.to_string_lossy().replace('\\', "/")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[app] failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        let src = base.join("src");
        fs::create_dir_all(&src).unwrap();
        (temp, src, base.join("dist"))
    }

    #[test]
    fn test_prepare_creates_missing_output() {
        let (_temp, src, dist) = fixture();
        prepare_output_dir(&dist.join("nested"), &src, false).unwrap();
        assert!(dist.join("nested").is_dir());
    }

    #[test]
    fn test_prepare_keeps_files_without_clean() {
        let (_temp, src, dist) = fixture();
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("stale.js"), "old").unwrap();

        prepare_output_dir(&dist, &src, false).unwrap();
        assert!(dist.join("stale.js").exists());
    }

    #[test]
    fn test_clean_removes_previous_output() {
        let (_temp, src, dist) = fixture();
        fs::create_dir_all(dist.join("lib")).unwrap();
        fs::write(dist.join("lib/stale.js"), "old").unwrap();

        prepare_output_dir(&dist, &src, true).unwrap();
        assert!(dist.is_dir());
        assert_eq!(fs::read_dir(&dist).unwrap().count(), 0);
    }

    #[test]
    fn test_clean_refuses_to_delete_source_root() {
        let (_temp, src, _dist) = fixture();
        fs::write(src.join("index.js"), "keep").unwrap();

        let parent = src.parent().unwrap().to_path_buf();
        for output in [src.clone(), parent] {
            let err = prepare_output_dir(&output, &src, true).unwrap_err();
            assert!(matches!(err, StartupError::UnsafeClean { .. }));
        }
        assert!(src.join("index.js").exists());
    }

    #[test]
    fn test_output_inside_source_is_ignored() {
        let root = Path::new("/work/src");
        assert_eq!(
            output_ignore_pattern(root, Path::new("/work/src/build/out")),
            Some("/build/out".to_string())
        );
        assert_eq!(output_ignore_pattern(root, Path::new("/work/dist")), None);
        assert_eq!(output_ignore_pattern(root, root), None);
    }

    #[test]
    fn test_empty_command_means_passthrough() {
        let mut settings = crate::config::Settings::default();
        settings.transform.command = String::new();
        let config = settings.resolve(Path::new("/work"));
        assert_eq!(build_transform(&config).name(), "passthrough");
    }

    #[tokio::test]
    async fn test_missing_source_dir_is_reported() {
        let temp = TempDir::new().unwrap();
        let settings = crate::config::Settings::default();
        let config = settings.resolve(temp.path());

        let err = run(config).await.unwrap_err();
        let startup = err.downcast_ref::<StartupError>().unwrap();
        assert!(matches!(startup, StartupError::MissingSourceDir { .. }));
        assert!(err.to_string().ends_with("doesn't exist!"));
    }
}
