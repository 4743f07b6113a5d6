//! Configuration module for hotrun.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`hotrun.toml` or `--config <FILE>`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the binary)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `HOTRUN_` and use double
//! underscores to separate nested levels:
//! - `HOTRUN_OUT_DIR=build` sets `out_dir`
//! - `HOTRUN_WATCH__CLEAR_SCREEN=false` sets `watch.clear_screen`
//! - `HOTRUN_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hotrun.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "HOTRUN_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Directory holding the authored sources, relative to the working directory
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,

    /// Directory receiving the transformed files
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// File inside `out_dir` executed after each successful compile
    #[serde(default = "default_root_file")]
    pub root_file: PathBuf,

    /// Program used to run the entry file
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Delete the output directory before the first compile
    #[serde(default)]
    pub clean: bool,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub transform: TransformConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Source extensions that are compiled
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Extension given to every compiled file
    #[serde(default = "default_target_extension")]
    pub target_extension: String,

    /// Gitignore-style patterns excluded from watching
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Clear the terminal before each status line
    #[serde(default = "default_true")]
    pub clear_screen: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TransformConfig {
    /// Compiler program; empty copies sources unchanged
    #[serde(default = "default_transform_command")]
    pub command: String,

    /// Compiler arguments, `{file}` is replaced with the source path
    #[serde(default = "default_transform_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `hotrun::watcher = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

// Default value functions
fn default_src_dir() -> PathBuf {
    PathBuf::from("src")
}
fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}
fn default_root_file() -> PathBuf {
    PathBuf::from("index.js")
}
fn default_runtime() -> String {
    "node".to_string()
}
fn default_extensions() -> Vec<String> {
    ["js", "jsx", "ts", "tsx"].map(String::from).to_vec()
}
fn default_target_extension() -> String {
    "js".to_string()
}
fn default_ignore() -> Vec<String> {
    vec!["node_modules".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_transform_command() -> String {
    "npx".to_string()
}
fn default_transform_args() -> Vec<String> {
    ["--no-install", "babel", "--filename", "{file}"]
        .map(String::from)
        .to_vec()
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            out_dir: default_out_dir(),
            root_file: default_root_file(),
            runtime: default_runtime(),
            clean: false,
            watch: WatchConfig::default(),
            transform: TransformConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            target_extension: default_target_extension(),
            ignore: default_ignore(),
            clear_screen: true,
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            command: default_transform_command(),
            args: default_transform_args(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from defaults, `hotrun.toml` and the environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration using a specific TOML file.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscores
            // stay part of the field name
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Resolve relative paths against `cwd` into the absolute paths the
    /// loop works with.
    pub fn resolve(&self, cwd: &Path) -> ResolvedConfig {
        let source_root = normalize(&cwd.join(&self.src_dir));
        let output_root = normalize(&cwd.join(&self.out_dir));
        let entry = normalize(&output_root.join(&self.root_file));

        ResolvedConfig {
            source_root,
            output_root,
            entry,
            runtime: self.runtime.clone(),
            clean: self.clean,
            extensions: self.watch.extensions.clone(),
            target_extension: self.watch.target_extension.clone(),
            ignore: self.watch.ignore.clone(),
            clear_screen: self.watch.clear_screen,
            transform: self.transform.clone(),
        }
    }

    /// Render as TOML, as shown by `hotrun config`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Settings with every path made absolute.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    /// `output_root/root_file`
    pub entry: PathBuf,
    pub runtime: String,
    pub clean: bool,
    pub extensions: Vec<String>,
    pub target_extension: String,
    pub ignore: Vec<String>,
    pub clear_screen: bool,
    pub transform: TransformConfig,
}

/// Lexically remove `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
