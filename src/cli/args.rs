//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::Settings;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch, compile and restart
#[derive(Parser, Debug)]
#[command(
    name = "hotrun",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch a source tree, compile changed files and restart the entry point",
    long_about = "Compiles every source file into the output directory, runs the entry file \
                  and restarts it whenever a source file is created, changed or removed.",
    after_help = "Examples:\n  hotrun\n  hotrun -s app -d build -r server.js\n  hotrun --clean --runtime bun\n  hotrun config",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Source directory to watch
    #[arg(short = 's', long, value_name = "DIR")]
    pub src_dir: Option<PathBuf>,

    /// Output directory for compiled files
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Entry file inside the output directory
    #[arg(short = 'r', long, value_name = "FILE")]
    pub root_file: Option<PathBuf>,

    /// Do not clear the console before each status line
    #[arg(short = 'c', long)]
    pub console_refresh_disabled: bool,

    /// Program used to run the entry file
    #[arg(long, value_name = "PROGRAM")]
    pub runtime: Option<String>,

    /// Delete the output directory before compiling
    #[arg(long)]
    pub clean: bool,

    /// Path to a custom hotrun.toml
    #[arg(long, global = true, value_name = "FILE", env = "HOTRUN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show the effective configuration
    #[command(about = "Display the merged settings as TOML")]
    Config,
}

impl Cli {
    /// Apply explicit flags on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.src_dir {
            settings.src_dir = dir.clone();
        }
        if let Some(dir) = &self.out_dir {
            settings.out_dir = dir.clone();
        }
        if let Some(file) = &self.root_file {
            settings.root_file = file.clone();
        }
        if let Some(runtime) = &self.runtime {
            settings.runtime = runtime.clone();
        }
        if self.console_refresh_disabled {
            settings.watch.clear_screen = false;
        }
        if self.clean {
            settings.clean = true;
        }
    }
}
