use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use hotrun::cli::{Cli, Commands};
use hotrun::config::Settings;
use hotrun::reporter::error_prefix;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", error_prefix());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = load_settings(&cli)?;
    cli.apply(&mut settings);

    hotrun::logging::init_with_config(&settings.logging);

    if let Some(Commands::Config) = cli.command {
        println!("{}", settings.to_toml().context("Failed to render settings")?);
        return Ok(());
    }

    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let config = settings.resolve(&cwd);
    hotrun::debug_event!("main", "resolved", "{config:?}");

    hotrun::app::run(config).await
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    match &cli.config {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("Config file {} doesn't exist!", path.display());
            }
            Settings::load_from(path)
                .with_context(|| format!("Failed to load {}", path.display()))
        }
        None => Settings::load().context("Failed to load hotrun.toml"),
    }
}
