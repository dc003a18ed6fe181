use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod format;
mod simulate;
mod text_map;
mod util;

use cli::{Cli, Commands};
use commands::{cmd_config, cmd_history, cmd_show, cmd_track};
use config::Config;
use format::FormatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::path);
    let config = match &cli.config {
        Some(path) if path.exists() => Config::load(path)?,
        Some(path) => {
            debug!("No config file at {}, using defaults", path.display());
            Config::default()
        }
        None => Config::load_default()?,
    };

    let window_filter = config.display.window_filter();
    debug!("Displaying times in {}", window_filter.zone());
    let opts = FormatOptions::new(cli.no_color, window_filter.zone());
    let output = cli.output.as_ref();

    match cli.command {
        Commands::Config { action } => cmd_config(action, &config_path, &config),
        Commands::Track(args) => {
            config.validate()?;
            cmd_track(args, &config, &opts, cli.quiet).await
        }
        Commands::History(args) => {
            config.validate()?;
            cmd_history(args, &config, &window_filter, &opts, output).await
        }
        Commands::Show(args) => {
            config.validate()?;
            cmd_show(args, &config, &window_filter, cli.no_color).await
        }
    }
}
