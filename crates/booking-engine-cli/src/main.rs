use std::io::Write;

use anyhow::{Context, Result};
use booking_engine::{EngineConfig, RecurrencePattern};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use booking_engine_cli::commands::{self, check, expand, slots, Snapshot};
use booking_engine_cli::{config, Cli, Commands};

/// Load the policy from the config file and environment.
fn load_config(cli: &Cli) -> Result<EngineConfig> {
    if let Some(path) = cli.config.as_deref() {
        anyhow::ensure!(path.exists(), "config file {} does not exist", path.display());
    }
    let config = config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays pure JSON
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let loaded = load_config(&cli)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Commands::Slots {
            date,
            duration,
            now,
            overrides,
            input,
        } => {
            let config = config::apply_overrides(loaded, overrides);
            let snapshot: Snapshot = commands::read_input(input.input.as_deref())?;
            slots::run(&mut out, &config, &snapshot, *date, *duration, *now)?;
        }
        Commands::Check {
            start,
            duration,
            overrides,
            input,
        } => {
            let config = config::apply_overrides(loaded, overrides);
            let snapshot: Snapshot = commands::read_input(input.input.as_deref())?;
            check::run(&mut out, &config, &snapshot, *start, *duration)?;
        }
        Commands::Expand {
            up_to,
            max_iterations,
            input,
        } => {
            let mut config = loaded;
            if let Some(max) = max_iterations {
                config.expansion.max_iterations = *max;
            }
            let pattern: RecurrencePattern = commands::read_input(input.input.as_deref())?;
            expand::run(&mut out, &config, &pattern, *up_to)?;
        }
    }

    out.flush()?;
    Ok(())
}
