use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

mod cli;
mod config;
mod logging;

use cli::Cli;
use cli::commands::Commands;
use cli::simulate::{self, AnimationSpec, RequestSpec};
use config::Config;

async fn run_application(cli: &Cli, config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Simulate {
            animations,
            requests,
            min_timeout,
            default_timeout,
            json,
        } => {
            let config = config.with_overrides(*min_timeout, *default_timeout)?;
            handle_simulate_command(animations, requests, *json, &config).await
        }
        Commands::Config => handle_config_command(&config),
    }
}

async fn handle_simulate_command(animations: &[String], requests: &[String], json: bool, config: &Config) -> Result<()> {
    let animations = animations
        .iter()
        .map(|s| AnimationSpec::parse(s))
        .collect::<Result<Vec<_>>>()?;
    let requests = requests
        .iter()
        .map(|s| RequestSpec::parse(s))
        .collect::<Result<Vec<_>>>()?;
    info!(
        "Simulating {} animations and {} requests",
        animations.len(),
        requests.len()
    );

    let report = simulate::run(config.barrier, &animations, &requests).await?;

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", out);
    } else {
        simulate::print_report(&report);
    }
    Ok(())
}

fn handle_config_command(config: &Config) -> Result<()> {
    let out = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration; it supplies the default log filter
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging
    logging::setup_logging(cli.is_verbose(), config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, config).await.context("Application failed")?;

    Ok(())
}
