//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod alerts;
pub mod config;
pub mod driver;
pub mod serve;
pub mod sos;
pub mod status;

use crate::config::Config;
use crate::error::Result;
use crate::logging;
use clap::{Parser, Subcommand};

/// SOS alerts for fleet drivers
#[derive(Parser)]
#[command(name = "fleet-sos")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the SOS server (foreground)
    Serve(serve::ServeArgs),

    /// Send an SOS after a cancellable countdown
    Sos(sos::SosArgs),

    /// Browse stored SOS alerts
    Alerts(alerts::AlertsArgs),

    /// Manage registered drivers
    Driver(driver::DriverArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Show server status
    Status(status::StatusArgs),
}

/// Load configuration with environment overrides and start logging
pub(crate) fn load_and_init_logging() -> Result<Config> {
    let config = Config::load_with_env()?;
    logging::init(&config.logging, config.notify.utc_offset_minutes)?;
    Ok(config)
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::Sos(args) => sos::run(args).await,
        Commands::Alerts(args) => alerts::run(args).await,
        Commands::Driver(args) => driver::run(args).await,
        Commands::Config(args) => config::run(args),
        Commands::Status(args) => status::run(args).await,
    }
}
