//! Alerts command handler
//!
//! Read-only view of recorded SOS alerts.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{AlertStore, SosAlertRecord, SqliteStore};
use clap::{Args, Subcommand};

/// Upper bound when resolving a partial alert ID
const PREFIX_SCAN_LIMIT: usize = 1000;

/// Alerts command arguments
#[derive(Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: Option<AlertsCommand>,

    /// Number of alerts to show (default: 10)
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,
}

/// Alerts subcommands
#[derive(Subcommand)]
pub enum AlertsCommand {
    /// List recent alerts
    List {
        /// Number of alerts to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },
    /// Show a specific alert
    Show {
        /// Alert ID or a prefix of it
        id: String,
    },
}

/// Run the alerts command
pub async fn run(args: AlertsArgs) -> Result<()> {
    let config = Config::load_with_env()?;
    let store = SqliteStore::open(config.database_path()?).await?;
    let command = args.command.unwrap_or(AlertsCommand::List { count: args.count });

    match command {
        AlertsCommand::List { count } => list_alerts(&store, count).await,
        AlertsCommand::Show { id } => show_alert(&store, &id).await,
    }
}

async fn list_alerts(store: &impl AlertStore, count: usize) -> Result<()> {
    let alerts = store.recent_alerts(count).await?;

    if alerts.is_empty() {
        println!("No SOS alerts recorded.");
        return Ok(());
    }

    println!("Recent SOS alerts ({}):\n", alerts.len());
    for alert in &alerts {
        println!("{}\n", summary(alert));
    }
    Ok(())
}

async fn show_alert(store: &impl AlertStore, id: &str) -> Result<()> {
    let alert = find_alert(store, id).await?;

    println!("Alert: {}", alert.alert_id);
    println!("Driver: #{}", alert.driver_id);
    println!("Time: {}", alert.created_at.to_rfc3339());
    println!("Location: {}", alert.location_name);
    println!("Coordinates: {}, {}", alert.latitude, alert.longitude);
    println!(
        "Map: https://maps.google.com/?q={},{}",
        alert.latitude, alert.longitude
    );
    Ok(())
}

/// Resolve a full ID directly, otherwise by unique prefix
async fn find_alert(store: &impl AlertStore, id: &str) -> Result<SosAlertRecord> {
    if let Ok(alert_id) = uuid::Uuid::parse_str(id) {
        return store
            .get_alert(alert_id)
            .await?
            .ok_or_else(|| Error::Config(format!("Alert not found: {}", id)));
    }

    let prefix = id.to_ascii_lowercase();
    let mut matches: Vec<SosAlertRecord> = store
        .recent_alerts(PREFIX_SCAN_LIMIT)
        .await?
        .into_iter()
        .filter(|a| a.alert_id.to_string().starts_with(&prefix))
        .collect();

    match matches.len() {
        0 => Err(Error::Config(format!("Alert not found: {}", id))),
        1 => Ok(matches.remove(0)),
        n => Err(Error::Config(format!("Ambiguous alert ID {} ({} matches)", id, n))),
    }
}

fn summary(alert: &SosAlertRecord) -> String {
    let id = alert.alert_id.to_string();
    format!(
        "  {} - driver #{}\n    ({:.5}, {:.5}) {}\n    {}",
        &id[..8],
        alert.driver_id,
        alert.latitude,
        alert.longitude,
        alert.location_name,
        alert.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}
