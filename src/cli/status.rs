//! Status command handler
//!
//! Asks a running server for its status.

use crate::config::Config;
use crate::error::Result;
use crate::server::routes::StatusResponse;
use clap::Args;

/// Status command arguments
#[derive(Args)]
pub struct StatusArgs {
    /// API base URL (defaults to client.server_url)
    #[arg(long)]
    pub server: Option<String>,
}

/// Run the status command
pub async fn run(args: StatusArgs) -> Result<()> {
    let config = Config::load_with_env()?;
    let base = args.server.unwrap_or(config.client.server_url);

    for line in check_server_status(&base).await {
        println!("{}", line);
    }
    Ok(())
}

/// Query `{base}/status` and describe the result
async fn check_server_status(base: &str) -> Vec<String> {
    let url = format!("{}/status", base.trim_end_matches('/'));

    let response = match reqwest::get(&url).await {
        Ok(response) => response,
        Err(_) => return vec![format!("Server: NOT RUNNING at {}", base)],
    };

    if !response.status().is_success() {
        return vec![format!("Server: ERROR (status {})", response.status())];
    }

    let mut lines = vec![format!("Server: RUNNING at {}", base)];
    if let Ok(status) = response.json::<StatusResponse>().await {
        lines.push(format!("  Version:  {}", status.version));
        lines.push(format!("  Uptime:   {}s", status.uptime_secs));
        lines.push(format!("  Geocoder: {}", status.geocoder));
        let channels = if status.channels.is_empty() {
            "(none)".to_string()
        } else {
            status.channels.join(", ")
        };
        lines.push(format!("  Channels: {}", channels));
    }
    lines
}
