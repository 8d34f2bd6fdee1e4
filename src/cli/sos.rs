//! SOS command handler
//!
//! Runs the countdown in the terminal. Ctrl-C during the countdown cancels
//! the alert; after dispatch it no longer does.

use crate::client::{CountdownState, FixedLocator, Locator, SosClient, SosController, SosOutcome};
use crate::error::{Error, Result};
use crate::geo::ip_location::IpLocator;
use crate::geo::Coordinates;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// SOS command arguments
#[derive(Args)]
pub struct SosArgs {
    /// Driver registration code (defaults to client.driver_id)
    #[arg(long, short = 'd')]
    pub driver: Option<String>,

    /// Latitude of the current position
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the current position
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Locate by IP address instead of explicit coordinates
    #[arg(long, conflicts_with_all = ["lat", "lng"])]
    pub here: bool,

    /// API base URL (defaults to client.server_url)
    #[arg(long)]
    pub server: Option<String>,
}

/// Run the sos command
pub async fn run(args: SosArgs) -> Result<()> {
    let config = super::load_and_init_logging()?;

    let driver_id = args
        .driver
        .clone()
        .unwrap_or_else(|| config.client.driver_id.clone());
    if driver_id.trim().is_empty() {
        return Err(Error::Config(
            "No driver given; pass --driver or set client.driver_id".to_string(),
        ));
    }

    let locator = choose_locator(&args)?;
    let server = args.server.unwrap_or_else(|| config.client.server_url.clone());
    let api = Arc::new(SosClient::new(server));

    let mut controller = SosController::new(driver_id, &config.client, locator, api);
    let printer = tokio::spawn(print_states(controller.subscribe()));

    println!("SOS armed. Press Ctrl-C to cancel.");
    let outcome = controller.run(cancel_signal()).await;
    drop(controller);
    let _ = printer.await;

    report(outcome)
}

/// Explicit coordinates, or an IP fix when `--here` is given
fn choose_locator(args: &SosArgs) -> Result<Arc<dyn Locator>> {
    match (args.lat, args.lng, args.here) {
        (Some(lat), Some(lng), false) => Ok(Arc::new(FixedLocator(Coordinates::new(lat, lng)))),
        (None, None, true) => Ok(Arc::new(IpLocator::new())),
        _ => Err(Error::Config(
            "Give a position with --lat/--lng, or pass --here to locate by IP".to_string(),
        )),
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn cancel_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        futures::future::pending::<()>().await;
    }
}

async fn print_states(mut rx: watch::Receiver<CountdownState>) {
    while rx.changed().await.is_ok() {
        let state = *rx.borrow_and_update();
        if state != CountdownState::Idle {
            println!("  {}", state);
        }
    }
}

fn report(outcome: SosOutcome) -> Result<()> {
    match outcome {
        SosOutcome::Sent(response) => {
            println!("{}", response.message);
            Ok(())
        }
        SosOutcome::Cancelled => {
            println!("SOS cancelled. Nothing was sent.");
            Ok(())
        }
        SosOutcome::LocationUnavailable(reason) => Err(Error::Geolocation(format!(
            "{}; SOS not sent",
            reason
        ))),
        SosOutcome::DriverNotFound => Err(Error::ActorNotFound(
            "the server does not recognise this driver".to_string(),
        )),
        SosOutcome::Failed(reason) => Err(Error::Server(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sos::TriggerResponse;

    fn args(lat: Option<f64>, lng: Option<f64>, here: bool) -> SosArgs {
        SosArgs {
            driver: Some("DR100".to_string()),
            lat,
            lng,
            here,
            server: None,
        }
    }

    #[tokio::test]
    async fn test_fixed_position_used_as_given() {
        let locator = choose_locator(&args(Some(20.29), Some(85.82), false)).unwrap();
        assert_eq!(locator.locate().await.unwrap(), Coordinates::new(20.29, 85.82));
    }

    #[test]
    fn test_here_selects_ip_lookup() {
        assert!(choose_locator(&args(None, None, true)).is_ok());
    }

    #[test]
    fn test_position_source_required() {
        assert!(matches!(choose_locator(&args(None, None, false)), Err(Error::Config(_))));
    }

    #[test]
    fn test_report_outcomes() {
        assert!(report(SosOutcome::Sent(TriggerResponse::triggered())).is_ok());
        assert!(report(SosOutcome::Cancelled).is_ok());
        assert!(matches!(
            report(SosOutcome::LocationUnavailable("denied".to_string())),
            Err(Error::Geolocation(_))
        ));
        assert!(matches!(report(SosOutcome::DriverNotFound), Err(Error::ActorNotFound(_))));
        assert!(matches!(
            report(SosOutcome::Failed("boom".to_string())),
            Err(Error::Server(_))
        ));
    }
}
