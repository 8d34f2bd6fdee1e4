//! fleet-sos CLI entry point
//!
//! SOS server, terminal client and admin tools

use fleet_sos::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
