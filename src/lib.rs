//! fleet-sos: emergency alerts for fleet drivers
//!
//! A driver presses SOS, gets a short cancellable countdown, and the client
//! sends their position to the server. The server acknowledges as soon as
//! the driver is identified; reverse geocoding, the alert record and the
//! administrator notifications happen afterwards and never hold up the
//! acknowledgement.
//!
//! ## Parts
//!
//! - [`sos`]: trigger handling and the background follow-up
//! - [`client`]: the countdown controller and HTTP trigger client
//! - [`store`]: driver registry and append-only alert history (SQLite)
//! - [`geo`]: reverse geocoding providers
//! - [`notify`]: email and SMS channels
//! - [`server`]: HTTP API
//!
//! ## Quick Start
//!
//! ```rust
//! use fleet_sos::client::{Countdown, CountdownState};
//!
//! let mut countdown = Countdown::new(3);
//! assert!(countdown.press());
//! assert_eq!(countdown.state(), CountdownState::Counting(3));
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod geo;
pub mod logging;
pub mod notify;
pub mod server;
pub mod sos;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use geo::Coordinates;
pub use sos::{SosAlertRequest, SosService, TriggerResponse};
