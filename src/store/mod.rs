//! Driver registry and SOS alert persistence
//!
//! The SOS pipeline depends on the [`DriverRegistry`] and [`AlertStore`]
//! traits only; [`SqliteStore`] is the production backend. Alert records are
//! append-only: nothing here updates or deletes one.

mod schema;
mod sqlite;


pub use sqlite::SqliteStore;

use crate::error::Result;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered driver, as read by the SOS pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub driver_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// Registration code; doubles as the public driver identifier
    pub reg_no: String,
}

impl Driver {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Input for registering a driver
#[derive(Debug, Clone)]
pub struct NewDriver {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub reg_no: String,
}

/// Input for recording an alert
#[derive(Debug, Clone)]
pub struct NewSosAlert {
    pub driver_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
}

/// A persisted SOS alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SosAlertRecord {
    pub alert_id: Uuid,
    pub driver_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub created_at: DateTime<Utc>,
}

/// Lookup of drivers by registration code
pub trait DriverRegistry: Send + Sync {
    /// Find the driver holding `reg_no`, if any
    fn find_by_reg_no<'a>(&'a self, reg_no: &'a str) -> BoxFuture<'a, Result<Option<Driver>>>;
}

/// Append-only alert history
pub trait AlertStore: Send + Sync {
    /// Record a new alert
    fn insert_alert(&self, alert: NewSosAlert) -> BoxFuture<'_, Result<SosAlertRecord>>;

    /// Most recent alerts first
    fn recent_alerts(&self, limit: usize) -> BoxFuture<'_, Result<Vec<SosAlertRecord>>>;

    fn get_alert(&self, alert_id: Uuid) -> BoxFuture<'_, Result<Option<SosAlertRecord>>>;
}

#[cfg(test)]
mod driver_tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let driver = Driver {
            driver_id: 1,
            first_name: "Ravi".to_string(),
            last_name: "Kumar".to_string(),
            phone: "+919999999999".to_string(),
            reg_no: "DR100".to_string(),
        };
        assert_eq!(driver.display_name(), "Ravi Kumar");

        let single = Driver {
            last_name: String::new(),
            ..driver
        };
        assert_eq!(single.display_name(), "Ravi");
    }
}
