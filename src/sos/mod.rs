//! SOS trigger pipeline
//!
//! A trigger runs in two phases. Phase 1 resolves the reporting driver and
//! answers the caller. Phase 2 (geocoding, persistence, notification) runs
//! detached and only starts once the answer has left the handler; its
//! failures are logged and never reach the caller.

pub mod ack;
pub mod service;

pub use ack::{AckGuard, AckWait, Acknowledgement};
pub use service::{Delivery, FollowUpReport, SosService, SosSettings};

use crate::constants::sos::{BUSY_MESSAGE, NOT_FOUND_MESSAGE, TRIGGERED_MESSAGE};
use crate::geo::Coordinates;
use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /sos/trigger`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosAlertRequest {
    /// Registration code of the reporting driver
    #[serde(rename = "driverId", deserialize_with = "reg_no_from_json")]
    pub driver_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SosAlertRequest {
    pub fn new(driver_id: impl Into<String>, coords: Coordinates) -> Self {
        Self {
            driver_id: driver_id.into(),
            latitude: coords.lat,
            longitude: coords.lng,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Registration codes arrive as strings, but some clients send numeric ones
fn reg_no_from_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RegNo {
        Text(String),
        Number(i64),
    }

    Ok(match RegNo::deserialize(deserializer)? {
        RegNo::Text(s) => s,
        RegNo::Number(n) => n.to_string(),
    })
}

/// Synchronous answer to a trigger
///
/// `success` is absent from the not-found body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub message: String,
}

impl TriggerResponse {
    pub fn triggered() -> Self {
        Self {
            success: Some(true),
            message: TRIGGERED_MESSAGE.to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            success: None,
            message: NOT_FOUND_MESSAGE.to_string(),
        }
    }

    pub fn busy() -> Self {
        Self {
            success: Some(false),
            message: BUSY_MESSAGE.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}
