//! Administrative notification channels
//!
//! Each channel turns an [`SosNotice`] into a [`NotificationEnvelope`] and
//! makes a single delivery attempt. Channels report success as a `bool` and
//! log their own failures; they never return an error to the SOS pipeline.

pub mod email;
pub mod sms;
pub mod template;

use crate::config::NotifyConfig;
use crate::geo::Coordinates;
use crate::store::Driver;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::sync::Arc;

pub use email::EmailNotifier;
pub use sms::SmsNotifier;

/// Everything an administrator is told about one alert
#[derive(Debug, Clone)]
pub struct SosNotice {
    pub driver: Driver,
    pub coords: Coordinates,
    /// Resolved address, or the coordinate fallback
    pub location_name: String,
    pub alerted_at: DateTime<Utc>,
}

/// A composed message, built fresh per alert and dropped after the attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEnvelope {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// A delivery channel to the administrative recipient
pub trait Notifier: Send + Sync {
    /// Channel name used in logs and the status endpoint
    fn name(&self) -> &'static str;

    /// Compose and send the notice. Returns whether delivery was accepted.
    fn notify<'a>(&'a self, notice: &'a SosNotice) -> BoxFuture<'a, bool>;
}

/// Build every configured channel
///
/// Channels are built even when their credentials are missing; they skip
/// delivery with a warning at send time so the status endpoint can still
/// list them.
pub fn build_notifiers(config: &NotifyConfig) -> Vec<Arc<dyn Notifier>> {
    vec![
        Arc::new(EmailNotifier::from_config(config)),
        Arc::new(SmsNotifier::from_config(config)),
    ]
}
