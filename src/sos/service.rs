//! SOS trigger handler
//!
//! [`SosService::trigger`] is the only entry point. It answers as soon as the
//! driver is known and leaves everything else to a detached follow-up task.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::geo::{AddressResolver, Coordinates};
use crate::notify::{Notifier, SosNotice};
use crate::sos::{AckGuard, AckWait, Acknowledgement, SosAlertRequest, TriggerResponse};
use crate::store::{AlertStore, Driver, DriverRegistry, NewSosAlert};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt as _;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Time bounds for the follow-up stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SosSettings {
    pub persist_timeout: Duration,
    /// Applies to each notification channel separately
    pub notify_timeout: Duration,
}

impl SosSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            persist_timeout: Duration::from_secs(config.sos.persist_timeout_secs),
            notify_timeout: config.notify.timeout(),
        }
    }
}

impl Default for SosSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Outcome of one notification channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub channel: &'static str,
    pub delivered: bool,
}

/// What the follow-up managed to do
#[derive(Debug, Clone)]
pub struct FollowUpReport {
    pub location_name: String,
    /// Id of the stored record, if the write succeeded
    pub alert_id: Option<Uuid>,
    pub deliveries: Vec<Delivery>,
}

/// Orchestrates SOS triggers
#[derive(Clone)]
pub struct SosService {
    registry: Arc<dyn DriverRegistry>,
    alerts: Arc<dyn AlertStore>,
    resolver: AddressResolver,
    notifiers: Arc<[Arc<dyn Notifier>]>,
    settings: SosSettings,
}

impl SosService {
    pub fn new(
        registry: Arc<dyn DriverRegistry>,
        alerts: Arc<dyn AlertStore>,
        resolver: AddressResolver,
        notifiers: Vec<Arc<dyn Notifier>>,
        settings: SosSettings,
    ) -> Self {
        Self {
            registry,
            alerts,
            resolver,
            notifiers: notifiers.into(),
            settings,
        }
    }

    /// Name of the geocoding provider in use
    pub fn geocoder(&self) -> &'static str {
        self.resolver.provider()
    }

    /// Names of the notification channels, in dispatch order
    pub fn channels(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    /// Handle one trigger
    ///
    /// Returns [`Error::ActorNotFound`] without side effects when the
    /// registration code is unknown. On success the follow-up has been
    /// scheduled and starts once the returned [`Acknowledgement`] is dropped.
    pub async fn trigger(&self, request: SosAlertRequest) -> Result<Acknowledgement> {
        let coords = request.coordinates();
        if let Err(e) = coords.validate() {
            warn!(driver = %request.driver_id, error = %e, "Accepting out-of-range coordinates");
        }

        let driver = self
            .registry
            .find_by_reg_no(&request.driver_id)
            .await?
            .ok_or_else(|| Error::ActorNotFound(request.driver_id.clone()))?;

        let alerted_at = Utc::now();
        info!(
            driver = %driver.reg_no,
            lat = coords.lat,
            lng = coords.lng,
            "SOS triggered"
        );

        let (guard, wait) = AckGuard::pair();
        self.spawn_followup(wait, driver, coords, alerted_at);

        Ok(Acknowledgement::new(TriggerResponse::triggered(), guard))
    }

    /// Detach the follow-up; it is never joined by the request path
    fn spawn_followup(
        &self,
        wait: AckWait,
        driver: Driver,
        coords: Coordinates,
        alerted_at: DateTime<Utc>,
    ) {
        let service = self.clone();
        tokio::spawn(async move {
            wait.released().await;

            let reg_no = driver.reg_no.clone();
            let job =
                tokio::spawn(async move { service.run_followup(driver, coords, alerted_at).await });

            match job.await {
                Ok(report) => debug!(
                    driver = %reg_no,
                    stored = report.alert_id.is_some(),
                    delivered = report.deliveries.iter().filter(|d| d.delivered).count(),
                    "SOS follow-up finished"
                ),
                Err(e) => error!(driver = %reg_no, stage = "followup", error = %e, "SOS follow-up aborted"),
            }
        });
    }

    /// Geocode, then persist and notify concurrently
    ///
    /// Every stage is attempted once. Persistence and each channel are
    /// guarded separately so no failure, timeout, or panic in one of them
    /// prevents the others.
    pub async fn run_followup(
        &self,
        driver: Driver,
        coords: Coordinates,
        alerted_at: DateTime<Utc>,
    ) -> FollowUpReport {
        let location_name = self.resolver.resolve(coords).await;

        let notice = SosNotice {
            driver,
            coords,
            location_name,
            alerted_at,
        };

        let (alert_id, deliveries) = tokio::join!(self.persist(&notice), self.notify_all(&notice));

        FollowUpReport {
            location_name: notice.location_name,
            alert_id,
            deliveries,
        }
    }

    async fn persist(&self, notice: &SosNotice) -> Option<Uuid> {
        let reg_no = notice.driver.reg_no.as_str();
        let alert = NewSosAlert {
            driver_id: notice.driver.driver_id,
            latitude: notice.coords.lat,
            longitude: notice.coords.lng,
            location_name: notice.location_name.clone(),
        };

        let write = AssertUnwindSafe(self.alerts.insert_alert(alert)).catch_unwind();
        match tokio::time::timeout(self.settings.persist_timeout, write).await {
            Ok(Ok(Ok(record))) => {
                info!(driver = %reg_no, alert_id = %record.alert_id, "SOS alert stored");
                Some(record.alert_id)
            }
            Ok(Ok(Err(e))) => {
                error!(driver = %reg_no, stage = "persist", error = %e, "Failed to store SOS alert");
                None
            }
            Ok(Err(_)) => {
                error!(driver = %reg_no, stage = "persist", "Alert store panicked");
                None
            }
            Err(_) => {
                let e = Error::Timeout("alert write", self.settings.persist_timeout.as_secs());
                error!(driver = %reg_no, stage = "persist", error = %e, "Failed to store SOS alert");
                None
            }
        }
    }

    async fn notify_all(&self, notice: &SosNotice) -> Vec<Delivery> {
        join_all(self.notifiers.iter().map(|notifier| self.notify_one(notifier.as_ref(), notice)))
            .await
    }

    async fn notify_one(&self, notifier: &dyn Notifier, notice: &SosNotice) -> Delivery {
        let channel = notifier.name();
        let reg_no = notice.driver.reg_no.as_str();
        let send = AssertUnwindSafe(notifier.notify(notice)).catch_unwind();

        let delivered = match tokio::time::timeout(self.settings.notify_timeout, send).await {
            Ok(Ok(delivered)) => delivered,
            Ok(Err(_)) => {
                error!(driver = %reg_no, stage = "notify", channel, "Notifier panicked");
                false
            }
            Err(_) => {
                let e = Error::Timeout("notification", self.settings.notify_timeout.as_secs());
                error!(driver = %reg_no, stage = "notify", channel, error = %e, "Notification not sent");
                false
            }
        };

        Delivery { channel, delivered }
    }
}
