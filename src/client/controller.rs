//! SOS countdown controller
//!
//! Runs one countdown cycle: a visible, cancellable grace period, then a
//! bounded position fix, then exactly one trigger call. The current
//! [`CountdownState`] is published on a watch channel for the UI.

use crate::client::{Countdown, CountdownState, Locator, TriggerApi};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::sos::{SosAlertRequest, TriggerResponse};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// How a countdown cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SosOutcome {
    /// The server acknowledged the alert
    Sent(TriggerResponse),
    /// Cancelled before dispatch; nothing was sent
    Cancelled,
    /// No position could be obtained; nothing was sent
    LocationUnavailable(String),
    /// The server does not know this driver
    DriverNotFound,
    /// The trigger call failed
    Failed(String),
}

pub struct SosController {
    driver_id: String,
    countdown: Countdown,
    tick: Duration,
    geolocation_timeout: Duration,
    locator: Arc<dyn Locator>,
    api: Arc<dyn TriggerApi>,
    state_tx: watch::Sender<CountdownState>,
}

impl SosController {
    pub fn new(
        driver_id: impl Into<String>,
        config: &ClientConfig,
        locator: Arc<dyn Locator>,
        api: Arc<dyn TriggerApi>,
    ) -> Self {
        let (state_tx, _) = watch::channel(CountdownState::Idle);
        Self {
            driver_id: driver_id.into(),
            countdown: Countdown::new(config.countdown),
            tick: Duration::from_millis(config.tick_ms),
            geolocation_timeout: Duration::from_secs(config.geolocation_timeout_secs),
            locator,
            api,
            state_tx,
        }
    }

    /// Follow state changes
    pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> CountdownState {
        self.countdown.state()
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.countdown.state());
    }

    /// Press SOS and run the cycle to completion
    ///
    /// `cancel` resolving while the countdown is running aborts the cycle
    /// without any network call. Once dispatched, the cycle can no longer be
    /// cancelled. The controller is back in `Idle` when this returns.
    pub async fn run<C>(&mut self, cancel: C) -> SosOutcome
    where
        C: Future<Output = ()>,
    {
        if !self.countdown.press() {
            // A previous run was dropped mid-cycle.
            self.countdown.reset();
            self.countdown.press();
        }
        self.publish();
        let cycle = self.countdown.cycle();

        tokio::pin!(cancel);
        while self.countdown.state() != CountdownState::Counting(0) {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    self.countdown.cancel();
                    self.publish();
                    self.countdown.settle();
                    self.publish();
                    info!(driver = %self.driver_id, "SOS cancelled");
                    return SosOutcome::Cancelled;
                }
                _ = tokio::time::sleep(self.tick) => {
                    self.countdown.tick(cycle);
                    self.publish();
                }
            }
        }

        if !self.countdown.fire(cycle) {
            self.countdown.reset();
            self.publish();
            return SosOutcome::Failed("countdown interrupted".to_string());
        }
        self.publish();

        let outcome = self.dispatch().await;

        self.countdown.settle();
        self.publish();
        outcome
    }

    /// Position fix, then the single trigger call
    async fn dispatch(&self) -> SosOutcome {
        let coords = match tokio::time::timeout(self.geolocation_timeout, self.locator.locate()).await {
            Ok(Ok(coords)) => coords,
            Ok(Err(e)) => {
                warn!(driver = %self.driver_id, error = %e, "Position unavailable, SOS not sent");
                return SosOutcome::LocationUnavailable(e.to_string());
            }
            Err(_) => {
                let e = Error::Timeout("position fix", self.geolocation_timeout.as_secs());
                warn!(driver = %self.driver_id, error = %e, "Position unavailable, SOS not sent");
                return SosOutcome::LocationUnavailable(e.to_string());
            }
        };

        let request = SosAlertRequest::new(self.driver_id.clone(), coords);
        match self.api.trigger(request).await {
            Ok(response) => {
                info!(driver = %self.driver_id, lat = coords.lat, lng = coords.lng, "SOS sent");
                SosOutcome::Sent(response)
            }
            Err(Error::ActorNotFound(_)) => SosOutcome::DriverNotFound,
            Err(e) => {
                warn!(driver = %self.driver_id, error = %e, "SOS trigger failed");
                SosOutcome::Failed(e.to_string())
            }
        }
    }
}
