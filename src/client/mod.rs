//! SOS client side
//!
//! The [`SosController`] drives the cancellable countdown, acquires a
//! position through a [`Locator`] and calls the server through a
//! [`TriggerApi`]. Both seams are traits so the controller can be driven
//! without a network.

pub mod controller;
pub mod countdown;

pub use controller::{SosController, SosOutcome};
pub use countdown::{Countdown, CountdownState};

use crate::error::{Error, Result};
use crate::geo::Coordinates;
use crate::sos::{SosAlertRequest, TriggerResponse};
use futures::future::BoxFuture;
use reqwest::StatusCode;
use tracing::debug;

/// Source of the device position
pub trait Locator: Send + Sync {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates>>;
}

/// A position given up front (e.g. `--lat/--lng`)
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator(pub Coordinates);

impl Locator for FixedLocator {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates>> {
        let coords = self.0;
        Box::pin(async move { Ok(coords) })
    }
}

/// The server's trigger operation
pub trait TriggerApi: Send + Sync {
    fn trigger(&self, request: SosAlertRequest) -> BoxFuture<'_, Result<TriggerResponse>>;
}

/// HTTP client for the trigger endpoint
#[derive(Debug, Clone)]
pub struct SosClient {
    client: reqwest::Client,
    base_url: String,
}

impl SosClient {
    /// `base_url` is the API root, e.g. `http://host:8081/api/v1`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn trigger_url(&self) -> String {
        format!("{}/sos/trigger", self.base_url)
    }

    async fn post_trigger(&self, request: SosAlertRequest) -> Result<TriggerResponse> {
        let url = self.trigger_url();
        debug!(url = %url, driver = %request.driver_id, "Sending SOS trigger");

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::ActorNotFound(request.driver_id));
        }

        let body: TriggerResponse = response
            .json()
            .await
            .map_err(|e| Error::Server(format!("Unexpected trigger response ({}): {}", status, e)))?;

        if status.is_success() && body.is_success() {
            Ok(body)
        } else {
            Err(Error::Server(format!("{} ({})", body.message, status)))
        }
    }
}

impl TriggerApi for SosClient {
    fn trigger(&self, request: SosAlertRequest) -> BoxFuture<'_, Result<TriggerResponse>> {
        Box::pin(self.post_trigger(request))
    }
}
