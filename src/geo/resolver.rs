//! Infallible address lookup for alerts
//!
//! Wraps a [`GeoBackend`] with a hard time bound and substitutes the
//! coordinate string whenever the provider cannot produce an address.

use crate::geo::{Coordinates, GeoBackend};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Resolves coordinates to a human-readable location name
#[derive(Clone)]
pub struct AddressResolver {
    backend: Arc<dyn GeoBackend>,
    timeout: Duration,
}

impl AddressResolver {
    pub fn new(backend: Arc<dyn GeoBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Name of the underlying provider
    pub fn provider(&self) -> &'static str {
        self.backend.name()
    }

    /// Resolve an address, never failing
    ///
    /// Makes exactly one provider call. The result is never empty, even if
    /// the provider panics.
    pub async fn resolve(&self, coords: Coordinates) -> String {
        let provider = self.backend.name();
        let lookup =
            AssertUnwindSafe(self.backend.reverse_geocode(coords.lat, coords.lng)).catch_unwind();

        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Err(_)) => {
                error!(provider, stage = "geocode", "Geocoding provider panicked");
                coords.fallback_name()
            }
            Ok(Ok(Ok(Some(location)))) if !location.display_name.trim().is_empty() => {
                debug!(provider, address = %location.display_name, "Address resolved");
                location.display_name
            }
            Ok(Ok(Ok(_))) => {
                warn!(provider, lat = coords.lat, lng = coords.lng, "No address for coordinates");
                coords.fallback_name()
            }
            Ok(Ok(Err(e))) => {
                error!(provider, stage = "geocode", error = %e, "Reverse geocoding failed");
                coords.fallback_name()
            }
            Err(_) => {
                error!(
                    provider,
                    stage = "geocode",
                    timeout_secs = self.timeout.as_secs(),
                    "Reverse geocoding timed out"
                );
                coords.fallback_name()
            }
        }
    }
}
