//! Nominatim geocoding backend (OpenStreetMap)
//!
//! Uses the free Nominatim API; no key needed.
//! Rate limit: 1 request per second (enforced by User-Agent requirement)

use crate::constants::api::NOMINATIM_URL;
use crate::error::{Error, Result};
use crate::geo::{GeoBackend, GeoLocation};
use futures::future::BoxFuture;
use serde::Deserialize;

const USER_AGENT: &str = concat!("fleet-sos/", env!("CARGO_PKG_VERSION"));

/// Nominatim geocoding backend
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
}

/// Nominatim reverse response
///
/// Points in open water come back as `{"error": "Unable to geocode"}`.
#[derive(Debug, Deserialize)]
struct NominatimResult {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl NominatimBackend {
    /// Create a new Nominatim backend
    pub fn new() -> Result<Self> {
        Self::with_base_url(NOMINATIM_URL)
    }

    /// Create a backend against a specific Nominatim instance
    ///
    /// Nominatim rejects requests without a User-Agent, so a client that
    /// cannot carry one is an error rather than a silent default.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build Nominatim client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn lookup(&self, lat: f64, lng: f64) -> Result<Option<GeoLocation>> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json",
            self.base_url, lat, lng
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Geocoding(format!("Nominatim request failed: {}", e)))?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            return Err(Error::Geocoding(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let result: NominatimResult = response
            .json()
            .await
            .map_err(|e| Error::Geocoding(format!("Failed to parse Nominatim response: {}", e)))?;

        if result.error.is_some() {
            return Ok(None);
        }

        Ok(result.display_name.map(|display_name| GeoLocation {
            lat,
            lng,
            display_name,
        }))
    }
}

impl GeoBackend for NominatimBackend {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    fn reverse_geocode(&self, lat: f64, lng: f64) -> BoxFuture<'_, Result<Option<GeoLocation>>> {
        Box::pin(self.lookup(lat, lng))
    }
}
