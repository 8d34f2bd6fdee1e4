//! Geocoding module
//!
//! Provides reverse geocoding (coordinates to address) for alerts and IP
//! geolocation for the terminal client.

pub mod google;
pub mod ip_location;
pub mod nominatim;
pub mod resolver;

use crate::config::GeocodingConfig;
use crate::constants::api::MAP_LINK_URL;
use crate::error::{Error, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use resolver::AddressResolver;

/// A geographic coordinate (latitude, longitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Create new coordinates
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validate that coordinates are within valid ranges
    ///
    /// Latitude: -90 to 90
    /// Longitude: -180 to 180
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::InvalidCoordinates(format!(
                "Latitude {} is out of range [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(Error::InvalidCoordinates(format!(
                "Longitude {} is out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }

    /// Location name used when no address can be resolved
    pub fn fallback_name(&self) -> String {
        format!("Lat: {}, Lng: {}", self.lat, self.lng)
    }

    /// Map deep-link centred on these coordinates
    pub fn map_link(&self) -> String {
        format!("{}{},{}", MAP_LINK_URL, self.lat, self.lng)
    }
}

/// A geocoded location result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Display name (address or description)
    pub display_name: String,
}

/// Trait for reverse geocoding backends
pub trait GeoBackend: Send + Sync {
    /// Provider name (e.g., "google", "nominatim")
    fn name(&self) -> &'static str;

    /// Reverse geocode coordinates to a location name
    ///
    /// `Ok(None)` means the provider answered but had no address.
    fn reverse_geocode(&self, lat: f64, lng: f64) -> BoxFuture<'_, Result<Option<GeoLocation>>>;
}

/// Build the configured reverse geocoding backend
pub fn get_geocoder(config: &GeocodingConfig) -> Result<Arc<dyn GeoBackend>> {
    match config.provider.to_lowercase().as_str() {
        "google" => Ok(Arc::new(google::GoogleBackend::new(config.credential()))),
        "nominatim" => Ok(Arc::new(nominatim::NominatimBackend::new()?)),
        other => Err(Error::Config(format!("Unknown geocoding provider: {}", other))),
    }
}
