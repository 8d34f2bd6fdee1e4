//! Centralized constants for the fleet-sos crate
//!
//! This module consolidates constants that are used across multiple modules
//! to avoid duplication and ensure consistency.

/// External API endpoints
pub mod api {
    /// Google reverse geocoding API
    pub const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    /// IP geolocation API (free, no key required)
    pub const IP_API_URL: &str = "http://ip-api.com/json";

    /// Twilio-compatible SMS API
    pub const SMS_API_URL: &str = "https://api.twilio.com/2010-04-01";

    /// Map deep-link prefix; coordinates are appended as `lat,lng`
    pub const MAP_LINK_URL: &str = "https://www.google.com/maps?q=";

    /// Prefix under which every server route is nested
    pub const API_PREFIX: &str = "/api/v1";
}

/// SOS pipeline timing
pub mod sos {
    /// Ticks shown before an SOS is dispatched
    pub const COUNTDOWN_START: u32 = 3;

    /// Length of one countdown tick in milliseconds
    pub const COUNTDOWN_TICK_MS: u64 = 1_000;

    /// Longest wait for a device position fix
    pub const GEOLOCATION_TIMEOUT_SECS: u64 = 10;

    /// Longest wait for the reverse geocoding provider
    pub const GEOCODE_TIMEOUT_SECS: u64 = 5;

    /// Longest wait for the alert record write
    pub const PERSIST_TIMEOUT_SECS: u64 = 5;

    /// Longest wait for a single notification channel
    pub const NOTIFY_TIMEOUT_SECS: u64 = 10;

    /// Acknowledgement body returned to the reporting driver
    pub const TRIGGERED_MESSAGE: &str = "SOS Triggered Successfully";

    /// Body returned when the registration code is unknown
    pub const NOT_FOUND_MESSAGE: &str = "Driver not found";

    /// Body returned when the driver lookup fails unexpectedly
    pub const BUSY_MESSAGE: &str = "Server busy";
}

/// Cache settings
pub mod cache {
    /// IP location cache duration in seconds (10 minutes)
    pub const IP_LOCATION_TTL_SECS: u64 = 600;

    /// IP location cache file name
    pub const IP_LOCATION_CACHE_FILE: &str = "ip_location_cache.json";
}
