//! Error types for fleet-sos

use thiserror::Error;

/// Main error type for fleet-sos operations
#[derive(Error, Debug)]
pub enum Error {
    /// The reporting registration code matched no driver
    #[error("Driver not found: {0}")]
    ActorNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Geolocation error: {0}")]
    Geolocation(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("Stored data error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("{0} timed out after {1}s")]
    Timeout(&'static str, u64),
}

/// Result type alias for fleet-sos operations
pub type Result<T> = std::result::Result<T, Error>;
