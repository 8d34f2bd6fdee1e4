//! Google Maps reverse geocoding backend
//!
//! Requires an API key. A missing key is reported as a configuration error
//! without touching the network.

use crate::config::Credential;
use crate::constants::api::GOOGLE_GEOCODE_URL;
use crate::error::{Error, Result};
use crate::geo::{GeoBackend, GeoLocation};
use futures::future::BoxFuture;
use serde::Deserialize;

/// Google geocoding backend
#[derive(Debug, Clone)]
pub struct GoogleBackend {
    client: reqwest::Client,
    credential: Credential,
    base_url: String,
}

/// Geocoding API response envelope
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

impl GoogleBackend {
    /// Create a backend against the public Google endpoint
    pub fn new(credential: Credential) -> Self {
        Self::with_base_url(credential, GOOGLE_GEOCODE_URL)
    }

    /// Create a backend against a specific endpoint
    pub fn with_base_url(credential: Credential, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credential,
            base_url: base_url.into(),
        }
    }

    async fn lookup(&self, lat: f64, lng: f64) -> Result<Option<GeoLocation>> {
        let Some(key) = self.credential.as_deref() else {
            return Err(Error::Config("Google Maps API key missing".to_string()));
        };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("latlng", format!("{},{}", lat, lng)), ("key", key.to_string())])
            .send()
            .await
            .map_err(|e| Error::Geocoding(format!("Google request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Geocoding(format!(
                "Google returned status: {}",
                response.status()
            )));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| Error::Geocoding(format!("Failed to parse Google response: {}", e)))?;

        match body.status.as_str() {
            "OK" => Ok(body.results.into_iter().next().map(|r| GeoLocation {
                lat,
                lng,
                display_name: r.formatted_address,
            })),
            "ZERO_RESULTS" => Ok(None),
            status => Err(Error::Geocoding(match body.error_message {
                Some(msg) => format!("Google status {}: {}", status, msg),
                None => format!("Google status {}", status),
            })),
        }
    }
}

impl GeoBackend for GoogleBackend {
    fn name(&self) -> &'static str {
        "google"
    }

    fn reverse_geocode(&self, lat: f64, lng: f64) -> BoxFuture<'_, Result<Option<GeoLocation>>> {
        Box::pin(self.lookup(lat, lng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const PATH: &str = "/maps/api/geocode/json";

    fn backend(server: &mockito::ServerGuard, key: &str) -> GoogleBackend {
        GoogleBackend::with_base_url(
            Credential::from_setting(key),
            format!("{}{}", server.url(), PATH),
        )
    }

    #[tokio::test]
    async fn test_reverse_geocode_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("latlng".into(), "20.29,85.82".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"OK","results":[{"formatted_address":"MG Road, Bhubaneswar"},{"formatted_address":"Odisha"}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let location = backend(&server, "test-key")
            .reverse_geocode(20.29, 85.82)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(location.display_name, "MG Road, Bhubaneswar");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let result = backend(&server, "").reverse_geocode(20.29, 85.82).await;

        assert!(matches!(result, Err(Error::Config(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_ok_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"REQUEST_DENIED","results":[],"error_message":"bad key"}"#)
            .create_async()
            .await;

        let result = backend(&server, "wrong").reverse_geocode(1.0, 2.0).await;

        match result {
            Err(Error::Geocoding(msg)) => assert!(msg.contains("REQUEST_DENIED")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_results_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"ZERO_RESULTS","results":[]}"#)
            .create_async()
            .await;

        let result = backend(&server, "k").reverse_geocode(0.0, 0.0).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let result = backend(&server, "k").reverse_geocode(0.0, 0.0).await;
        assert!(matches!(result, Err(Error::Geocoding(_))));
    }
}
