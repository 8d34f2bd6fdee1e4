//! IP-based geolocation
//!
//! Coarse position fix from ip-api.com for `fleet-sos sos --here`. Every lookup goes to the network first; the last
//! successful fix is kept on disk and only used if a live lookup fails and
//! the fix is still recent.

use crate::client::Locator;
use crate::constants::api::IP_API_URL;
use crate::constants::cache::{IP_LOCATION_CACHE_FILE, IP_LOCATION_TTL_SECS};
use crate::config::defaults::APP_DIR_NAME;
use crate::error::{Error, Result};
use crate::geo::{Coordinates, GeoLocation};
use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct IpLocator {
    client: reqwest::Client,
    url: String,
    last_fix_path: Option<PathBuf>,
    max_fix_age: Duration,
}

/// ip-api.com response
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    country: Option<String>,
}

impl IpApiResponse {
    fn into_location(self) -> Result<GeoLocation> {
        if self.status != "success" {
            let reason = self.message.unwrap_or_else(|| self.status.clone());
            return Err(Error::Geolocation(format!("IP lookup refused: {}", reason)));
        }
        let (Some(lat), Some(lng)) = (self.lat, self.lon) else {
            return Err(Error::Geolocation("IP lookup returned no position".to_string()));
        };

        let parts: Vec<String> = [self.city, self.region_name, self.country]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();

        Ok(GeoLocation {
            lat,
            lng,
            display_name: parts.join(", "),
        })
    }
}

/// Last good fix as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LastFix {
    location: GeoLocation,
    fixed_at: DateTime<Utc>,
}

impl IpLocator {
    /// Locator keeping its last fix under the user cache directory
    pub fn new() -> Self {
        let path = dirs::cache_dir().map(|p| p.join(APP_DIR_NAME).join(IP_LOCATION_CACHE_FILE));
        Self {
            last_fix_path: path,
            ..Self::without_cache()
        }
    }

    pub fn with_cache_path(path: PathBuf) -> Self {
        Self {
            last_fix_path: Some(path),
            ..Self::without_cache()
        }
    }

    /// Live lookups only
    pub fn without_cache() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: IP_API_URL.to_string(),
            last_fix_path: None,
            max_fix_age: Duration::seconds(IP_LOCATION_TTL_SECS as i64),
        }
    }

    /// Point the locator at a different lookup endpoint
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Current location, falling back to a recent stored fix
    pub async fn current_location(&self) -> Result<GeoLocation> {
        match self.lookup().await {
            Ok(location) => {
                self.remember(&location).await;
                Ok(location)
            }
            Err(e) => match self.recent_fix(Utc::now()).await {
                Some(location) => {
                    warn!(error = %e, "IP lookup failed, using last known position");
                    Ok(location)
                }
                None => Err(e),
            },
        }
    }

    async fn lookup(&self) -> Result<GeoLocation> {
        debug!(url = %self.url, "IP location lookup");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Geolocation(format!("IP lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Geolocation(format!(
                "IP lookup returned status {}",
                response.status()
            )));
        }

        response
            .json::<IpApiResponse>()
            .await
            .map_err(|e| Error::Geolocation(format!("Unreadable IP lookup response: {}", e)))?
            .into_location()
    }

    /// Stored fix if it is younger than the allowed age at `now`
    async fn recent_fix(&self, now: DateTime<Utc>) -> Option<GeoLocation> {
        let path = self.last_fix_path.as_ref()?;
        let content = fs::read_to_string(path).await.ok()?;
        let fix: LastFix = serde_json::from_str(&content).ok()?;

        let age = now.signed_duration_since(fix.fixed_at);
        (age >= Duration::zero() && age < self.max_fix_age).then_some(fix.location)
    }

    /// Store a fix; failures only cost the fallback
    async fn remember(&self, location: &GeoLocation) {
        let Some(path) = &self.last_fix_path else {
            return;
        };
        let fix = LastFix {
            location: location.clone(),
            fixed_at: Utc::now(),
        };

        if let Err(e) = write_fix(path, &fix).await {
            debug!(path = %path.display(), error = %e, "Could not store last IP fix");
        }
    }
}

async fn write_fix(path: &Path, fix: &LastFix) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string(fix).map_err(std::io::Error::other)?;
    fs::write(path, content).await
}

impl Default for IpLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Locator for IpLocator {
    fn locate(&self) -> BoxFuture<'_, Result<Coordinates>> {
        Box::pin(async move {
            let location = self.current_location().await?;
            Ok(Coordinates::new(location.lat, location.lng))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BHUBANESWAR: &str = r#"{"status":"success","lat":20.29,"lon":85.82,"city":"Bhubaneswar","regionName":"Odisha","country":"India"}"#;

    #[tokio::test]
    async fn test_locate_from_api() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/json")
            .with_status(200)
            .with_body(BHUBANESWAR)
            .create_async()
            .await;

        let locator = IpLocator::without_cache().with_url(format!("{}/json", server.url()));
        let location = locator.current_location().await.unwrap();

        assert_eq!(location.display_name, "Bhubaneswar, Odisha, India");
        assert_eq!(locator.locate().await.unwrap(), Coordinates::new(20.29, 85.82));
    }

    #[tokio::test]
    async fn test_refused_lookup() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/json")
            .with_status(200)
            .with_body(r#"{"status":"fail","message":"private range"}"#)
            .create_async()
            .await;

        let locator = IpLocator::without_cache().with_url(format!("{}/json", server.url()));
        let err = locator.current_location().await.unwrap_err();

        assert!(matches!(err, Error::Geolocation(ref msg) if msg.contains("private range")));
    }

    #[tokio::test]
    async fn test_falls_back_to_last_fix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fix").join("last.json");
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/json", server.url());

        let ok = server
            .mock("GET", "/json")
            .with_status(200)
            .with_body(BHUBANESWAR)
            .create_async()
            .await;
        let locator = IpLocator::with_cache_path(path.clone()).with_url(url);
        locator.current_location().await.unwrap();
        ok.remove_async().await;

        server
            .mock("GET", "/json")
            .with_status(503)
            .create_async()
            .await;
        let location = locator.current_location().await.unwrap();

        assert_eq!(location.lat, 20.29);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_stale_fix_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last.json");
        let locator = IpLocator::with_cache_path(path);
        locator
            .remember(&GeoLocation {
                lat: 20.29,
                lng: 85.82,
                display_name: "Bhubaneswar".to_string(),
            })
            .await;

        let now = Utc::now();
        assert!(locator.recent_fix(now).await.is_some());
        assert!(locator.recent_fix(now + Duration::seconds(601)).await.is_none());
        assert!(locator.recent_fix(now - Duration::seconds(60)).await.is_none());
    }

    #[tokio::test]
    async fn test_no_fix_without_cache() {
        let locator = IpLocator::without_cache();
        assert!(locator.recent_fix(Utc::now()).await.is_none());
    }
}
