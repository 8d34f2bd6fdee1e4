//! Server shared state
//!
//! Holds configuration and the SOS pipeline wired to its collaborators.

use crate::config::Config;
use crate::error::Result;
use crate::geo::{get_geocoder, AddressResolver};
use crate::notify::build_notifiers;
use crate::sos::{SosService, SosSettings};
use crate::store::{AlertStore, SqliteStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shared state for the HTTP server
pub struct AppState {
    /// Configuration
    pub config: Config,

    /// Trigger handler
    pub sos: SosService,

    /// Alert history, for the read-only endpoints
    pub alerts: Arc<dyn AlertStore>,

    started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, sos: SosService, alerts: Arc<dyn AlertStore>) -> Self {
        Self {
            config,
            sos,
            alerts,
            started_at: Instant::now(),
        }
    }

    /// Open the database and build every collaborator from configuration
    ///
    /// Fails on an unknown geocoding provider or an unusable database path.
    /// Missing credentials are not an error here.
    pub async fn from_config(config: Config) -> Result<Self> {
        let db_path = config.database_path()?;
        let store = SqliteStore::open(&db_path).await?;
        info!(path = %db_path.display(), "Opened fleet database");

        let backend = get_geocoder(&config.geocoding)?;
        if !config.geocoding.credential().is_configured() && backend.name() == "google" {
            warn!("GOOGLE_MAPS_KEY not set; alerts will carry coordinate locations");
        }
        let resolver = AddressResolver::new(backend, config.geocoding.timeout());

        let store = Arc::new(store);
        let sos = SosService::new(
            store.clone(),
            store.clone(),
            resolver,
            build_notifiers(&config.notify),
            SosSettings::from_config(&config),
        );

        Ok(Self::new(config, sos, store))
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
