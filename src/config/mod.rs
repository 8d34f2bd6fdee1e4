//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/fleet-sos/config.toml
//!
//! Secrets and deployment-specific values can also come from the process
//! environment (or a `.env` file); those override whatever the file holds.

pub mod defaults;

use crate::constants::{api, sos};
use crate::error::{Error, Result};
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variables and the config keys they override
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("DATABASE_PATH", "database.path"),
    ("GOOGLE_MAPS_KEY", "geocoding.api_key"),
    ("ADMIN_EMAIL", "notify.admin_email"),
    ("MAIL_API_URL", "notify.mail_api_url"),
    ("MAIL_API_KEY", "notify.mail_api_key"),
    ("MAIL_FROM", "notify.mail_from"),
    ("ADMIN_PHONE", "notify.admin_phone"),
    ("SMS_ACCOUNT_SID", "notify.sms_account_sid"),
    ("SMS_AUTH_TOKEN", "notify.sms_auth_token"),
    ("SMS_SENDER_NUMBER", "notify.sms_sender"),
    ("SOS_DRIVER_ID", "client.driver_id"),
    ("SOS_SERVER_URL", "client.server_url"),
    ("LOG_LEVEL", "logging.level"),
];

/// A secret that may or may not have been supplied
///
/// Adapters check for `Missing` before making any external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Configured(String),
    Missing,
}

impl Credential {
    /// Interpret a raw setting; blank means missing
    pub fn from_setting(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            Self::Missing
        } else {
            Self::Configured(value.to_string())
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Configured(value) => Some(value),
            Self::Missing => None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Alert and driver database
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Reverse geocoding provider
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Administrative notification channels
    #[serde(default)]
    pub notify: NotifyConfig,

    /// SOS pipeline bounds
    #[serde(default)]
    pub sos: SosConfig,

    /// Terminal client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Database settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path; empty uses the XDG data directory
    #[serde(default)]
    pub path: String,
}

/// Reverse geocoding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Provider name: "google" or "nominatim"
    #[serde(default = "default_geocoder")]
    pub provider: String,

    /// Google Maps API key
    #[serde(default)]
    pub api_key: String,

    /// Provider call bound in seconds
    #[serde(default = "default_geocode_timeout")]
    pub timeout_secs: u64,
}

/// Notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Fixed administrative email recipient
    #[serde(default)]
    pub admin_email: String,

    /// HTTP mail relay endpoint
    #[serde(default)]
    pub mail_api_url: String,

    /// Bearer token for the mail relay
    #[serde(default)]
    pub mail_api_key: String,

    /// Sender address for alert emails
    #[serde(default)]
    pub mail_from: String,

    /// Administrative phone number for SMS alerts
    #[serde(default)]
    pub admin_phone: String,

    #[serde(default)]
    pub sms_account_sid: String,

    #[serde(default)]
    pub sms_auth_token: String,

    /// Sending phone number
    #[serde(default)]
    pub sms_sender: String,

    /// SMS API base URL
    #[serde(default = "default_sms_api_url")]
    pub sms_api_url: String,

    /// Per-channel send bound in seconds
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,

    /// Offset applied to alert timestamps shown to humans
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

/// SOS pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SosConfig {
    /// Alert record write bound in seconds
    #[serde(default = "default_persist_timeout")]
    pub persist_timeout_secs: u64,
}

/// Terminal client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base the trigger endpoint lives under
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Registration code of the driver using this client
    #[serde(default)]
    pub driver_id: String,

    /// Countdown ticks before dispatch
    #[serde(default = "default_countdown")]
    pub countdown: u32,

    /// Length of one tick in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Position fix bound in seconds
    #[serde(default = "default_geolocation_timeout")]
    pub geolocation_timeout_secs: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// File receiving ERROR events; empty disables it
    #[serde(default)]
    pub error_log: String,
}

// Default value functions for serde
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_geocoder() -> String {
    DEFAULT_GEOCODER.to_string()
}
fn default_geocode_timeout() -> u64 {
    sos::GEOCODE_TIMEOUT_SECS
}
fn default_sms_api_url() -> String {
    api::SMS_API_URL.to_string()
}
fn default_notify_timeout() -> u64 {
    sos::NOTIFY_TIMEOUT_SECS
}
fn default_utc_offset() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}
fn default_persist_timeout() -> u64 {
    sos::PERSIST_TIMEOUT_SECS
}
fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}
fn default_countdown() -> u32 {
    sos::COUNTDOWN_START
}
fn default_tick_ms() -> u64 {
    sos::COUNTDOWN_TICK_MS
}
fn default_geolocation_timeout() -> u64 {
    sos::GEOLOCATION_TIMEOUT_SECS
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            provider: default_geocoder(),
            api_key: String::new(),
            timeout_secs: default_geocode_timeout(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            admin_email: String::new(),
            mail_api_url: String::new(),
            mail_api_key: String::new(),
            mail_from: String::new(),
            admin_phone: String::new(),
            sms_account_sid: String::new(),
            sms_auth_token: String::new(),
            sms_sender: String::new(),
            sms_api_url: default_sms_api_url(),
            timeout_secs: default_notify_timeout(),
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

impl Default for SosConfig {
    fn default() -> Self {
        Self {
            persist_timeout_secs: default_persist_timeout(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            driver_id: String::new(),
            countdown: default_countdown(),
            tick_ms: default_tick_ms(),
            geolocation_timeout_secs: default_geolocation_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            error_log: String::new(),
        }
    }
}

impl GeocodingConfig {
    pub fn credential(&self) -> Credential {
        Credential::from_setting(&self.api_key)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl NotifyConfig {
    pub fn mail_credential(&self) -> Credential {
        Credential::from_setting(&self.mail_api_key)
    }

    pub fn sms_credential(&self) -> Credential {
        Credential::from_setting(&self.sms_auth_token)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration and apply `.env` / environment overrides
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        dotenvy::dotenv().ok();
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    ///
    /// Blank values are ignored so an empty variable never wipes a setting.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                self.set(key, &value)?;
            }
        }
        Ok(())
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Resolve the SQLite database path
    pub fn database_path(&self) -> Result<PathBuf> {
        if !self.database.path.trim().is_empty() {
            return Ok(PathBuf::from(&self.database.path));
        }
        dirs::data_dir()
            .map(|p| p.join(APP_DIR_NAME).join(DATABASE_FILE_NAME))
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),
            ["server", "cors_origins"] => Some(self.server.cors_origins.join(",")),

            ["database", "path"] => Some(self.database.path.clone()),

            ["geocoding", "provider"] => Some(self.geocoding.provider.clone()),
            ["geocoding", "api_key"] => Some(self.geocoding.api_key.clone()),
            ["geocoding", "timeout_secs"] => Some(self.geocoding.timeout_secs.to_string()),

            ["notify", "admin_email"] => Some(self.notify.admin_email.clone()),
            ["notify", "mail_api_url"] => Some(self.notify.mail_api_url.clone()),
            ["notify", "mail_api_key"] => Some(self.notify.mail_api_key.clone()),
            ["notify", "mail_from"] => Some(self.notify.mail_from.clone()),
            ["notify", "admin_phone"] => Some(self.notify.admin_phone.clone()),
            ["notify", "sms_account_sid"] => Some(self.notify.sms_account_sid.clone()),
            ["notify", "sms_auth_token"] => Some(self.notify.sms_auth_token.clone()),
            ["notify", "sms_sender"] => Some(self.notify.sms_sender.clone()),
            ["notify", "sms_api_url"] => Some(self.notify.sms_api_url.clone()),
            ["notify", "timeout_secs"] => Some(self.notify.timeout_secs.to_string()),
            ["notify", "utc_offset_minutes"] => Some(self.notify.utc_offset_minutes.to_string()),

            ["sos", "persist_timeout_secs"] => Some(self.sos.persist_timeout_secs.to_string()),

            ["client", "server_url"] => Some(self.client.server_url.clone()),
            ["client", "driver_id"] => Some(self.client.driver_id.clone()),
            ["client", "countdown"] => Some(self.client.countdown.to_string()),
            ["client", "tick_ms"] => Some(self.client.tick_ms.to_string()),
            ["client", "geolocation_timeout_secs"] => {
                Some(self.client.geolocation_timeout_secs.to_string())
            }

            ["logging", "level"] => Some(self.logging.level.clone()),
            ["logging", "error_log"] => Some(self.logging.error_log.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => self.server.port = parse_value(key, value)?,
            ["server", "cors_origins"] => {
                self.server.cors_origins = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }

            ["database", "path"] => self.database.path = value.to_string(),

            ["geocoding", "provider"] => self.geocoding.provider = value.to_string(),
            ["geocoding", "api_key"] => self.geocoding.api_key = value.to_string(),
            ["geocoding", "timeout_secs"] => self.geocoding.timeout_secs = parse_value(key, value)?,

            ["notify", "admin_email"] => self.notify.admin_email = value.to_string(),
            ["notify", "mail_api_url"] => self.notify.mail_api_url = value.to_string(),
            ["notify", "mail_api_key"] => self.notify.mail_api_key = value.to_string(),
            ["notify", "mail_from"] => self.notify.mail_from = value.to_string(),
            ["notify", "admin_phone"] => self.notify.admin_phone = value.to_string(),
            ["notify", "sms_account_sid"] => self.notify.sms_account_sid = value.to_string(),
            ["notify", "sms_auth_token"] => self.notify.sms_auth_token = value.to_string(),
            ["notify", "sms_sender"] => self.notify.sms_sender = value.to_string(),
            ["notify", "sms_api_url"] => self.notify.sms_api_url = value.to_string(),
            ["notify", "timeout_secs"] => self.notify.timeout_secs = parse_value(key, value)?,
            ["notify", "utc_offset_minutes"] => {
                self.notify.utc_offset_minutes = parse_value(key, value)?
            }

            ["sos", "persist_timeout_secs"] => {
                self.sos.persist_timeout_secs = parse_value(key, value)?
            }

            ["client", "server_url"] => self.client.server_url = value.to_string(),
            ["client", "driver_id"] => self.client.driver_id = value.to_string(),
            ["client", "countdown"] => self.client.countdown = parse_value(key, value)?,
            ["client", "tick_ms"] => self.client.tick_ms = parse_value(key, value)?,
            ["client", "geolocation_timeout_secs"] => {
                self.client.geolocation_timeout_secs = parse_value(key, value)?
            }

            ["logging", "level"] => self.logging.level = value.to_string(),
            ["logging", "error_log"] => self.logging.error_log = value.to_string(),

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "server.host",
            "server.port",
            "server.cors_origins",
            "database.path",
            "geocoding.provider",
            "geocoding.api_key",
            "geocoding.timeout_secs",
            "notify.admin_email",
            "notify.mail_api_url",
            "notify.mail_api_key",
            "notify.mail_from",
            "notify.admin_phone",
            "notify.sms_account_sid",
            "notify.sms_auth_token",
            "notify.sms_sender",
            "notify.sms_api_url",
            "notify.timeout_secs",
            "notify.utc_offset_minutes",
            "sos.persist_timeout_secs",
            "client.server_url",
            "client.driver_id",
            "client.countdown",
            "client.tick_ms",
            "client.geolocation_timeout_secs",
            "logging.level",
            "logging.error_log",
        ]
    }

    /// Whether a key holds a secret that should be masked on display
    pub fn is_secret(key: &str) -> bool {
        matches!(
            key,
            "geocoding.api_key" | "notify.mail_api_key" | "notify.sms_auth_token"
        )
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}
