//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Default server host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_PORT: u16 = 8081;

/// Default geocoding provider
pub const DEFAULT_GEOCODER: &str = "google";

/// Default local offset for human-readable timestamps (+05:30, IST)
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Default trigger endpoint base used by the terminal client
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8081/api/v1";

/// Default log level when RUST_LOG is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default number of alerts listed
pub const DEFAULT_ALERT_LIMIT: usize = 50;

/// Database file name (inside the XDG data dir)
pub const DATABASE_FILE_NAME: &str = "fleet.db";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "fleet-sos";
