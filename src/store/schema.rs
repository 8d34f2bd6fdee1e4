//! SQL schema for the fleet-sos SQLite store.
//!
//! Executed once at connection startup.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS drivers (
    driver_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL DEFAULT '',
    phone       TEXT NOT NULL DEFAULT '',
    reg_no      TEXT NOT NULL UNIQUE
);

-- Alerts are append-only.
CREATE TABLE IF NOT EXISTS sos_alerts (
    alert_id      TEXT PRIMARY KEY,
    driver_id     INTEGER NOT NULL,
    latitude      REAL NOT NULL,
    longitude     REAL NOT NULL,
    location_name TEXT NOT NULL CHECK (location_name != ''),
    created_at    TEXT NOT NULL      -- RFC 3339 UTC
);

CREATE INDEX IF NOT EXISTS sos_alerts_created_idx ON sos_alerts(created_at);
CREATE INDEX IF NOT EXISTS sos_alerts_driver_idx  ON sos_alerts(driver_id);

PRAGMA user_version = 1;
";
