//! [`SqliteStore`], the SQLite implementation of the registry and alert store.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use futures::future::BoxFuture;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::schema::SCHEMA;
use crate::store::{AlertStore, Driver, DriverRegistry, NewDriver, NewSosAlert, SosAlertRecord};

/// Fleet store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted and every
/// call runs on its dedicated thread.
#[derive(Clone)]
pub struct SqliteStore {
    conn: tokio_rusqlite::Connection,
}

/// Alert row as stored, before decoding
struct RawAlert {
    alert_id: String,
    driver_id: i64,
    latitude: f64,
    longitude: f64,
    location_name: String,
    created_at: String,
}

impl RawAlert {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            alert_id: row.get(0)?,
            driver_id: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            location_name: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<SosAlertRecord> {
        let alert_id = Uuid::parse_str(&self.alert_id)
            .map_err(|e| Error::Decode(format!("alert id {:?}: {}", self.alert_id, e)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::Decode(format!("created_at {:?}: {}", self.created_at, e)))?;

        Ok(SosAlertRecord {
            alert_id,
            driver_id: self.driver_id,
            latitude: self.latitude,
            longitude: self.longitude,
            location_name: self.location_name,
            created_at,
        })
    }
}

fn driver_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Driver> {
    Ok(Driver {
        driver_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        phone: row.get(3)?,
        reg_no: row.get(4)?,
    })
}

const ALERT_COLUMNS: &str =
    "alert_id, driver_id, latitude, longitude, location_name, created_at";

const DRIVER_COLUMNS: &str = "driver_id, first_name, last_name, phone, reg_no";

impl SqliteStore {
    /// Open (or create) a store at `path` and run schema initialisation.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory store; useful for testing.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // ── Drivers ─────────────────────────────────────────────────────────────

    /// Register a driver; the registration code must be unique.
    pub async fn add_driver(&self, input: NewDriver) -> Result<Driver> {
        let NewDriver {
            first_name,
            last_name,
            phone,
            reg_no,
        } = input;

        let driver = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO drivers (first_name, last_name, phone, reg_no)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![first_name, last_name, phone, reg_no],
                )?;
                Ok(Driver {
                    driver_id: conn.last_insert_rowid(),
                    first_name,
                    last_name,
                    phone,
                    reg_no,
                })
            })
            .await?;

        Ok(driver)
    }

    pub async fn list_drivers(&self) -> Result<Vec<Driver>> {
        let drivers = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DRIVER_COLUMNS} FROM drivers ORDER BY reg_no"
                ))?;
                let rows = stmt
                    .query_map([], driver_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        Ok(drivers)
    }

    /// Remove a driver by registration code. Returns whether one existed.
    ///
    /// Past alerts keep their driver id.
    pub async fn remove_driver(&self, reg_no: &str) -> Result<bool> {
        let reg_no = reg_no.to_string();
        let removed = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM drivers WHERE reg_no = ?1",
                    rusqlite::params![reg_no],
                )?)
            })
            .await?;

        Ok(removed > 0)
    }

    async fn driver_by_reg_no(&self, reg_no: String) -> Result<Option<Driver>> {
        let driver = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE reg_no = ?1"),
                        rusqlite::params![reg_no],
                        driver_from_row,
                    )
                    .optional()?)
            })
            .await?;

        Ok(driver)
    }

    // ── Alerts ──────────────────────────────────────────────────────────────

    async fn append_alert(&self, input: NewSosAlert) -> Result<SosAlertRecord> {
        let record = SosAlertRecord {
            alert_id: Uuid::new_v4(),
            driver_id: input.driver_id,
            latitude: input.latitude,
            longitude: input.longitude,
            location_name: input.location_name,
            created_at: Utc::now().trunc_subsecs(6),
        };

        let id_str = record.alert_id.hyphenated().to_string();
        // Fixed-width UTC timestamps keep lexical order equal to time order.
        let at_str = record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        let (driver_id, latitude, longitude) = (record.driver_id, record.latitude, record.longitude);
        let location_name = record.location_name.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sos_alerts (
                       alert_id, driver_id, latitude, longitude, location_name, created_at
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![id_str, driver_id, latitude, longitude, location_name, at_str],
                )?;
                Ok(())
            })
            .await?;

        Ok(record)
    }

    async fn list_recent_alerts(&self, limit: usize) -> Result<Vec<SosAlertRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let raws: Vec<RawAlert> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ALERT_COLUMNS} FROM sos_alerts
                     ORDER BY created_at DESC, rowid DESC LIMIT ?1"
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![limit], RawAlert::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        raws.into_iter().map(RawAlert::into_record).collect()
    }

    async fn alert_by_id(&self, alert_id: Uuid) -> Result<Option<SosAlertRecord>> {
        let id_str = alert_id.hyphenated().to_string();

        let raw: Option<RawAlert> = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {ALERT_COLUMNS} FROM sos_alerts WHERE alert_id = ?1"),
                        rusqlite::params![id_str],
                        RawAlert::from_row,
                    )
                    .optional()?)
            })
            .await?;

        raw.map(RawAlert::into_record).transpose()
    }
}

impl DriverRegistry for SqliteStore {
    fn find_by_reg_no<'a>(&'a self, reg_no: &'a str) -> BoxFuture<'a, Result<Option<Driver>>> {
        Box::pin(self.driver_by_reg_no(reg_no.to_string()))
    }
}

impl AlertStore for SqliteStore {
    fn insert_alert(&self, alert: NewSosAlert) -> BoxFuture<'_, Result<SosAlertRecord>> {
        Box::pin(self.append_alert(alert))
    }

    fn recent_alerts(&self, limit: usize) -> BoxFuture<'_, Result<Vec<SosAlertRecord>>> {
        Box::pin(self.list_recent_alerts(limit))
    }

    fn get_alert(&self, alert_id: Uuid) -> BoxFuture<'_, Result<Option<SosAlertRecord>>> {
        Box::pin(self.alert_by_id(alert_id))
    }
}
