//! Measurement store: the hourly time series the engine reads from.
//!
//! The engine only depends on [`MeasurementStore`]; [`SqliteStore`] is the
//! production implementation. One row per `(city, hour)`, last write wins.

use crate::core::city::City;
use crate::core::db;
use crate::core::error::{AqhiError, Result};
use crate::core::schemas;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Four pollutant concentrations (µg/m³).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Concentrations {
    pub pm25: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
}

impl Concentrations {
    /// Component-wise clamp to `>= 0`.
    pub fn clamped(self) -> Self {
        Concentrations {
            pm25: self.pm25.max(0.0),
            o3: self.o3.max(0.0),
            no2: self.no2.max(0.0),
            so2: self.so2.max(0.0),
        }
    }
}

/// One reading for one city at one truncated hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub city: City,
    /// Epoch seconds at the top of the hour (UTC+8 civil calendar).
    pub hour: i64,
    pub pm25: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
}

impl Measurement {
    pub fn new(city: City, hour: i64, values: Concentrations) -> Self {
        Measurement {
            city,
            hour,
            pm25: values.pm25,
            o3: values.o3,
            no2: values.no2,
            so2: values.so2,
        }
    }

    pub fn concentrations(&self) -> Concentrations {
        Concentrations {
            pm25: self.pm25,
            o3: self.o3,
            no2: self.no2,
            so2: self.so2,
        }
    }
}

/// Time-series contract the engine and scheduler need from storage.
pub trait MeasurementStore: Send + Sync {
    /// Insert or replace the row keyed by `(m.city, m.hour)`.
    fn upsert(&self, m: &Measurement) -> Result<()>;

    /// Concentrations for `city` with `start <= hour <= end`.
    fn query_window(&self, city: City, start: i64, end: i64) -> Result<Vec<Concentrations>>;

    /// Full rows for `city` with `start <= hour <= end`, ordered by hour.
    fn query_series(&self, city: City, start: i64, end: i64) -> Result<Vec<Measurement>>;

    /// Number of rows stored for `hour` across all cities.
    fn count_at_hour(&self, hour: i64) -> Result<u64>;
}

/// SQLite-backed store. Writes are serialized in-process; reads run concurrently.
#[derive(Debug)]
pub struct SqliteStore {
    db_path: PathBuf,
    write_lock: Mutex<()>,
}

impl SqliteStore {
    /// Open (creating if needed) the store at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let store = SqliteStore {
            db_path: db_path.to_path_buf(),
            write_lock: Mutex::new(()),
        };
        store.with_write(|conn| {
            conn.execute(schemas::MEASUREMENTS_DB_SCHEMA, [])?;
            conn.execute(schemas::MEASUREMENTS_DB_SCHEMA_INDEX, [])?;
            Ok(())
        })?;
        tracing::debug!(path = %db_path.display(), "measurement store ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn with_write<F, R>(&self, f: F) -> Result<R>
    where
        F: Fn(&Connection) -> Result<R>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AqhiError::StoreError("store write lock poisoned".to_string()))?;
        db::with_busy_retry(|| {
            let conn = db::db_connect(&self.db_path.to_string_lossy(), db::WRITE_BUSY_TIMEOUT_SECS)?;
            f(&conn)
        })
    }

    fn with_read<F, R>(&self, f: F) -> Result<R>
    where
        F: Fn(&Connection) -> Result<R>,
    {
        db::with_busy_retry(|| {
            let conn = db::db_connect(&self.db_path.to_string_lossy(), db::READ_BUSY_TIMEOUT_SECS)?;
            f(&conn)
        })
    }
}

impl MeasurementStore for SqliteStore {
    fn upsert(&self, m: &Measurement) -> Result<()> {
        self.with_write(|conn| {
            conn.execute(
                schemas::UPSERT_MEASUREMENT,
                params![m.city.name(), m.hour, m.pm25, m.o3, m.no2, m.so2],
            )?;
            Ok(())
        })
    }

    fn query_window(&self, city: City, start: i64, end: i64) -> Result<Vec<Concentrations>> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT pm25, o3, no2, so2 FROM measurements
                 WHERE city = ?1 AND ts_hour BETWEEN ?2 AND ?3",
            )?;
            let rows = stmt.query_map(params![city.name(), start, end], |row| {
                Ok(Concentrations {
                    pm25: row.get(0)?,
                    o3: row.get(1)?,
                    no2: row.get(2)?,
                    so2: row.get(3)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn query_series(&self, city: City, start: i64, end: i64) -> Result<Vec<Measurement>> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ts_hour, pm25, o3, no2, so2 FROM measurements
                 WHERE city = ?1 AND ts_hour BETWEEN ?2 AND ?3
                 ORDER BY ts_hour ASC",
            )?;
            let rows = stmt.query_map(params![city.name(), start, end], |row| {
                Ok(Measurement {
                    city,
                    hour: row.get(0)?,
                    pm25: row.get(1)?,
                    o3: row.get(2)?,
                    no2: row.get(3)?,
                    so2: row.get(4)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn count_at_hour(&self, hour: i64) -> Result<u64> {
        self.with_read(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM measurements WHERE ts_hour = ?1",
                params![hour],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }
}
