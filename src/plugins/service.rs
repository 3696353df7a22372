//! Query surface shared by the CLI and the RPC interface.
//!
//! Mirrors the HTTP routes of the public API (`/api/cities`, `/api/aqhi`,
//! `/api/aqhi-all`, `/api/history`, `/api/meta`). Every query first runs the
//! cold-start check so a fresh demo deployment never answers empty.

use crate::core::city::City;
use crate::core::config::{AppConfig, SourceKind};
use crate::core::error::{AqhiError, Result};
use crate::core::store::{MeasurementStore, SqliteStore};
use crate::core::time::{self, HOUR_SECS};
use crate::engine::window::{self, AqhiResult, WINDOW_HOURS};
use crate::plugins::ingest::{IngestReport, Ingestor};
use crate::plugins::sources::{self, DataSource};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_HISTORY_HOURS: i64 = 24;
pub const MAX_HISTORY_HOURS: i64 = 168;

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub data_source: SourceKind,
    pub window_hours: i64,
    pub cities: Vec<City>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub ts: String,
    pub pm25: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct History {
    pub city: City,
    pub series: Vec<HistoryPoint>,
}

pub struct Service {
    store: Arc<dyn MeasurementStore>,
    ingestor: Ingestor,
}

impl Service {
    pub fn new(store: Arc<dyn MeasurementStore>, ingestor: Ingestor) -> Self {
        Service { store, ingestor }
    }

    /// Open the store and build the data source described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn MeasurementStore> = Arc::new(SqliteStore::open(&config.store.path)?);
        let source: Arc<dyn DataSource> = Arc::from(sources::build_source(&config.source)?);
        let ingestor = Ingestor::new(store.clone(), source, &config.ingest);
        Ok(Service::new(store, ingestor))
    }

    pub fn store(&self) -> &dyn MeasurementStore {
        self.store.as_ref()
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    fn prepared_hour(&self) -> Result<i64> {
        let hour = time::current_hour()?;
        self.ingestor.ensure_cold_start(hour)?;
        Ok(hour)
    }

    pub fn cities(&self) -> Result<Vec<City>> {
        self.prepared_hour()?;
        Ok(City::ALL.to_vec())
    }

    pub fn meta(&self) -> Meta {
        Meta {
            data_source: self.ingestor.source().kind(),
            window_hours: WINDOW_HOURS,
            cities: City::ALL.to_vec(),
        }
    }

    pub fn city_index(&self, city: City) -> Result<AqhiResult> {
        let hour = self.prepared_hour()?;
        self.city_index_at(city, hour)
    }

    pub fn city_index_at(&self, city: City, hour: i64) -> Result<AqhiResult> {
        window::city_index(self.store(), city, hour)
    }

    pub fn all_indexes(&self) -> Result<Vec<AqhiResult>> {
        let hour = self.prepared_hour()?;
        self.all_indexes_at(hour)
    }

    /// Every city's index, computed concurrently, in [`City::ALL`] order.
    pub fn all_indexes_at(&self, hour: i64) -> Result<Vec<AqhiResult>> {
        let store = self.store();
        City::ALL
            .par_iter()
            .map(|city| window::city_index(store, *city, hour))
            .collect()
    }

    pub fn history(&self, city: City, hours: i64) -> Result<History> {
        validate_history_hours(hours)?;
        let hour = self.prepared_hour()?;
        self.history_at(city, hours, hour)
    }

    /// Raw hourly series for the `hours` buckets ending at `end_hour`.
    pub fn history_at(&self, city: City, hours: i64, end_hour: i64) -> Result<History> {
        validate_history_hours(hours)?;
        let start = end_hour - (hours - 1) * HOUR_SECS;
        let series = self
            .store
            .query_series(city, start, end_hour)?
            .into_iter()
            .map(|m| {
                Ok(HistoryPoint {
                    ts: time::format_hour(m.hour)?,
                    pm25: m.pm25,
                    o3: m.o3,
                    no2: m.no2,
                    so2: m.so2,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(History { city, series })
    }

    pub fn ingest_now(&self) -> Result<IngestReport> {
        self.ingestor.ingest_now()
    }
}

pub fn validate_history_hours(hours: i64) -> Result<()> {
    if (1..=MAX_HISTORY_HOURS).contains(&hours) {
        Ok(())
    } else {
        Err(AqhiError::ValidationError(format!(
            "hours must be within 1~{}, got {}",
            MAX_HISTORY_HOURS, hours
        )))
    }
}
