//! Ingestion: one fetch per city per hour, upserted into the store.
//!
//! A pass walks every city in order, stamps each reading with the hour being
//! filled (whatever the source reported) and upserts it. What happens when a
//! city's fetch fails is governed by [`IngestPolicy`]; store errors always
//! end the pass.

use crate::core::city::City;
use crate::core::config::{IngestConfig, IngestPolicy};
use crate::core::context::Context;
use crate::core::error::Result;
use crate::core::store::MeasurementStore;
use crate::core::time;
use crate::plugins::sources::DataSource;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Delay after an interval boundary before fetching, so upstream has
/// published the new hour.
const SETTLE_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestFailure {
    pub city: City,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub hour: i64,
    pub written: Vec<City>,
    pub failed: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Ingestor {
    store: Arc<dyn MeasurementStore>,
    source: Arc<dyn DataSource>,
    policy: IngestPolicy,
    cold_start: bool,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn MeasurementStore>,
        source: Arc<dyn DataSource>,
        config: &IngestConfig,
    ) -> Self {
        Ingestor {
            store,
            source,
            policy: config.policy,
            cold_start: config.cold_start,
        }
    }

    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    /// Fetch and upsert every city for `hour`.
    pub fn ingest_hour(&self, hour: i64) -> Result<IngestReport> {
        let mut report = IngestReport {
            hour,
            written: Vec::with_capacity(City::ALL.len()),
            failed: Vec::new(),
        };

        for city in City::ALL {
            match self.source.fetch_current(city) {
                Ok(mut m) => {
                    m.city = city;
                    m.hour = hour;
                    self.store.upsert(&m)?;
                    report.written.push(city);
                }
                Err(e) => match self.policy {
                    IngestPolicy::Abort => {
                        tracing::error!(city = %city, error = %e, "fetch failed, aborting pass");
                        return Err(e);
                    }
                    IngestPolicy::Continue => {
                        tracing::warn!(city = %city, error = %e, "fetch failed, continuing");
                        report.failed.push(IngestFailure {
                            city,
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        tracing::info!(
            hour,
            source = %self.source.kind(),
            written = report.written.len(),
            failed = report.failed.len(),
            "ingest pass finished"
        );
        Ok(report)
    }

    /// Ingest the current hour.
    pub fn ingest_now(&self) -> Result<IngestReport> {
        self.ingest_hour(time::current_hour()?)
    }

    /// Fill `hour` on first use when the source is synthetic and the store
    /// has nothing for it yet. Returns the report when a pass ran.
    pub fn ensure_cold_start(&self, hour: i64) -> Result<Option<IngestReport>> {
        if !self.cold_start || !self.source.is_synthetic() {
            return Ok(None);
        }
        if self.store.count_at_hour(hour)? > 0 {
            return Ok(None);
        }
        tracing::info!(hour, "no rows for current hour, running cold-start ingest");
        self.ingest_hour(hour).map(Some)
    }

    /// Ingest once per `interval_secs` until `ctx` is cancelled.
    ///
    /// A failed pass is logged and the loop waits for the next boundary;
    /// that next pass is the retry. Returns the number of passes attempted.
    pub fn run_schedule(&self, ctx: &Context, interval_secs: u64) -> usize {
        let interval = interval_secs.max(1) as i64;
        let mut passes = 0;
        loop {
            passes += 1;
            if let Err(e) = self.ingest_now() {
                tracing::error!(error = %e, "scheduled ingest failed");
            }

            let wait = secs_until_next_run(Utc::now().timestamp(), interval);
            tracing::debug!(wait_secs = wait, "sleeping until next ingest");
            if ctx.wait_timeout(Duration::from_secs(wait as u64)) {
                tracing::info!(passes, "schedule cancelled");
                return passes;
            }
        }
    }
}

/// Seconds from `now` until the next `interval` boundary plus the settle delay.
///
/// Boundaries are aligned on the civil clock, so an hourly interval fires
/// just after the top of each hour.
pub fn secs_until_next_run(now: i64, interval: i64) -> i64 {
    let local = now + i64::from(time::TZ_OFFSET_SECS);
    let into = (local - SETTLE_SECS).rem_euclid(interval);
    interval - into
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_run_just_after_top_of_hour() {
        // 09:00:00 +08:00
        let nine = 1_740_790_800;
        assert_eq!(secs_until_next_run(nine, 3600), SETTLE_SECS);
        assert_eq!(secs_until_next_run(nine + SETTLE_SECS, 3600), 3600);
        assert_eq!(secs_until_next_run(nine + 1800, 3600), 1800 + SETTLE_SECS);
    }

    #[test]
    fn test_next_run_is_always_positive() {
        for now in 1_740_790_800..1_740_790_800 + 200 {
            let w = secs_until_next_run(now, 60);
            assert!(w > 0 && w <= 60);
        }
    }
}
