//! Trailing-window aggregation: the current hour plus the two before it.

use crate::core::city::City;
use crate::core::error::Result;
use crate::core::store::{Concentrations, MeasurementStore};
use crate::core::time::HOUR_SECS;
use crate::engine::advice::advice_for;
use crate::engine::excess_risk::{Pollutant, compute_excess_risk};
use crate::engine::scale::{Color, Level, map_to_aqhi};
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of hourly buckets averaged into one index value.
pub const WINDOW_HOURS: i64 = 3;

/// AQHI view for one city at query time.
///
/// `aqhi`, `level`, `color` and `advice` are present together or absent
/// together; they serialize as `null` when absent. The ER and average fields
/// are omitted entirely when the window is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqhiResult {
    pub city: City,
    pub aqhi: Option<f64>,
    pub level: Option<Level>,
    pub color: Option<Color>,
    pub advice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub er_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub er_components: Option<BTreeMap<Pollutant, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg: Option<Concentrations>,
    pub window_hours: i64,
    pub available_points: usize,
}

impl AqhiResult {
    pub fn empty(city: City) -> Self {
        AqhiResult {
            city,
            aqhi: None,
            level: None,
            color: None,
            advice: None,
            er_total: None,
            er_components: None,
            avg: None,
            window_hours: WINDOW_HOURS,
            available_points: 0,
        }
    }
}

/// First hour of the window ending at `current_hour` (inclusive).
pub fn window_start(current_hour: i64) -> i64 {
    current_hour - (WINDOW_HOURS - 1) * HOUR_SECS
}

/// Arithmetic mean of each pollutant, or `None` for no rows.
pub fn mean(rows: &[Concentrations]) -> Option<Concentrations> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let sum = rows.iter().fold(Concentrations::default(), |acc, r| Concentrations {
        pm25: acc.pm25 + r.pm25,
        o3: acc.o3 + r.o3,
        no2: acc.no2 + r.no2,
        so2: acc.so2 + r.so2,
    });
    Some(Concentrations {
        pm25: sum.pm25 / n,
        o3: sum.o3 / n,
        no2: sum.no2 / n,
        so2: sum.so2 / n,
    })
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Compose the ER model and the AQHI mapping over the rows of one window.
pub fn evaluate(city: City, rows: &[Concentrations]) -> AqhiResult {
    let Some(avg) = mean(rows).map(Concentrations::clamped) else {
        return AqhiResult::empty(city);
    };

    let er = compute_excess_risk(avg.pm25, avg.o3, avg.so2, avg.no2);
    let band = map_to_aqhi(er.total);
    let level = band.map(|b| b.level);

    AqhiResult {
        city,
        aqhi: band.map(|b| round_to(b.index, 1)),
        level,
        color: band.map(|b| b.color),
        advice: advice_for(level),
        er_total: Some(round_to(er.total, 2)),
        er_components: Some(
            er.components
                .iter()
                .map(|(p, v)| (*p, round_to(*v, 2)))
                .collect(),
        ),
        avg: Some(avg),
        window_hours: WINDOW_HOURS,
        available_points: rows.len(),
    }
}

/// AQHI for `city` over the window ending at `current_hour`.
///
/// Store failures propagate; an empty window is a normal, all-absent result.
pub fn city_index(store: &dyn MeasurementStore, city: City, current_hour: i64) -> Result<AqhiResult> {
    let rows = store.query_window(city, window_start(current_hour), current_hour)?;
    tracing::debug!(city = %city, hour = current_hour, points = rows.len(), "window aggregated");
    Ok(evaluate(city, &rows))
}
