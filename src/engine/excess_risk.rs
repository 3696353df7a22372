//! Excess-risk (ER) model.
//!
//! Each pollutant contributes `100 * (exp(beta * c) - 1)` percent of excess
//! health risk; the total is the plain sum of the four contributions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "O₃")]
    O3,
    #[serde(rename = "SO₂")]
    So2,
    #[serde(rename = "NO₂")]
    No2,
}

impl Pollutant {
    pub const ALL: [Pollutant; 4] = [Pollutant::Pm25, Pollutant::O3, Pollutant::So2, Pollutant::No2];

    /// Exposure-response coefficient per µg/m³.
    pub fn beta(self) -> f64 {
        match self {
            Pollutant::Pm25 => 0.000683,
            Pollutant::O3 => 0.000586,
            Pollutant::So2 => 0.002246,
            Pollutant::No2 => 0.001314,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::O3 => "O₃",
            Pollutant::So2 => "SO₂",
            Pollutant::No2 => "NO₂",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcessRisk {
    pub components: BTreeMap<Pollutant, f64>,
    pub total: f64,
}

impl ExcessRisk {
    pub fn component(&self, p: Pollutant) -> f64 {
        self.components.get(&p).copied().unwrap_or(0.0)
    }
}

/// Contribution of a single pollutant at concentration `c`.
pub fn contribution(p: Pollutant, c: f64) -> f64 {
    100.0 * (p.beta() * c).exp_m1()
}

/// Per-pollutant excess risk and its sum.
///
/// Callers clamp concentrations to `>= 0`; negative inputs yield negative risk.
pub fn compute_excess_risk(pm25: f64, o3: f64, so2: f64, no2: f64) -> ExcessRisk {
    let components: BTreeMap<Pollutant, f64> = [
        (Pollutant::Pm25, pm25),
        (Pollutant::O3, o3),
        (Pollutant::So2, so2),
        (Pollutant::No2, no2),
    ]
    .into_iter()
    .map(|(p, c)| (p, contribution(p, c)))
    .collect();
    let total = components.values().sum();
    ExcessRisk { components, total }
}
