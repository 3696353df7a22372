//! The AQHI computation engine.
//!
//! - [`excess_risk`]: pollutant concentrations to per-pollutant excess risk.
//! - [`scale`]: total excess risk to index, level and color band.
//! - [`advice`]: guidance text per level.
//! - [`window`]: trailing 3-hour averaging against the measurement store.
//!
//! Everything here except [`window::city_index`] is pure and safe to call
//! from any number of threads.

pub mod advice;
pub mod excess_risk;
pub mod scale;
pub mod window;

pub use excess_risk::{ExcessRisk, Pollutant, compute_excess_risk};
pub use scale::{AqhiBand, Color, Level, map_to_aqhi};
pub use window::{AqhiResult, WINDOW_HOURS, city_index};
