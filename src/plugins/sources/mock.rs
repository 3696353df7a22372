//! Deterministic demo source.
//!
//! Each city gets a stable baseline, and each hour adds a small jitter on
//! top, so repeated fetches for the same `(city, hour)` agree and the series
//! still moves from hour to hour.

use crate::core::city::City;
use crate::core::config::SourceKind;
use crate::core::error::Result;
use crate::core::store::{Concentrations, Measurement};
use crate::core::time;
use crate::plugins::sources::DataSource;

/// Lower bound applied to every generated value.
const FLOOR: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct MockSource;

impl MockSource {
    pub fn new() -> Self {
        MockSource
    }

    /// Values for `city` at `hour`; pure function of its inputs.
    pub fn values_for(city: City, hour: i64) -> Concentrations {
        let city_hash = hash_name(city.name());

        let mut base = Mulberry32::new(city_hash ^ 0x9E37_79B9);
        let base_pm25 = base.range(15.0, 65.0);
        let base_o3 = base.range(40.0, 140.0);
        let base_no2 = base.range(10.0, 60.0);
        let base_so2 = base.range(3.0, 25.0);

        let mut jitter = Mulberry32::new((hour as u32) ^ city_hash);
        Concentrations {
            pm25: (base_pm25 + jitter.range(-8.0, 8.0)).max(FLOOR),
            o3: (base_o3 + jitter.range(-12.0, 12.0)).max(FLOOR),
            no2: (base_no2 + jitter.range(-6.0, 6.0)).max(FLOOR),
            so2: (base_so2 + jitter.range(-3.0, 3.0)).max(FLOOR),
        }
    }
}

impl DataSource for MockSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Mock
    }

    fn fetch_current(&self, city: City) -> Result<Measurement> {
        let hour = time::current_hour()?;
        Ok(Measurement::new(city, hour, Self::values_for(city, hour)))
    }

    fn is_synthetic(&self) -> bool {
        true
    }
}

/// Polynomial rolling hash over UTF-16 code units.
fn hash_name(name: &str) -> u32 {
    name.encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(131).wrapping_add(unit as u32))
}

/// mulberry32: tiny 32-bit PRNG, plenty for demo data.
struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    fn new(seed: u32) -> Self {
        Mulberry32 { state: seed }
    }

    /// Uniform in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        f64::from(t ^ (t >> 14)) / 4_294_967_296.0
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 1_740_790_800;

    #[test]
    fn test_same_inputs_same_values() {
        assert_eq!(
            MockSource::values_for(City::Hangzhou, HOUR),
            MockSource::values_for(City::Hangzhou, HOUR)
        );
    }

    #[test]
    fn test_values_stay_in_expected_ranges() {
        for city in City::ALL {
            for h in 0..48 {
                let v = MockSource::values_for(city, HOUR + h * time::HOUR_SECS);
                assert!((FLOOR..73.0).contains(&v.pm25), "{} pm25 {}", city, v.pm25);
                assert!((28.0..152.0).contains(&v.o3), "{} o3 {}", city, v.o3);
                assert!((4.0..66.0).contains(&v.no2), "{} no2 {}", city, v.no2);
                assert!((FLOOR..28.0).contains(&v.so2), "{} so2 {}", city, v.so2);
            }
        }
    }

    #[test]
    fn test_cities_differ() {
        assert_ne!(
            MockSource::values_for(City::Hangzhou, HOUR),
            MockSource::values_for(City::Ningbo, HOUR)
        );
    }

    #[test]
    fn test_prng_is_unit_interval() {
        let mut rng = Mulberry32::new(42);
        for _ in 0..1000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_fetch_is_synthetic_and_aligned() {
        let source = MockSource::new();
        let m = source.fetch_current(City::Taizhou).unwrap();
        assert_eq!(m.city, City::Taizhou);
        assert_eq!(m.hour.rem_euclid(time::HOUR_SECS), 0);
        assert!(source.is_synthetic());
    }
}
