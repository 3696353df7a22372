//! Piecewise-linear mapping from total excess risk to the AQHI scale.
//!
//! Segments are scanned in table order and the first one whose closed ER
//! range contains the input wins. Adjacent segments share their boundary ER
//! and agree on its index, so the mapping is continuous.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health risk level, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "一级")]
    One,
    #[serde(rename = "二级")]
    Two,
    #[serde(rename = "三级")]
    Three,
    #[serde(rename = "四级")]
    Four,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::One => "一级",
            Level::Two => "二级",
            Level::Three => "三级",
            Level::Four => "四级",
        }
    }

    /// Color band; one band per level.
    pub fn color(self) -> Color {
        match self {
            Level::One => Color::Green,
            Level::Two => Color::Blue,
            Level::Three => Color::Yellow,
            Level::Four => Color::Red,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    #[serde(rename = "绿色")]
    Green,
    #[serde(rename = "蓝色")]
    Blue,
    #[serde(rename = "黄色")]
    Yellow,
    #[serde(rename = "红色")]
    Red,
}

impl Color {
    pub fn label(self) -> &'static str {
        match self {
            Color::Green => "绿色",
            Color::Blue => "蓝色",
            Color::Yellow => "黄色",
            Color::Red => "红色",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the breakpoint table: ER range `[er_lo, er_hi]` maps linearly
/// onto index range `[index_lo, index_hi]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub er_lo: f64,
    pub er_hi: f64,
    pub index_lo: f64,
    pub index_hi: f64,
    pub level: Level,
}

const fn seg(er_lo: f64, er_hi: f64, index_lo: f64, index_hi: f64, level: Level) -> Segment {
    Segment {
        er_lo,
        er_hi,
        index_lo,
        index_hi,
        level,
    }
}

pub const SEGMENTS: [Segment; 11] = [
    seg(0.0, 5.57, 0.0, 1.0, Level::One),
    seg(5.57, 11.14, 1.0, 2.0, Level::One),
    seg(11.14, 16.71, 2.0, 3.0, Level::One),
    seg(16.71, 19.72, 3.0, 4.0, Level::Two),
    seg(19.72, 21.78, 4.0, 5.0, Level::Two),
    seg(21.78, 25.74, 5.0, 6.0, Level::Two),
    seg(25.74, 34.44, 6.0, 7.0, Level::Three),
    seg(34.44, 43.14, 7.0, 8.0, Level::Three),
    seg(43.14, 51.84, 8.0, 9.0, Level::Three),
    seg(51.84, 60.54, 9.0, 10.0, Level::Four),
    seg(60.54, f64::INFINITY, 10.0, 11.0, Level::Four),
];

impl Segment {
    pub fn contains(&self, er: f64) -> bool {
        self.er_lo <= er && er <= self.er_hi
    }

    /// Linear interpolation inside the segment.
    ///
    /// The last segment is unbounded: any finite ER over an infinite width
    /// contributes nothing, so the index saturates at `index_lo` (10).
    pub fn interpolate(&self, er: f64) -> f64 {
        (er - self.er_lo) / (self.er_hi - self.er_lo) * (self.index_hi - self.index_lo)
            + self.index_lo
    }
}

/// Index value, level and color for a total excess risk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AqhiBand {
    pub index: f64,
    pub level: Level,
    pub color: Color,
}

/// Map `er_total` onto the AQHI scale.
///
/// Negative and non-finite totals fall outside every segment and map to `None`.
pub fn map_to_aqhi(er_total: f64) -> Option<AqhiBand> {
    if !er_total.is_finite() {
        return None;
    }
    SEGMENTS.iter().find(|s| s.contains(er_total)).map(|s| AqhiBand {
        index: s.interpolate(er_total),
        level: s.level,
        color: s.level.color(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(er: f64) -> f64 {
        map_to_aqhi(er).unwrap().index
    }

    #[test]
    fn test_zero_maps_to_zero_level_one() {
        let band = map_to_aqhi(0.0).unwrap();
        assert_eq!(band.index, 0.0);
        assert_eq!(band.level, Level::One);
        assert_eq!(band.color, Color::Green);
    }

    #[test]
    fn test_interpolates_within_segment() {
        // Midpoint of 16.71..19.72 maps to 3.5.
        assert!((index((16.71 + 19.72) / 2.0) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_shared_boundary_resolves_to_lower_segment() {
        let band = map_to_aqhi(16.71).unwrap();
        assert_eq!(band.level, Level::One);
        assert!((band.index - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_interior_breakpoints_are_continuous() {
        for pair in SEGMENTS.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            let b = lower.er_hi;
            assert_eq!(b, upper.er_lo);
            let from_lower = lower.interpolate(b);
            let from_upper = upper.interpolate(b);
            assert!((from_lower - from_upper).abs() < 1e-9, "jump at {}", b);
            assert!((index(b) - upper.index_lo).abs() < 1e-9);
        }
    }

    #[test]
    fn test_open_top_segment_saturates() {
        assert!((index(60.54) - 10.0).abs() < 1e-9);
        assert_eq!(index(70.0), 10.0);
        assert_eq!(index(1.0e6), 10.0);
        assert_eq!(map_to_aqhi(80.0).unwrap().level, Level::Four);
    }

    #[test]
    fn test_negative_and_non_finite_have_no_band() {
        assert!(map_to_aqhi(-0.01).is_none());
        assert!(map_to_aqhi(f64::NAN).is_none());
        assert!(map_to_aqhi(f64::INFINITY).is_none());
        assert!(map_to_aqhi(f64::NEG_INFINITY).is_none());
    }

    #[test]
    fn test_monotonic_over_table() {
        let mut prev = index(0.0);
        let mut er = 0.0;
        while er < 120.0 {
            er += 0.05;
            let cur = index(er);
            assert!(cur >= prev, "index decreased at er={}", er);
            prev = cur;
        }
    }

    #[test]
    fn test_levels_follow_table() {
        assert_eq!(map_to_aqhi(18.0).unwrap().color, Color::Blue);
        assert_eq!(map_to_aqhi(30.0).unwrap().level, Level::Three);
        assert_eq!(map_to_aqhi(30.0).unwrap().color, Color::Yellow);
        assert_eq!(map_to_aqhi(55.0).unwrap().color, Color::Red);
    }
}
