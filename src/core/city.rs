//! The fixed set of cities the service tracks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::AqhiError;

/// Prefecture-level cities of Zhejiang province.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum City {
    #[serde(rename = "杭州")]
    Hangzhou,
    #[serde(rename = "宁波")]
    Ningbo,
    #[serde(rename = "温州")]
    Wenzhou,
    #[serde(rename = "嘉兴")]
    Jiaxing,
    #[serde(rename = "湖州")]
    Huzhou,
    #[serde(rename = "绍兴")]
    Shaoxing,
    #[serde(rename = "金华")]
    Jinhua,
    #[serde(rename = "衢州")]
    Quzhou,
    #[serde(rename = "舟山")]
    Zhoushan,
    #[serde(rename = "台州")]
    Taizhou,
    #[serde(rename = "丽水")]
    Lishui,
}

impl City {
    pub const ALL: [City; 11] = [
        City::Hangzhou,
        City::Ningbo,
        City::Wenzhou,
        City::Jiaxing,
        City::Huzhou,
        City::Shaoxing,
        City::Jinhua,
        City::Quzhou,
        City::Zhoushan,
        City::Taizhou,
        City::Lishui,
    ];

    pub fn name(self) -> &'static str {
        match self {
            City::Hangzhou => "杭州",
            City::Ningbo => "宁波",
            City::Wenzhou => "温州",
            City::Jiaxing => "嘉兴",
            City::Huzhou => "湖州",
            City::Shaoxing => "绍兴",
            City::Jinhua => "金华",
            City::Quzhou => "衢州",
            City::Zhoushan => "舟山",
            City::Taizhou => "台州",
            City::Lishui => "丽水",
        }
    }

    /// City code used by the national environmental monitoring center.
    pub fn cnemc_code(self) -> u32 {
        330100 + 100 * self as u32
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for City {
    type Err = AqhiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        City::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| AqhiError::ValidationError(format!("unknown city: {}", s)))
    }
}
