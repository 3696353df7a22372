//! China National Environmental Monitoring Center (CNEMC) city feed.
//!
//! The history endpoint returns an ascending array of hourly city records;
//! the last element is the latest hour. The endpoint name and its city-code
//! parameter have shipped under several spellings, so each is tried in turn
//! while the server answers 404 or returns nothing usable (`null` or non-JSON).

use crate::core::city::City;
use crate::core::config::SourceKind;
use crate::core::error::{AqhiError, Result};
use crate::core::store::{Concentrations, Measurement};
use crate::core::time;
use crate::plugins::sources::{DataSource, HttpClient, number_or_zero};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

const HISTORY_ENDPOINTS: [(&str, &str); 4] = [
    ("/CityData/GetCityRealTimeAQIHistoryByCondition", "citycode"),
    ("/CityData/GetCityRealTimeAqiHistoryByCondition", "citycode"),
    ("/CityData/GetCityRealTimeAQIHistoryByCondition", "cityCode"),
    ("/CityData/GetCityRealTimeAqiHistoryByCondition", "cityCode"),
];

pub struct CnemcSource {
    base_url: String,
    client: HttpClient,
    headers: BTreeMap<String, String>,
}

impl CnemcSource {
    pub fn new(base_url: String, client: HttpClient) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let headers = BTreeMap::from([
            (
                "Accept".to_string(),
                "application/json, text/javascript, */*; q=0.01".to_string(),
            ),
            ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
            ("Referer".to_string(), format!("{}/", base_url)),
            ("Origin".to_string(), base_url.clone()),
            ("Accept-Language".to_string(), "zh-CN,zh;q=0.9".to_string()),
        ]);
        CnemcSource {
            base_url,
            client,
            headers,
        }
    }

    /// Decoded body, or `None` when it is not JSON or is a bare `null`.
    pub fn parse_body(raw: &str) -> Option<JsonValue> {
        serde_json::from_str::<JsonValue>(raw)
            .ok()
            .filter(|v| !v.is_null())
    }

    /// Latest record of a history array, as clamped concentrations.
    pub fn latest_from(body: &JsonValue) -> Option<Concentrations> {
        let last = body.as_array()?.last()?;
        Some(
            Concentrations {
                pm25: number_or_zero(last.get("PM2_5")),
                o3: number_or_zero(last.get("O3")),
                no2: number_or_zero(last.get("NO2")),
                so2: number_or_zero(last.get("SO2")),
            }
            .clamped(),
        )
    }
}

impl DataSource for CnemcSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Cnemc
    }

    fn fetch_current(&self, city: City) -> Result<Measurement> {
        let code = city.cnemc_code().to_string();
        let mut last_status = 0u16;

        for (path, param) in HISTORY_ENDPOINTS {
            let url = format!("{}{}", self.base_url, path);
            let reply = self.client.get(&url, &[(param, code.as_str())], &self.headers)?;
            last_status = reply.status;
            if !reply.is_success() {
                if reply.status == 404 {
                    continue;
                }
                return Err(AqhiError::FetchError(format!("CNEMC_HTTP_{}", reply.status)));
            }
            let Some(body) = Self::parse_body(&reply.body) else {
                tracing::debug!(city = %city, path, "cnemc body is empty or not JSON, trying next endpoint");
                continue;
            };
            return match Self::latest_from(&body) {
                Some(values) => Ok(Measurement::new(city, time::current_hour()?, values)),
                None => Err(AqhiError::FetchError(format!("CNEMC_HTTP_{}", last_status))),
            };
        }
        Err(AqhiError::FetchError(format!("CNEMC_HTTP_{}", last_status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_uses_last_record() {
        let body = json!([
            {"PM2_5": "10", "O3": "20", "NO2": "30", "SO2": "4"},
            {"PM2_5": "41", "O3": "88", "NO2": "—", "SO2": "7"}
        ]);
        let v = CnemcSource::latest_from(&body).unwrap();
        assert_eq!(v, Concentrations { pm25: 41.0, o3: 88.0, no2: 0.0, so2: 7.0 });
    }

    #[test]
    fn test_empty_or_non_array_has_no_latest() {
        assert!(CnemcSource::latest_from(&json!([])).is_none());
        assert!(CnemcSource::latest_from(&json!({"PM2_5": 3})).is_none());
    }

    #[test]
    fn test_null_and_non_json_bodies_move_to_next_endpoint() {
        assert!(CnemcSource::parse_body("null").is_none());
        assert!(CnemcSource::parse_body(" null\n").is_none());
        assert!(CnemcSource::parse_body("<html>blocked</html>").is_none());
        assert_eq!(CnemcSource::parse_body("[]"), Some(json!([])));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let s = CnemcSource::new("https://air.cnemc.cn:18007/".into(), HttpClient::new(1));
        assert_eq!(s.base_url, "https://air.cnemc.cn:18007");
        assert_eq!(s.headers["Referer"], "https://air.cnemc.cn:18007/");
        assert_eq!(s.kind(), SourceKind::Cnemc);
        assert!(!s.is_synthetic());
    }
}
