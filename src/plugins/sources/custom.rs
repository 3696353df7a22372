//! Generic HTTP JSON source, described entirely by configuration.
//!
//! Accepts either a flat object (`{"pm25": .., "o3": ..}`) or one keyed by
//! city name (`{"杭州": {"pm25": ..}, ..}`). Field names are configurable.

use crate::core::city::City;
use crate::core::config::{CustomSourceConfig, SourceKind};
use crate::core::error::{AqhiError, Result};
use crate::core::store::{Concentrations, Measurement};
use crate::core::time;
use crate::plugins::sources::{DataSource, HttpClient, number_or_zero};
use serde_json::Value as JsonValue;

/// Where a request for one city goes.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTarget {
    pub url: String,
    pub query: Vec<(String, String)>,
}

pub struct CustomSource {
    config: CustomSourceConfig,
    client: HttpClient,
}

impl CustomSource {
    pub fn new(config: CustomSourceConfig, client: HttpClient) -> Result<Self> {
        if config.url_template.is_none() && config.url.is_none() {
            return Err(AqhiError::ConfigError(
                "missing source url: set source.custom.url_template or source.custom.url".into(),
            ));
        }
        Ok(CustomSource { config, client })
    }

    /// Template first (with `{city}` percent-encoded), then the fixed url.
    pub fn target_for(config: &CustomSourceConfig, city: City) -> Result<RequestTarget> {
        if let Some(tpl) = config.url_template.as_deref().filter(|t| !t.is_empty()) {
            return Ok(RequestTarget {
                url: tpl.replace("{city}", &urlencoding::encode(city.name())),
                query: Vec::new(),
            });
        }
        if let Some(url) = config.url.as_deref().filter(|u| !u.is_empty()) {
            let query = config
                .city_param
                .as_ref()
                .map(|p| vec![(p.clone(), city.name().to_string())])
                .unwrap_or_default();
            return Ok(RequestTarget {
                url: url.to_string(),
                query,
            });
        }
        Err(AqhiError::ConfigError("missing source url".into()))
    }

    /// Pull the four pollutants for `city` out of a decoded body.
    pub fn extract(config: &CustomSourceConfig, city: City, body: &JsonValue) -> Concentrations {
        let obj = match body.get(city.name()) {
            Some(nested) if nested.is_object() => nested,
            _ => body,
        };
        let fields = &config.fields;
        Concentrations {
            pm25: number_or_zero(obj.get(fields.pm25())),
            o3: number_or_zero(obj.get(fields.o3())),
            no2: number_or_zero(obj.get(fields.no2())),
            so2: number_or_zero(obj.get(fields.so2())),
        }
        .clamped()
    }
}

impl DataSource for CustomSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Custom
    }

    fn fetch_current(&self, city: City) -> Result<Measurement> {
        let target = Self::target_for(&self.config, city)?;
        let query: Vec<(&str, &str)> = target
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let reply = self.client.get(&target.url, &query, &self.config.headers)?;
        if !reply.is_success() {
            return Err(AqhiError::FetchError(format!("SOURCE_HTTP_{}", reply.status)));
        }
        let body: JsonValue = serde_json::from_str(&reply.body)
            .map_err(|_| AqhiError::FetchError("SOURCE_PARSE_NON_JSON".into()))?;

        let values = Self::extract(&self.config, city, &body);
        Ok(Measurement::new(city, time::current_hour()?, values))
    }
}
