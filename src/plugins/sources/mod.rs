//! Data-source capability: where one current measurement per city comes from.
//!
//! The concrete source is chosen once at startup by [`build_source`] and
//! handed to the ingestor; nothing switches it at runtime.

pub mod cnemc;
pub mod custom;
pub mod mock;

use crate::core::city::City;
use crate::core::config::{SourceConfig, SourceKind};
use crate::core::error::{AqhiError, Result};
use crate::core::store::Measurement;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::time::Duration;

pub use cnemc::CnemcSource;
pub use custom::CustomSource;
pub use mock::MockSource;

/// A type that can get the latest measurement for a city.
pub trait DataSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch the current reading for `city`.
    ///
    /// The returned `hour` is advisory; the ingestor overwrites it with the
    /// hour it is filling.
    fn fetch_current(&self, city: City) -> Result<Measurement>;

    /// True for generated demo data, which may be produced on demand.
    fn is_synthetic(&self) -> bool {
        false
    }
}

/// Construct the configured source.
pub fn build_source(config: &SourceConfig) -> Result<Box<dyn DataSource>> {
    let source: Box<dyn DataSource> = match config.kind {
        SourceKind::Mock => Box::new(MockSource::new()),
        SourceKind::Custom => Box::new(CustomSource::new(
            config.custom.clone(),
            HttpClient::new(config.timeout_secs),
        )?),
        SourceKind::Cnemc => Box::new(CnemcSource::new(
            config.cnemc.base_url.clone(),
            HttpClient::new(config.timeout_secs),
        )),
    };
    tracing::info!(source = %source.kind(), "data source selected");
    Ok(source)
}

/// A response body with its status, whatever the status was.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP GET client shared by the network sources.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .user_agent(&format!("aqhi/{}", env!("CARGO_PKG_VERSION")))
            .build();
        HttpClient { agent }
    }

    /// GET `url`. Non-2xx statuses are returned, not raised; only transport
    /// failures (DNS, TLS, timeouts) become errors.
    pub fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &BTreeMap<String, String>,
    ) -> Result<HttpReply> {
        let mut request = self.agent.get(url);
        for (name, value) in query {
            request = request.query(name, value);
        }
        for (name, value) in headers {
            request = request.set(name, value);
        }

        let response = match request.call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(ureq::Error::Transport(e)) => {
                return Err(AqhiError::FetchError(format!("transport error for {}: {}", url, e)));
            }
        };
        let status = response.status();
        let body = response
            .into_string()
            .map_err(|e| AqhiError::FetchError(format!("unreadable body from {}: {}", url, e)))?;
        tracing::debug!(url, status, bytes = body.len(), "source response");
        Ok(HttpReply { status, body })
    }
}

/// Lenient numeric read: numbers and numeric strings are accepted, anything
/// else (missing, null, text, non-finite) becomes 0.
pub fn number_or_zero(value: Option<&JsonValue>) -> f64 {
    let n = match value {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(JsonValue::Bool(true)) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_or_zero() {
        assert_eq!(number_or_zero(Some(&json!(12.5))), 12.5);
        assert_eq!(number_or_zero(Some(&json!(" 7 "))), 7.0);
        assert_eq!(number_or_zero(Some(&json!("—"))), 0.0);
        assert_eq!(number_or_zero(Some(&json!(null))), 0.0);
        assert_eq!(number_or_zero(Some(&json!([1]))), 0.0);
        assert_eq!(number_or_zero(None), 0.0);
    }

    #[test]
    fn test_build_mock_source() {
        let source = build_source(&SourceConfig::default()).unwrap();
        assert_eq!(source.kind(), SourceKind::Mock);
        assert!(source.is_synthetic());
    }

    #[test]
    fn test_build_custom_without_url_fails() {
        let mut cfg = SourceConfig::default();
        cfg.kind = SourceKind::Custom;
        assert!(matches!(build_source(&cfg), Err(AqhiError::ConfigError(_))));
    }

    #[test]
    fn test_reply_success_range() {
        assert!(HttpReply { status: 204, body: String::new() }.is_success());
        assert!(!HttpReply { status: 404, body: String::new() }.is_success());
    }
}
