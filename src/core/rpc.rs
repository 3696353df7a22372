//! JSON RPC interface.
//!
//! Callers send one JSON request per line (or one via `--op/--params`) and get
//! one JSON response back. Ops mirror the public HTTP routes:
//!
//! | op         | route            | params                  |
//! |------------|------------------|-------------------------|
//! | `health`   | `/api/health`    |                         |
//! | `meta`     | `/api/meta`      |                         |
//! | `cities`   | `/api/cities`    |                         |
//! | `aqhi`     | `/api/aqhi`      | `city`                  |
//! | `aqhi_all` | `/api/aqhi-all`  |                         |
//! | `history`  | `/api/history`   | `city`, `hours` (24)    |
//! | `ingest`   |                  |                         |
//!
//! Errors carry the HTTP status the route would answer with.

use crate::core::city::City;
use crate::core::error::AqhiError;
use crate::plugins::service::{DEFAULT_HISTORY_HOURS, Service};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Standard RPC request envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcRequest {
    /// Operation to perform
    pub op: String,
    /// Operation parameters
    #[serde(default)]
    pub params: JsonValue,
    /// Request ID for correlation
    #[serde(default = "default_request_id")]
    pub id: String,
}

pub fn default_request_id() -> String {
    crate::core::time::new_event_id()
}

/// Standard RPC response envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcResponse {
    pub id: String,
    pub success: bool,
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcError {
    pub code: String,
    pub message: String,
    /// HTTP status the equivalent route answers with.
    pub status: u16,
}

impl RpcResponse {
    pub fn ok(id: String, result: JsonValue) -> Self {
        RpcResponse {
            id,
            success: true,
            ts: crate::core::time::now_epoch_z(),
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: String, code: &str, message: String, status: u16) -> Self {
        RpcResponse {
            id,
            success: false,
            ts: crate::core::time::now_epoch_z(),
            result: None,
            error: Some(RpcError {
                code: code.to_string(),
                message,
                status,
            }),
        }
    }

    fn from_error(id: String, e: &AqhiError) -> Self {
        Self::err(id, e.code(), e.to_string(), e.http_status())
    }
}

/// Parse one request line. Malformed JSON becomes an error response.
pub fn parse_request(line: &str) -> Result<RpcRequest, RpcResponse> {
    serde_json::from_str(line).map_err(|e| {
        RpcResponse::err(
            default_request_id(),
            "invalid_request",
            format!("malformed request: {}", e),
            400,
        )
    })
}

fn city_param(params: &JsonValue) -> Result<City, AqhiError> {
    params
        .get("city")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .parse()
}

fn hours_param(params: &JsonValue) -> Result<i64, AqhiError> {
    match params.get("hours") {
        None | Some(JsonValue::Null) => Ok(DEFAULT_HISTORY_HOURS),
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .ok_or_else(|| AqhiError::ValidationError(format!("hours must be an integer, got {}", n))),
        Some(JsonValue::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| AqhiError::ValidationError(format!("hours must be an integer, got {}", s))),
        Some(other) => Err(AqhiError::ValidationError(format!(
            "hours must be an integer, got {}",
            other
        ))),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<JsonValue, AqhiError> {
    serde_json::to_value(value).map_err(|e| AqhiError::InternalError(format!("serialize: {}", e)))
}

fn execute(service: &Service, req: &RpcRequest) -> Result<Option<JsonValue>, AqhiError> {
    let value = match req.op.as_str() {
        "health" => serde_json::json!({ "ok": true }),
        "meta" => to_json(&service.meta())?,
        "cities" => to_json(&service.cities()?)?,
        "aqhi" => {
            let city = city_param(&req.params)?;
            to_json(&service.city_index(city)?)?
        }
        "aqhi_all" => to_json(&service.all_indexes()?)?,
        "history" => {
            let city = city_param(&req.params)?;
            let hours = hours_param(&req.params)?;
            to_json(&service.history(city, hours)?)?
        }
        "ingest" => to_json(&service.ingest_now()?)?,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Execute one request against the service.
pub fn handle(service: &Service, req: RpcRequest) -> RpcResponse {
    tracing::debug!(op = %req.op, id = %req.id, "rpc request");
    match execute(service, &req) {
        Ok(Some(result)) => RpcResponse::ok(req.id, result),
        Ok(None) => RpcResponse::err(
            req.id,
            "unknown_op",
            format!("unknown op: {}", req.op),
            404,
        ),
        Err(e) => {
            if e.http_status() >= 500 {
                tracing::error!(op = %req.op, error = %e, "rpc request failed");
            }
            RpcResponse::from_error(req.id, &e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request_defaults() {
        let req = parse_request(r#"{"op":"cities"}"#).unwrap();
        assert_eq!(req.op, "cities");
        assert!(req.params.is_null());
        assert!(!req.id.is_empty());
    }

    #[test]
    fn test_parse_request_malformed() {
        let resp = parse_request("{not json").unwrap_err();
        assert!(!resp.success);
        assert_eq!(resp.error.unwrap().status, 400);
    }

    #[test]
    fn test_city_param() {
        assert_eq!(city_param(&json!({"city": "杭州"})).unwrap(), City::Hangzhou);
        assert_eq!(city_param(&json!({})).unwrap_err().http_status(), 400);
        assert!(city_param(&json!({"city": "上海"})).is_err());
    }

    #[test]
    fn test_unserializable_result_is_internal_error() {
        // JSON object keys must be strings.
        let value = std::collections::BTreeMap::from([((1, 2), 3)]);
        let err = to_json(&value).unwrap_err();
        assert_eq!(err.code(), "internal_error");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_hours_param() {
        assert_eq!(hours_param(&json!({})).unwrap(), 24);
        assert_eq!(hours_param(&json!({"hours": 48})).unwrap(), 48);
        assert_eq!(hours_param(&json!({"hours": "12"})).unwrap(), 12);
        assert!(hours_param(&json!({"hours": 1.5})).is_err());
        assert!(hours_param(&json!({"hours": [1]})).is_err());
    }
}
