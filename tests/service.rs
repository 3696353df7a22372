use aqhi::core::city::City;
use aqhi::core::config::{AppConfig, IngestConfig, SourceKind};
use aqhi::core::error::{AqhiError, Result};
use aqhi::core::rpc::{self, RpcRequest};
use aqhi::core::store::{Concentrations, Measurement, MeasurementStore, SqliteStore};
use aqhi::core::time::HOUR_SECS;
use aqhi::engine::scale::Level;
use aqhi::plugins::ingest::Ingestor;
use aqhi::plugins::service::Service;
use aqhi::plugins::sources::{DataSource, MockSource};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

// 2025-03-01T09:00:00+08:00
const NINE_AM: i64 = 1_740_790_800;

/// Live-style source that is never reachable.
struct OfflineSource;

impl DataSource for OfflineSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Cnemc
    }

    fn fetch_current(&self, _city: City) -> Result<Measurement> {
        Err(AqhiError::FetchError("offline".to_string()))
    }
}

fn service_with(tmp: &TempDir, source: Arc<dyn DataSource>) -> (Service, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open(&tmp.path().join("aqhi.db")).expect("open store"));
    let ingestor = Ingestor::new(store.clone(), source, &IngestConfig::default());
    (Service::new(store.clone(), ingestor), store)
}

fn seed(store: &SqliteStore, city: City, hour: i64, pm25: f64) {
    store
        .upsert(&Measurement::new(
            city,
            hour,
            Concentrations {
                pm25,
                o3: 80.0,
                no2: 40.0,
                so2: 10.0,
            },
        ))
        .unwrap();
}

fn request(op: &str, params: serde_json::Value) -> RpcRequest {
    RpcRequest {
        op: op.to_string(),
        params,
        id: "test".to_string(),
    }
}

#[test]
fn empty_window_serializes_nulls() {
    let tmp = TempDir::new().expect("tempdir");
    let (service, _store) = service_with(&tmp, Arc::new(OfflineSource));

    let r = service.city_index_at(City::Taizhou, NINE_AM).unwrap();
    assert_eq!(r.available_points, 0);
    let v = serde_json::to_value(&r).unwrap();
    assert_eq!(v["city"], "台州");
    assert!(v["aqhi"].is_null());
    assert!(v["advice"].is_null());
    assert_eq!(v["window_hours"], 3);
}

#[test]
fn window_ignores_rows_outside_three_hours() {
    let tmp = TempDir::new().expect("tempdir");
    let (service, store) = service_with(&tmp, Arc::new(OfflineSource));

    seed(&store, City::Hangzhou, NINE_AM, 50.0);
    seed(&store, City::Hangzhou, NINE_AM - 3 * HOUR_SECS, 900.0);
    seed(&store, City::Hangzhou, NINE_AM + HOUR_SECS, 900.0);

    let r = service.city_index_at(City::Hangzhou, NINE_AM).unwrap();
    assert_eq!(r.available_points, 1);
    assert_eq!(r.er_total, Some(15.94));
    assert_eq!(r.aqhi, Some(2.9));
}

#[test]
fn three_consecutive_hours_average_into_one_index() {
    let tmp = TempDir::new().expect("tempdir");
    let (service, store) = service_with(&tmp, Arc::new(OfflineSource));

    let rows = [
        (NINE_AM - 2 * HOUR_SECS, 30.0, 60.0, 20.0, 5.0),
        (NINE_AM - HOUR_SECS, 40.0, 70.0, 25.0, 8.0),
        (NINE_AM, 50.0, 80.0, 30.0, 10.0),
    ];
    for (hour, pm25, o3, no2, so2) in rows {
        store
            .upsert(&Measurement::new(
                City::Hangzhou,
                hour,
                Concentrations { pm25, o3, no2, so2 },
            ))
            .unwrap();
    }

    let r = service.city_index_at(City::Hangzhou, NINE_AM).unwrap();
    assert_eq!(r.available_points, 3);
    assert_eq!(r.er_total, Some(12.03));
    assert_eq!(r.aqhi, Some(2.2));
    assert_eq!(r.level, Some(Level::One));
    let avg = r.avg.expect("avg");
    assert!((avg.pm25 - 40.0).abs() < 1e-9);
    assert!((avg.so2 - 23.0 / 3.0).abs() < 1e-9);

    // an hour later the oldest row drops out of the window
    let next = service.city_index_at(City::Hangzhou, NINE_AM + HOUR_SECS).unwrap();
    assert_eq!(next.available_points, 2);
}

#[test]
fn all_indexes_follow_city_order() {
    let tmp = TempDir::new().expect("tempdir");
    let (service, store) = service_with(&tmp, Arc::new(OfflineSource));
    seed(&store, City::Zhoushan, NINE_AM, 20.0);

    let all = service.all_indexes_at(NINE_AM).unwrap();
    let cities: Vec<City> = all.iter().map(|r| r.city).collect();
    assert_eq!(cities, City::ALL.to_vec());
    for r in &all {
        assert_eq!(r.aqhi.is_some(), r.city == City::Zhoushan);
    }
}

#[test]
fn history_covers_requested_hours() {
    let tmp = TempDir::new().expect("tempdir");
    let (service, store) = service_with(&tmp, Arc::new(OfflineSource));
    for k in 0..6 {
        seed(&store, City::Jinhua, NINE_AM - k * HOUR_SECS, k as f64);
    }

    let h = service.history_at(City::Jinhua, 4, NINE_AM).unwrap();
    assert_eq!(h.series.len(), 4);
    assert_eq!(h.series[0].ts, "2025-03-01T06:00:00+08:00");
    assert_eq!(h.series[3].ts, "2025-03-01T09:00:00+08:00");
    assert_eq!(h.series[3].pm25, 0.0);

    assert!(service.history_at(City::Jinhua, 0, NINE_AM).is_err());
    assert!(service.history_at(City::Jinhua, 169, NINE_AM).is_err());
    assert_eq!(
        service.history_at(City::Jinhua, 168, NINE_AM).unwrap().series.len(),
        6
    );
}

#[test]
fn meta_reports_source_kind() {
    let tmp = TempDir::new().expect("tempdir");
    let (service, _store) = service_with(&tmp, Arc::new(MockSource::new()));
    let v = serde_json::to_value(service.meta()).unwrap();
    assert_eq!(v["data_source"], "mock");
    assert_eq!(v["window_hours"], 3);
    assert_eq!(v["cities"].as_array().unwrap().len(), 11);
}

#[test]
fn mock_deployment_never_answers_empty() {
    let tmp = TempDir::new().expect("tempdir");
    let (service, _store) = service_with(&tmp, Arc::new(MockSource::new()));

    let all = service.all_indexes().unwrap();
    assert!(all.iter().all(|r| r.aqhi.is_some() && r.available_points >= 1));
}

#[test]
fn rpc_ops_round_trip() {
    let tmp = TempDir::new().expect("tempdir");
    let (service, _store) = service_with(&tmp, Arc::new(MockSource::new()));

    let health = rpc::handle(&service, request("health", json!(null)));
    assert!(health.success);
    assert_eq!(health.id, "test");

    let one = rpc::handle(&service, request("aqhi", json!({"city": "湖州"})));
    assert!(one.success);
    let result = one.result.unwrap();
    assert_eq!(result["city"], "湖州");
    assert!(result["aqhi"].is_number());

    let history = rpc::handle(&service, request("history", json!({"city": "衢州", "hours": 6})));
    assert!(history.success);
    assert_eq!(history.result.unwrap()["series"].as_array().unwrap().len(), 1);

    let cities = rpc::handle(&service, request("cities", json!({})));
    assert_eq!(cities.result.unwrap().as_array().unwrap().len(), 11);
}

#[test]
fn rpc_errors_carry_http_status() {
    let tmp = TempDir::new().expect("tempdir");
    let (service, _store) = service_with(&tmp, Arc::new(OfflineSource));

    let unknown = rpc::handle(&service, request("reboot", json!({})));
    assert!(!unknown.success);
    let err = unknown.error.unwrap();
    assert_eq!(err.code, "unknown_op");
    assert_eq!(err.status, 404);

    let bad_city = rpc::handle(&service, request("aqhi", json!({"city": "北京"})));
    assert_eq!(bad_city.error.unwrap().status, 400);

    let bad_hours = rpc::handle(&service, request("history", json!({"city": "杭州", "hours": 500})));
    let err = bad_hours.error.unwrap();
    assert_eq!(err.status, 400);
    assert_eq!(err.code, "invalid_request");
}

#[test]
fn from_config_opens_store_at_configured_path() {
    let tmp = TempDir::new().expect("tempdir");
    let mut config = AppConfig::default();
    config.store.path = tmp.path().join("nested").join("aqhi.db");

    let service = Service::from_config(&config).unwrap();
    assert_eq!(service.meta().data_source, SourceKind::Mock);
    assert!(config.store.path.exists());
}
