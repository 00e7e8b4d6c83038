use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use tempest_config::GatewayConfig;
use tempest_core::{Observation, ObservationStore};

fn test_config() -> GatewayConfig {
    let mut cfg = GatewayConfig::default();
    cfg.station.name = "test-station".to_string();
    cfg.station.elevation_m = 0.0;
    // Chart window of 0 = no clipping, so fixed historical timestamps work
    cfg.history.chart_hours = 0;
    cfg
}

fn obs(ts: i64, temp: f64, pressure: f64, rain: f64) -> Observation {
    Observation {
        timestamp: ts,
        air_temperature: temp,
        relative_humidity: 60.0,
        station_pressure: pressure,
        rain_accumulated: rain,
        ..Observation::default()
    }
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, String) {
    let res = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn health_and_readiness() {
    let store = Arc::new(ObservationStore::new(1000));
    let (app, state) = tempest_web::build_app(store, &test_config());

    let (status, _) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    // Not ready until the daemon flips the flag
    let (status, _) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    tempest_web::set_ready(&state, true);
    let (status, _) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn weather_endpoint_reflects_store() {
    let store = Arc::new(ObservationStore::new(1000));
    let (app, state) = tempest_web::build_app(store, &test_config());

    // Empty store: graceful no-content, not an error
    let (status, _) = get(&app, "/api/weather").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    state.store().insert(obs(1_700_000_000, 20.0, 1010.0, 1.0));
    state.store().insert(obs(1_700_000_060, 20.5, 1010.2, 1.4));

    let (status, body) = get(&app, "/api/weather").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["temperature"], 20.5);
    // Elevation 0: sea-level pressure equals station pressure
    assert_eq!(json["sea_level_pressure"], json["pressure"]);
    assert_eq!(json["pressure_condition"], "Normal");
    assert_eq!(json["pressure_trend"], "Stable");
    // Counter rose 1.0 -> 1.4 between the two samples
    let incremental = json["rain_incremental"].as_f64().unwrap();
    assert!((incremental - 0.4).abs() < 1e-9);
    assert_eq!(json["observation_count"], 2);
    assert_eq!(json["unit_hints"]["rain"], "mm");
}

#[tokio::test]
async fn weather_latest_is_arrival_order() {
    let store = Arc::new(ObservationStore::new(1000));
    let (app, state) = tempest_web::build_app(store, &test_config());

    state.store().insert(obs(1_700_000_600, 22.0, 1008.0, 0.0));
    // Backfill arrives later with an older timestamp
    state.store().insert(obs(1_700_000_000, 10.0, 1004.0, 0.0));

    // The weather view reflects arrival order while the chronological
    // history (driving charts and trend) keeps the newer sample at its tail
    let (_, body) = get(&app, "/api/weather").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["temperature"], 10.0);

    let (_, body) = get(&app, "/api/history").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries[1]["timestamp"], 1_700_000_600);
    assert_eq!(entries[1]["air_temperature"], 22.0);
}

#[tokio::test]
async fn history_endpoint_returns_chronological_entries() {
    let store = Arc::new(ObservationStore::new(1000));
    let (app, state) = tempest_web::build_app(store, &test_config());

    let (status, body) = get(&app, "/api/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");

    // Inserted out of order; history must come back chronological with
    // clamped per-point incremental rain
    state.store().insert(obs(1_700_000_120, 21.0, 1010.0, 1.2));
    state.store().insert(obs(1_700_000_000, 20.0, 1010.0, 1.0));
    state.store().insert(obs(1_700_000_060, 20.5, 1010.0, 1.5));

    let (_, body) = get(&app, "/api/history").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["timestamp"], 1_700_000_000);
    assert_eq!(entries[2]["timestamp"], 1_700_000_120);

    // First entry has no predecessor; the counter drop at t=120 clamps to 0
    assert_eq!(entries[0]["rain_incremental"], 0.0);
    assert_eq!(entries[1]["rain_incremental"], 0.5);
    assert_eq!(entries[2]["rain_incremental"], 0.0);
}

#[tokio::test]
async fn chart_endpoint_reduces_series() {
    let store = Arc::new(ObservationStore::new(10_000));
    let (app, state) = tempest_web::build_app(store, &test_config());

    for i in 0..600i64 {
        state
            .store()
            .insert(obs(1_700_000_000 + i * 60, 15.0 + (i % 10) as f64, 1010.0, 0.0));
    }

    let (status, body) =
        get(&app, "/api/chart/temperature?method=factor&factor=10&keep_recent_hours=0").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["field"], "temperature");
    assert_eq!(json["raw_count"], 600);
    let points = json["points"].as_array().unwrap();
    assert_eq!(points.len(), 60);
    // Boundary timestamps match the raw series
    assert_eq!(points[0]["timestamp"], 1_700_000_000i64);
    assert_eq!(
        points[points.len() - 1]["timestamp"],
        1_700_000_000i64 + 599 * 60
    );
}

#[tokio::test]
async fn chart_endpoint_rejects_unknown_field() {
    let store = Arc::new(ObservationStore::new(1000));
    let (app, _state) = tempest_web::build_app(store, &test_config());

    let (status, _) = get(&app, "/api/chart/bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_endpoint_reports_counters() {
    let store = Arc::new(ObservationStore::new(1000));
    let (app, state) = tempest_web::build_app(store, &test_config());

    state.store().insert(obs(1_700_000_000, 20.0, 1010.0, 0.0));

    let (status, body) = get(&app, "/api/status").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["station"], "test-station");
    assert_eq!(json["observation_count"], 1);
    assert_eq!(json["max_history_size"], 1000);
    assert!(json["last_update"].as_str().unwrap().starts_with("2023-11-14T"));
}
