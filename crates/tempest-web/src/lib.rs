//! HTTP surface exposing the observation store to the dashboard and the
//! alerting engine
//!
//! All handlers read a private snapshot and compute derived values outside
//! the store's lock. An empty store produces empty-but-valid responses (204
//! or empty arrays), never hard errors.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use tempest_config::{GatewayConfig, HistorySection};
use tempest_core::{
    daily_rain_total, incremental_rain, pressure_condition, pressure_trend, reduce_series,
    sea_level_pressure, series_for_field, weather_forecast, ChartField, Observation,
    ObservationStore, PrecipitationType, PressureCondition, PressureTrend, ReductionPolicy,
    SeriesPoint, WeatherOutlook,
};

pub struct AppState {
    ready: AtomicBool,
    store: Arc<ObservationStore>,
    station_name: String,
    elevation_m: f64,
    chart_hours: u32,
    history_defaults: HistorySection,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn store(&self) -> &Arc<ObservationStore> {
        &self.store
    }
}

pub fn build_app(store: Arc<ObservationStore>, cfg: &GatewayConfig) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        store,
        station_name: cfg.station.name.clone(),
        elevation_m: cfg.station.elevation_m,
        chart_hours: cfg.history.chart_hours,
        history_defaults: cfg.history.clone(),
        started_at: Utc::now(),
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/weather", get(weather))
        .route("/api/history", get(history))
        .route("/api/chart/:field", get(chart))
        .route("/api/status", get(status))
        .with_state(Arc::clone(&state));

    (router, state)
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Units of the numeric fields in [`WeatherReport`], so clients can perform
/// deterministic conversions for display.
#[derive(Debug, Serialize)]
struct UnitHints {
    temperature: &'static str,
    pressure: &'static str,
    wind: &'static str,
    rain: &'static str,
}

const CANONICAL_UNITS: UnitHints = UnitHints {
    temperature: "celsius",
    pressure: "mb",
    wind: "native",
    rain: "mm",
};

#[derive(Debug, Serialize)]
struct WeatherReport {
    temperature: f64,
    humidity: f64,
    wind_speed: f64,
    wind_gust: f64,
    wind_direction: f64,
    pressure: f64,
    sea_level_pressure: f64,
    pressure_condition: PressureCondition,
    pressure_trend: PressureTrend,
    weather_forecast: WeatherOutlook,
    rain_incremental: f64,
    rain_daily_total: f64,
    precipitation_type: PrecipitationType,
    illuminance: f64,
    uv: i32,
    solar_radiation: f64,
    lightning_strike_avg_distance: f64,
    lightning_strike_count: i32,
    battery: f64,
    last_update: String,
    observation_count: usize,
    max_history_size: usize,
    unit_hints: UnitHints,
}

async fn weather(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(latest) = state.store.latest() else {
        tracing::debug!("weather requested while store is empty");
        return StatusCode::NO_CONTENT.into_response();
    };
    let snapshot = state.store.snapshot();

    // Derived analytics run on the private snapshot, outside the store lock
    let slp = sea_level_pressure(
        latest.station_pressure,
        latest.air_temperature,
        state.elevation_m,
    );
    let condition = pressure_condition(slp);
    let trend = pressure_trend(&snapshot, state.elevation_m);
    let forecast = weather_forecast(slp, trend);

    let previous = snapshot
        .iter()
        .rev()
        .find(|o| o.timestamp < latest.timestamp);
    let rain_incremental = incremental_rain(&latest, previous);
    let rain_daily_total = daily_rain_total(&snapshot, Local::now());

    let report = WeatherReport {
        temperature: latest.air_temperature,
        humidity: latest.relative_humidity,
        wind_speed: latest.wind_avg,
        wind_gust: latest.wind_gust,
        wind_direction: latest.wind_direction,
        pressure: latest.station_pressure,
        sea_level_pressure: slp,
        pressure_condition: condition,
        pressure_trend: trend,
        weather_forecast: forecast,
        rain_incremental,
        rain_daily_total,
        precipitation_type: latest.precipitation_type,
        illuminance: latest.illuminance,
        uv: latest.uv,
        solar_radiation: latest.solar_radiation,
        lightning_strike_avg_distance: latest.lightning_strike_avg_distance,
        lightning_strike_count: latest.lightning_strike_count,
        battery: latest.battery,
        last_update: rfc3339(latest.timestamp),
        observation_count: snapshot.len(),
        max_history_size: state.store.capacity(),
        unit_hints: CANONICAL_UNITS,
    };

    (StatusCode::OK, Json(report)).into_response()
}

#[derive(Deserialize)]
struct HistoryQuery {
    /// Hours of history to return; 0 means everything retained
    hours: Option<u32>,
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    #[serde(flatten)]
    observation: Observation,
    /// Rain since the previous observation in series order (mm)
    rain_incremental: f64,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> impl IntoResponse {
    let snapshot = state.store.snapshot();
    let windowed = clip_to_hours(&snapshot, q.hours.unwrap_or(state.chart_hours));

    let mut entries = Vec::with_capacity(windowed.len());
    for (i, obs) in windowed.iter().enumerate() {
        let previous = if i > 0 { Some(&windowed[i - 1]) } else { None };
        entries.push(HistoryEntry {
            observation: obs.clone(),
            rain_incremental: incremental_rain(obs, previous),
        });
    }

    (StatusCode::OK, Json(entries))
}

#[derive(Deserialize)]
struct ChartQuery {
    hours: Option<u32>,
    method: Option<String>,
    factor: Option<usize>,
    bin_minutes: Option<u32>,
    target: Option<usize>,
    keep_recent_hours: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChartResponse {
    field: ChartField,
    raw_count: usize,
    points: Vec<SeriesPoint>,
}

async fn chart(
    State(state): State<Arc<AppState>>,
    Path(field): Path<ChartField>,
    Query(q): Query<ChartQuery>,
) -> impl IntoResponse {
    let defaults = &state.history_defaults;
    let policy = ReductionPolicy::from_options(
        q.method.as_deref().unwrap_or(&defaults.reduce_method),
        q.factor.unwrap_or(defaults.reduce_factor),
        q.bin_minutes.unwrap_or(defaults.bin_minutes),
        q.target,
        q.keep_recent_hours.unwrap_or(defaults.keep_recent_hours),
    );

    let snapshot = state.store.snapshot();
    let windowed = clip_to_hours(&snapshot, q.hours.unwrap_or(state.chart_hours));
    let series = series_for_field(&windowed, field);
    let points = reduce_series(&series, &policy, Utc::now().timestamp());

    tracing::debug!(
        field = ?field,
        raw = series.len(),
        reduced = points.len(),
        "chart series reduced"
    );

    (
        StatusCode::OK,
        Json(ChartResponse {
            field,
            raw_count: series.len(),
            points,
        }),
    )
}

#[derive(Debug, Serialize)]
struct StatusReport {
    station: String,
    ready: bool,
    uptime: String,
    observation_count: usize,
    max_history_size: usize,
    last_update: Option<String>,
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = Utc::now() - state.started_at;
    let secs = uptime.num_seconds().max(0);
    let uptime = format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60);

    let report = StatusReport {
        station: state.station_name.clone(),
        ready: state.ready.load(Ordering::Relaxed),
        uptime,
        observation_count: state.store.len(),
        max_history_size: state.store.capacity(),
        last_update: state.store.latest().map(|o| rfc3339(o.timestamp)),
    };

    (StatusCode::OK, Json(report))
}

fn rfc3339(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

fn clip_to_hours(snapshot: &[Observation], hours: u32) -> Vec<Observation> {
    if hours == 0 {
        return snapshot.to_vec();
    }
    let cutoff = Utc::now().timestamp() - i64::from(hours) * 3600;
    snapshot
        .iter()
        .filter(|o| o.timestamp >= cutoff)
        .cloned()
        .collect()
}
