//! Cloud REST poller
//!
//! Polls the vendor's station observation endpoint on a fixed interval and
//! maps the provider's field names (`brightness`, `precip_accum_local_day`,
//! `lightning_strike_avg`) onto the canonical observation.

use crate::{IngestError, IngestResult, StationSource};
use serde::Deserialize;
use tempest_core::Observation;
use tokio::time::{sleep, Duration};

pub struct ApiSource {
    base_url: String,
    station_id: u32,
    token: String,
    interval: Duration,
    client: reqwest::Client,
    active: bool,
}

impl ApiSource {
    pub fn new(base_url: impl Into<String>, station_id: u32, token: impl Into<String>, interval_secs: u64) -> Self {
        Self {
            base_url: base_url.into(),
            station_id,
            token: token.into(),
            interval: Duration::from_secs(interval_secs),
            client: reqwest::Client::new(),
            active: false,
        }
    }

    async fn fetch_latest(&self) -> IngestResult<Observation> {
        let url = format!(
            "{}/observations/station/{}?token={}",
            self.base_url, self.station_id, self.token
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::CommunicationError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IngestError::CommunicationError(format!(
                "station observation request returned HTTP {}",
                response.status()
            )));
        }

        let body: ObservationResponse = response
            .json()
            .await
            .map_err(|e| IngestError::InvalidObservation(e.to_string()))?;

        body.obs
            .into_iter()
            .next()
            .map(Observation::from)
            .ok_or_else(|| IngestError::InvalidObservation("empty observation list".into()))
    }
}

#[async_trait::async_trait]
impl StationSource for ApiSource {
    fn name(&self) -> &str {
        "api-poller"
    }

    async fn start(&mut self) -> IngestResult<()> {
        if self.active {
            return Err(IngestError::SourceError("already started".into()));
        }
        self.active = true;
        tracing::info!(
            station = self.station_id,
            interval_secs = self.interval.as_secs(),
            "api poller started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> IngestResult<()> {
        self.active = false;
        Ok(())
    }

    async fn next_observation(&mut self) -> IngestResult<Observation> {
        if !self.active {
            return Err(IngestError::SourceError("not active".into()));
        }

        sleep(self.interval).await;
        self.fetch_latest().await
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Deserialize)]
struct ObservationResponse {
    #[serde(default)]
    obs: Vec<RawObservation>,
}

/// Provider-side observation record. Missing fields default to zero so a
/// partial record still produces a usable observation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawObservation {
    timestamp: i64,
    air_temperature: f64,
    relative_humidity: f64,
    wind_avg: f64,
    wind_gust: f64,
    wind_direction: f64,
    station_pressure: f64,
    /// The provider calls illuminance "brightness"
    brightness: f64,
    uv: f64,
    solar_radiation: f64,
    /// Cumulative rain since local midnight (mm)
    precip_accum_local_day: f64,
    precipitation_type: i64,
    lightning_strike_avg: f64,
    lightning_strike_count: i64,
    battery: f64,
    report_interval: i64,
}

impl From<RawObservation> for Observation {
    fn from(raw: RawObservation) -> Self {
        Observation {
            timestamp: raw.timestamp,
            air_temperature: raw.air_temperature,
            relative_humidity: raw.relative_humidity,
            wind_avg: raw.wind_avg,
            wind_gust: raw.wind_gust,
            wind_direction: raw.wind_direction,
            station_pressure: raw.station_pressure,
            illuminance: raw.brightness,
            uv: raw.uv.round() as i32,
            solar_radiation: raw.solar_radiation,
            rain_accumulated: raw.precip_accum_local_day,
            precipitation_type: raw.precipitation_type.into(),
            lightning_strike_avg_distance: raw.lightning_strike_avg,
            lightning_strike_count: raw.lightning_strike_count as i32,
            battery: raw.battery,
            report_interval: raw.report_interval as i32,
        }
    }
}
