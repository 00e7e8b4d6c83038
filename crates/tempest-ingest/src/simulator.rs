//! Synthetic weather source for running without station hardware

use crate::{IngestError, IngestResult, StationSource};
use chrono::{DateTime, Datelike, Local, Timelike};
use std::f64::consts::TAU;
use tempest_core::{Observation, PrecipitationType};
use tokio::time::{sleep, Duration};

/// Generates plausible diurnal weather curves: temperature and light follow
/// the hour of day, pressure drifts slowly, and a cumulative rain counter
/// resets at local midnight like the real station's does.
pub struct SimulatorSource {
    interval_secs: u64,
    active: bool,
    base_temp: f64,
    base_pressure: f64,
    rain_counter_mm: f64,
    rain_day: Option<i32>,
}

impl SimulatorSource {
    /// Create a new simulator emitting every `interval_secs` seconds
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval_secs,
            active: false,
            base_temp: 18.0,
            base_pressure: 1013.25,
            rain_counter_mm: 0.0,
            rain_day: None,
        }
    }

    fn generate_at(&mut self, now: DateTime<Local>) -> Observation {
        let ts = now.timestamp();
        // Fraction of the local day elapsed, for the diurnal curves
        let day_frac = f64::from(now.num_seconds_from_midnight()) / 86_400.0;
        // Small deterministic jitter so consecutive readings differ
        let jitter = ((ts % 97) as f64 / 97.0) - 0.5;

        // Warmest mid-afternoon, coldest before dawn
        let temp = self.base_temp + 6.0 * (TAU * (day_frac - 0.3)).sin() + jitter;
        let humidity = (65.0 - (temp - self.base_temp) * 2.5 + jitter * 4.0).clamp(20.0, 95.0);
        let pressure = self.base_pressure + 3.0 * (TAU * ts as f64 / 259_200.0).sin() + jitter * 0.4;

        let wind_avg = 2.5 + 2.0 * (TAU * day_frac).sin().abs() + jitter.abs();
        let wind_gust = wind_avg * 1.6;
        let wind_direction = (ts % 360) as f64;

        // Sunlight peaks at solar noon, zero at night
        let sun = (TAU / 2.0 * ((day_frac - 0.25) * 2.0).clamp(0.0, 1.0)).sin().max(0.0);
        let illuminance = 90_000.0 * sun;
        let solar_radiation = 820.0 * sun;
        let uv = (9.0 * sun).round() as i32;

        // Reset the cumulative counter at local midnight, matching the
        // station's precip_accum_local_day behavior
        let today = now.num_days_from_ce();
        if self.rain_day != Some(today) {
            self.rain_day = Some(today);
            self.rain_counter_mm = 0.0;
        }

        // Deterministic light drizzle roughly once per half hour
        let raining = (ts / 60) % 30 == 0;
        if raining {
            self.rain_counter_mm += 0.2;
        }

        Observation {
            timestamp: ts,
            air_temperature: temp,
            relative_humidity: humidity,
            wind_avg,
            wind_gust,
            wind_direction,
            station_pressure: pressure,
            illuminance,
            uv,
            solar_radiation,
            rain_accumulated: self.rain_counter_mm,
            precipitation_type: if raining {
                PrecipitationType::Rain
            } else {
                PrecipitationType::None
            },
            lightning_strike_avg_distance: 0.0,
            lightning_strike_count: 0,
            battery: 2.68 + jitter * 0.02,
            report_interval: self.interval_secs as i32,
        }
    }
}

#[async_trait::async_trait]
impl StationSource for SimulatorSource {
    fn name(&self) -> &str {
        "simulator"
    }

    async fn start(&mut self) -> IngestResult<()> {
        if self.active {
            return Err(IngestError::SourceError("source already started".to_string()));
        }
        self.active = true;
        tracing::info!(interval = self.interval_secs, "simulator source started");
        Ok(())
    }

    async fn stop(&mut self) -> IngestResult<()> {
        if !self.active {
            return Err(IngestError::SourceError("source not started".to_string()));
        }
        self.active = false;
        tracing::info!("simulator source stopped");
        Ok(())
    }

    async fn next_observation(&mut self) -> IngestResult<Observation> {
        if !self.active {
            return Err(IngestError::SourceError("source not active".to_string()));
        }

        sleep(Duration::from_secs(self.interval_secs)).await;

        Ok(self.generate_at(Local::now()))
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_simulator_lifecycle() {
        let mut source = SimulatorSource::new(1);

        assert!(!source.is_active());

        source.start().await.unwrap();
        assert!(source.is_active());

        // Starting twice should fail
        assert!(source.start().await.is_err());

        source.stop().await.unwrap();
        assert!(!source.is_active());
    }

    #[test]
    fn test_generated_fields_are_plausible() {
        let mut source = SimulatorSource::new(60);
        let noon = Local.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap();

        let obs = source.generate_at(noon);

        assert_eq!(obs.timestamp, noon.timestamp());
        assert!((-20.0..=45.0).contains(&obs.air_temperature));
        assert!((20.0..=95.0).contains(&obs.relative_humidity));
        assert!((990.0..=1040.0).contains(&obs.station_pressure));
        assert!(obs.wind_gust >= obs.wind_avg);
        assert!(obs.illuminance > 0.0, "daylight expected at noon");
        assert_eq!(obs.report_interval, 60);
    }

    #[test]
    fn test_rain_counter_monotone_within_day() {
        let mut source = SimulatorSource::new(60);
        let start = Local.with_ymd_and_hms(2026, 6, 15, 8, 0, 0).unwrap();

        let mut previous = 0.0;
        for minute in 0..120 {
            let obs = source.generate_at(start + chrono::Duration::minutes(minute));
            assert!(obs.rain_accumulated >= previous);
            previous = obs.rain_accumulated;
        }
        assert!(previous > 0.0, "two hours should include some drizzle");
    }

    #[test]
    fn test_rain_counter_resets_at_midnight() {
        let mut source = SimulatorSource::new(60);
        let evening = Local.with_ymd_and_hms(2026, 6, 15, 20, 0, 0).unwrap();

        let mut last_evening = 0.0;
        for minute in 0..240 {
            last_evening = source
                .generate_at(evening + chrono::Duration::minutes(minute))
                .rain_accumulated;
        }
        assert!(last_evening > 0.0);

        let next_morning = Local.with_ymd_and_hms(2026, 6, 16, 0, 30, 0).unwrap();
        let obs = source.generate_at(next_morning);
        assert!(obs.rain_accumulated < last_evening);
    }
}
