//! Pure meteorological computations over observation snapshots
//!
//! Everything in this module is stateless and reproducible: the same inputs
//! always produce the same outputs. Sparse or implausible inputs resolve to
//! documented neutral defaults (`Stable`, zero rain) instead of errors, so
//! consumers render placeholders rather than failures.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::types::Observation;

/// Standard atmosphere lapse rate (K/m)
const LAPSE_RATE_K_PER_M: f64 = 0.0065;

/// Exponent g·M/(R·L) of the barometric formula
const BAROMETRIC_EXPONENT: f64 = 5.257;

/// Pressure below this is classified Low (mb)
const PRESSURE_LOW_MB: f64 = 980.0;

/// Pressure above this is classified High (mb)
const PRESSURE_HIGH_MB: f64 = 1020.0;

/// Samples considered for trend analysis: roughly the last hour at the
/// station's one-per-minute cadence
const TREND_WINDOW_SAMPLES: usize = 60;

/// Sea-level delta (mb) required before a trend counts as rising/falling
const TREND_THRESHOLD_MB: f64 = 1.0;

/// A single reading can stand in for the daily total only below this (10 in)
const DAILY_RAIN_SINGLE_SAMPLE_MAX_MM: f64 = 254.0;

/// Daily totals above this are implausible and reported as zero (20 in)
const DAILY_RAIN_MAX_MM: f64 = 508.0;

/// Coarse pressure classification for dashboard display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PressureCondition {
    Low,
    Normal,
    High,
}

/// Direction of the sea-level pressure over the trend window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PressureTrend {
    Rising,
    Falling,
    Stable,
}

/// Table-driven short-range outlook from pressure plus trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WeatherOutlook {
    #[serde(rename = "Fair Weather")]
    FairWeather,
    #[serde(rename = "Storm Clearing")]
    StormClearing,
    Stormy,
    Unsettled,
    #[serde(rename = "Change Coming")]
    ChangeComing,
    Settled,
}

impl std::fmt::Display for PressureCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PressureCondition::Low => "Low",
            PressureCondition::Normal => "Normal",
            PressureCondition::High => "High",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for PressureTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PressureTrend::Rising => "Rising",
            PressureTrend::Falling => "Falling",
            PressureTrend::Stable => "Stable",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for WeatherOutlook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WeatherOutlook::FairWeather => "Fair Weather",
            WeatherOutlook::StormClearing => "Storm Clearing",
            WeatherOutlook::Stormy => "Stormy",
            WeatherOutlook::Unsettled => "Unsettled",
            WeatherOutlook::ChangeComing => "Change Coming",
            WeatherOutlook::Settled => "Settled",
        };
        f.write_str(s)
    }
}

/// Normalize station pressure to sea level with the barometric formula.
///
/// Stations at different elevations must be comparable before trend and
/// forecast classification. At `elevation_m = 0` the result equals the
/// station pressure exactly.
pub fn sea_level_pressure(station_pressure_mb: f64, temperature_c: f64, elevation_m: f64) -> f64 {
    let temp_k = temperature_c + 273.15;
    let factor = (LAPSE_RATE_K_PER_M * elevation_m) / (temp_k + LAPSE_RATE_K_PER_M * elevation_m);
    station_pressure_mb * (1.0 - factor).powf(-BAROMETRIC_EXPONENT)
}

pub fn pressure_condition(pressure_mb: f64) -> PressureCondition {
    if pressure_mb < PRESSURE_LOW_MB {
        PressureCondition::Low
    } else if pressure_mb > PRESSURE_HIGH_MB {
        PressureCondition::High
    } else {
        PressureCondition::Normal
    }
}

/// Classify the pressure trend over the most recent samples of a
/// chronologically ascending history.
///
/// Each sample is normalized to sea level before comparison; the newest is
/// compared against the oldest in the window. Fewer than two samples is
/// `Stable` by definition.
pub fn pressure_trend(history: &[Observation], elevation_m: f64) -> PressureTrend {
    if history.len() < 2 {
        return PressureTrend::Stable;
    }

    let window = &history[history.len().saturating_sub(TREND_WINDOW_SAMPLES)..];
    let first = window.first().map(|o| {
        sea_level_pressure(o.station_pressure, o.air_temperature, elevation_m)
    });
    let last = window.last().map(|o| {
        sea_level_pressure(o.station_pressure, o.air_temperature, elevation_m)
    });

    match (first, last) {
        (Some(oldest), Some(newest)) => {
            let delta = newest - oldest;
            if delta > TREND_THRESHOLD_MB {
                PressureTrend::Rising
            } else if delta < -TREND_THRESHOLD_MB {
                PressureTrend::Falling
            } else {
                PressureTrend::Stable
            }
        }
        _ => PressureTrend::Stable,
    }
}

pub fn weather_forecast(pressure_mb: f64, trend: PressureTrend) -> WeatherOutlook {
    match trend {
        PressureTrend::Rising => {
            if pressure_mb > 1013.0 {
                WeatherOutlook::FairWeather
            } else {
                WeatherOutlook::StormClearing
            }
        }
        PressureTrend::Falling => {
            if pressure_mb < 1000.0 {
                WeatherOutlook::Stormy
            } else if pressure_mb < 1013.0 {
                WeatherOutlook::Unsettled
            } else {
                WeatherOutlook::ChangeComing
            }
        }
        PressureTrend::Stable => {
            if pressure_mb > PRESSURE_HIGH_MB {
                WeatherOutlook::FairWeather
            } else if pressure_mb < 1000.0 {
                WeatherOutlook::Stormy
            } else {
                WeatherOutlook::Settled
            }
        }
    }
}

/// Rain that fell between `previous` and `current`, in mm.
///
/// The raw counter can decrease on day rollover, station reboot, or when the
/// upstream API hands back historical blocks out of order, so the delta is
/// clamped to zero instead of trusted. The first sample of a series has no
/// predecessor and yields zero.
pub fn incremental_rain(current: &Observation, previous: Option<&Observation>) -> f64 {
    match previous {
        Some(prev) => (current.rain_accumulated - prev.rain_accumulated).max(0.0),
        None => 0.0,
    }
}

/// Total rain between local midnight and `target`, in mm.
///
/// Works over a chronologically ascending history. Zero samples in the
/// window yield zero; a single sample stands in for the total only when it
/// passes the single-sample sanity bound; otherwise the window delta is used
/// and clamped to a plausible daily range, falling back to zero when the
/// counter behaved implausibly.
pub fn daily_rain_total<Tz: TimeZone>(history: &[Observation], target: DateTime<Tz>) -> f64 {
    let day_start = target
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| target.timezone().from_local_datetime(&naive).earliest());

    let Some(day_start) = day_start else {
        return 0.0;
    };

    let start_ts = day_start.timestamp();
    let end_ts = target.timestamp();

    let day: Vec<&Observation> = history
        .iter()
        .filter(|o| o.timestamp >= start_ts && o.timestamp <= end_ts)
        .collect();

    match day.as_slice() {
        [] => 0.0,
        [only] => {
            let value = only.rain_accumulated;
            if value <= DAILY_RAIN_SINGLE_SAMPLE_MAX_MM {
                value.max(0.0)
            } else {
                0.0
            }
        }
        [earliest, .., latest] => {
            let total = latest.rain_accumulated - earliest.rain_accumulated;
            if (0.0..=DAILY_RAIN_MAX_MM).contains(&total) {
                total
            } else {
                0.0
            }
        }
    }
}
