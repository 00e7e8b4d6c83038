//! Core data types for station observations

use serde::{Deserialize, Serialize};

/// Timestamp type (Unix epoch seconds)
pub type Timestamp = i64;

/// Precipitation classification reported by the station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum PrecipitationType {
    #[default]
    None,
    Rain,
    Hail,
    RainPlusHail,
}

impl From<i64> for PrecipitationType {
    fn from(code: i64) -> Self {
        match code {
            1 => PrecipitationType::Rain,
            2 => PrecipitationType::Hail,
            3 => PrecipitationType::RainPlusHail,
            _ => PrecipitationType::None,
        }
    }
}

impl From<PrecipitationType> for i64 {
    fn from(kind: PrecipitationType) -> Self {
        match kind {
            PrecipitationType::None => 0,
            PrecipitationType::Rain => 1,
            PrecipitationType::Hail => 2,
            PrecipitationType::RainPlusHail => 3,
        }
    }
}

/// One sensor reading at one instant, in canonical units.
///
/// Producers are responsible for unit normalization: temperatures arrive in
/// °C, pressures in millibars, rain counters in cumulative millimeters since
/// local midnight, wind in the station's native speed unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Unix timestamp of the reading
    pub timestamp: Timestamp,

    /// Air temperature (°C)
    pub air_temperature: f64,

    /// Relative humidity (%)
    pub relative_humidity: f64,

    /// Average wind speed over the report interval
    pub wind_avg: f64,

    /// Peak gust over the report interval
    pub wind_gust: f64,

    /// Wind direction (degrees)
    pub wind_direction: f64,

    /// Station pressure (mb), not normalized to sea level
    pub station_pressure: f64,

    /// Illuminance (lux)
    pub illuminance: f64,

    /// UV index
    pub uv: i32,

    /// Solar radiation (W/m²)
    pub solar_radiation: f64,

    /// Cumulative rain since local midnight (mm). This is a raw sensor
    /// counter: it can reset on day rollover or station reboot, so derived
    /// deltas must be clamped rather than trusted.
    pub rain_accumulated: f64,

    pub precipitation_type: PrecipitationType,

    /// Average lightning strike distance (km)
    pub lightning_strike_avg_distance: f64,

    pub lightning_strike_count: i32,

    /// Battery voltage
    pub battery: f64,

    /// Station report interval (seconds)
    pub report_interval: i32,
}

impl Observation {
    /// Minimal observation for a given instant, remaining fields zeroed.
    pub fn at(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }
}
