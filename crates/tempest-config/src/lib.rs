//! Gateway configuration from a TOML file with defensive correction
//!
//! Out-of-range values are clamped with a logged warning rather than
//! rejected: a misconfigured gateway should come up with sane settings, not
//! refuse to start.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// History sizes below this are corrected upward at load time
pub const MIN_HISTORY_POINTS: usize = 10;
/// History sizes above this are corrected downward at load time
pub const MAX_HISTORY_POINTS: usize = 100_000;

const RECOGNIZED_REDUCE_METHODS: [&str; 3] = ["timebin", "factor", "lttb"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationSection {
    pub name: String,
    /// Station elevation above sea level (m), used for pressure normalization
    pub elevation_m: f64,
}

impl Default for StationSection {
    fn default() -> Self {
        Self {
            name: "station".to_string(),
            elevation_m: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    /// Observation source: "simulator", "udp", or "api"
    pub kind: String,
    /// Poll/emit interval in seconds
    pub interval_secs: u64,
    /// Bind address for the UDP broadcast listener
    pub udp_bind: String,
    /// Base URL of the cloud observation API
    pub api_base: String,
    /// API token; falls back to the TEMPEST_TOKEN environment variable
    pub api_token: String,
    pub station_id: u32,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            kind: "simulator".to_string(),
            interval_secs: 60,
            udp_bind: "0.0.0.0:50222".to_string(),
            api_base: "https://swd.weatherflow.com/swd/rest".to_string(),
            api_token: String::new(),
            station_id: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Observations retained in memory
    pub max_points: usize,
    /// Hours of history shown in charts (0 = all)
    pub chart_hours: u32,
    /// Reduction method: "timebin", "factor", or "lttb"
    pub reduce_method: String,
    /// Points averaged into one for the factor method
    pub reduce_factor: usize,
    /// Bin width in minutes for the timebin method
    pub bin_minutes: u32,
    /// Most recent window kept at full resolution when reducing
    pub keep_recent_hours: u32,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            max_points: 1000,
            chart_hours: 24,
            reduce_method: "timebin".to_string(),
            reduce_factor: 1,
            bin_minutes: 10,
            keep_recent_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub bind: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub station: StationSection,
    pub source: SourceSection,
    pub history: HistorySection,
    pub http: HttpSection,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayConfig {
    /// Load configuration from the TEMPEST_CONFIG path (TOML) if present,
    /// falling back to defaults, and correct out-of-range values.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("TEMPEST_CONFIG").unwrap_or_else(|_| "tempest.toml".to_string());
        Self::load_from(&path)
    }

    /// Load from an explicit path; a missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let cfg = if path.as_ref().exists() {
            let s = fs::read_to_string(path)?;
            toml::from_str::<GatewayConfig>(&s)?
        } else {
            GatewayConfig::default()
        };
        Ok(cfg.normalized())
    }

    /// Correct out-of-range values, warning about each change.
    pub fn normalized(mut self) -> Self {
        let requested = self.history.max_points;
        self.history.max_points = requested.clamp(MIN_HISTORY_POINTS, MAX_HISTORY_POINTS);
        if self.history.max_points != requested {
            tracing::warn!(
                requested,
                corrected = self.history.max_points,
                "history.max_points out of range, corrected"
            );
        }

        if self.history.reduce_factor == 0 {
            tracing::warn!("history.reduce_factor of 0 corrected to 1");
            self.history.reduce_factor = 1;
        }

        if self.history.bin_minutes == 0 {
            tracing::warn!("history.bin_minutes of 0 corrected to 10");
            self.history.bin_minutes = 10;
        }

        let method = self.history.reduce_method.to_ascii_lowercase();
        if RECOGNIZED_REDUCE_METHODS.contains(&method.as_str()) {
            self.history.reduce_method = method;
        } else {
            tracing::warn!(
                method = %self.history.reduce_method,
                "unknown history.reduce_method, using timebin"
            );
            self.history.reduce_method = "timebin".to_string();
        }

        self.source.kind = self.source.kind.to_ascii_lowercase();

        if self.source.api_token.is_empty() {
            if let Ok(token) = std::env::var("TEMPEST_TOKEN") {
                self.source.api_token = token;
            }
        }

        self
    }

    /// HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> &str {
        &self.http.bind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_bind_is_8080() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.http_bind(), "0.0.0.0:8080");
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = GatewayConfig::default().normalized();
        assert_eq!(cfg.history.max_points, 1000);
        assert_eq!(cfg.history.chart_hours, 24);
        assert_eq!(cfg.history.reduce_method, "timebin");
        assert_eq!(cfg.source.kind, "simulator");
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: GatewayConfig = toml::from_str(
            r#"
            [station]
            name = "backyard"
            elevation_m = 120.5

            [history]
            max_points = 5000
            reduce_method = "lttb"
        "#,
        )
        .unwrap();

        assert_eq!(cfg.station.name, "backyard");
        assert_eq!(cfg.station.elevation_m, 120.5);
        assert_eq!(cfg.history.max_points, 5000);
        assert_eq!(cfg.history.reduce_method, "lttb");
        // Untouched sections keep defaults
        assert_eq!(cfg.source.interval_secs, 60);
    }

    #[test]
    fn normalization_corrects_out_of_range_values() {
        let cfg: GatewayConfig = toml::from_str(
            r#"
            [history]
            max_points = 2
            reduce_factor = 0
            bin_minutes = 0
            reduce_method = "median"
        "#,
        )
        .unwrap();
        let cfg = cfg.normalized();

        assert_eq!(cfg.history.max_points, MIN_HISTORY_POINTS);
        assert_eq!(cfg.history.reduce_factor, 1);
        assert_eq!(cfg.history.bin_minutes, 10);
        assert_eq!(cfg.history.reduce_method, "timebin");
    }

    #[test]
    fn normalization_caps_large_history() {
        let cfg: GatewayConfig = toml::from_str("[history]\nmax_points = 9000000\n").unwrap();
        assert_eq!(cfg.normalized().history.max_points, MAX_HISTORY_POINTS);
    }

    #[test]
    fn load_from_reads_file_and_normalizes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[source]\nkind = \"UDP\"\n\n[history]\nmax_points = 3"
        )
        .unwrap();

        let cfg = GatewayConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.history.max_points, MIN_HISTORY_POINTS);
        assert_eq!(cfg.source.kind, "udp");
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let cfg = GatewayConfig::load_from("/nonexistent/tempest.toml").unwrap();
        assert_eq!(cfg.history.max_points, 1000);
    }
}
