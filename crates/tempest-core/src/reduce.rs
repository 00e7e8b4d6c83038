//! History reduction for chart rendering
//!
//! Compresses a per-field time series into a much smaller one without
//! degrading its visual shape. Three interchangeable strategies sit behind
//! the [`ReductionStrategy`] contract; a recency carve-out keeps the newest
//! window at full resolution regardless of strategy.

use serde::{Deserialize, Serialize};

use crate::types::{Observation, Timestamp};

/// Bin width used when a timebin policy arrives with zero minutes
pub const DEFAULT_BIN_MINUTES: u32 = 10;

/// Default full-resolution window appended after the reduced portion
pub const DEFAULT_KEEP_RECENT_HOURS: u32 = 24;

/// Default LTTB output size when the caller does not specify one
pub const DEFAULT_LTTB_TARGET: usize = 500;

/// One (timestamp, value) sample of a single numeric field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: Timestamp,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Downsampling strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceMethod {
    /// Average every N consecutive points into one
    Factor(usize),
    /// Average points sharing a fixed wall-clock bin
    TimeBin { minutes: u32 },
    /// Largest-Triangle-Three-Buckets shape-preserving selection
    Lttb { target: usize },
}

/// How a history should be reduced for charting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReductionPolicy {
    pub method: ReduceMethod,
    /// Points newer than `now - keep_recent_hours` bypass reduction
    pub keep_recent_hours: u32,
}

impl Default for ReductionPolicy {
    fn default() -> Self {
        Self {
            method: ReduceMethod::TimeBin {
                minutes: DEFAULT_BIN_MINUTES,
            },
            keep_recent_hours: DEFAULT_KEEP_RECENT_HOURS,
        }
    }
}

impl ReductionPolicy {
    /// Build a policy from loosely validated configuration values.
    ///
    /// Unrecognized method names are corrected to the timebin default with a
    /// logged warning rather than rejected.
    pub fn from_options(
        method: &str,
        factor: usize,
        bin_minutes: u32,
        lttb_target: Option<usize>,
        keep_recent_hours: u32,
    ) -> Self {
        let method = match method.to_ascii_lowercase().as_str() {
            "factor" => ReduceMethod::Factor(factor.max(1)),
            "timebin" => ReduceMethod::TimeBin {
                minutes: if bin_minutes == 0 {
                    DEFAULT_BIN_MINUTES
                } else {
                    bin_minutes
                },
            },
            "lttb" => ReduceMethod::Lttb {
                target: lttb_target.unwrap_or(DEFAULT_LTTB_TARGET).max(3),
            },
            other => {
                tracing::warn!(
                    method = other,
                    "unknown history reduce method, using timebin"
                );
                ReduceMethod::TimeBin {
                    minutes: if bin_minutes == 0 {
                        DEFAULT_BIN_MINUTES
                    } else {
                        bin_minutes
                    },
                }
            }
        };

        Self {
            method,
            keep_recent_hours,
        }
    }
}

/// Contract shared by all downsampling strategies.
///
/// Input is ascending by timestamp; output must be ascending, no longer than
/// the input, and deterministic for identical input.
pub trait ReductionStrategy {
    fn reduce(&self, points: &[SeriesPoint]) -> Vec<SeriesPoint>;
}

impl ReduceMethod {
    fn apply(&self, points: &[SeriesPoint]) -> Vec<SeriesPoint> {
        match self {
            ReduceMethod::Factor(n) => FactorReducer(*n).reduce(points),
            ReduceMethod::TimeBin { minutes } => TimeBinReducer::new(*minutes).reduce(points),
            ReduceMethod::Lttb { target } => LttbReducer { target: *target }.reduce(points),
        }
    }
}

/// Fixed-count window averaging: one output point per `N` consecutive inputs
pub struct FactorReducer(pub usize);

impl ReductionStrategy for FactorReducer {
    fn reduce(&self, points: &[SeriesPoint]) -> Vec<SeriesPoint> {
        let n = self.0;
        if n <= 1 || points.len() <= 1 {
            return points.to_vec();
        }

        let mut out = Vec::with_capacity(points.len() / n + 1);
        for window in points.chunks(n) {
            let Some(anchor) = window.last() else {
                continue;
            };
            if let Some(mean) = mean_of_finite(window) {
                out.push(SeriesPoint::new(anchor.timestamp, mean));
            }
        }
        out
    }
}

/// Wall-clock binning: one averaged point per non-empty bin, anchored at the
/// bin start so chart timestamps stay grid-aligned regardless of sampling
/// irregularities
pub struct TimeBinReducer {
    bin_secs: i64,
}

impl TimeBinReducer {
    pub fn new(minutes: u32) -> Self {
        let minutes = if minutes == 0 {
            DEFAULT_BIN_MINUTES
        } else {
            minutes
        };
        Self {
            bin_secs: i64::from(minutes) * 60,
        }
    }
}

impl ReductionStrategy for TimeBinReducer {
    fn reduce(&self, points: &[SeriesPoint]) -> Vec<SeriesPoint> {
        let mut out = Vec::new();
        let mut bin: Option<i64> = None;
        let mut sum = 0.0;
        let mut count = 0usize;

        for p in points {
            let key = p.timestamp.div_euclid(self.bin_secs);

            if bin != Some(key) {
                if let (Some(prev), true) = (bin, count > 0) {
                    out.push(SeriesPoint::new(prev * self.bin_secs, sum / count as f64));
                }
                bin = Some(key);
                sum = 0.0;
                count = 0;
            }

            if p.value.is_finite() {
                sum += p.value;
                count += 1;
            }
        }

        if let (Some(prev), true) = (bin, count > 0) {
            out.push(SeriesPoint::new(prev * self.bin_secs, sum / count as f64));
        }

        out
    }
}

/// Largest-Triangle-Three-Buckets: always retains the first and last point,
/// then keeps the most visually significant point of each interior bucket
pub struct LttbReducer {
    pub target: usize,
}

impl ReductionStrategy for LttbReducer {
    fn reduce(&self, points: &[SeriesPoint]) -> Vec<SeriesPoint> {
        let n = points.len();
        let target = self.target.max(3);
        if n <= target {
            return points.to_vec();
        }

        let bucket_size = (n - 2) as f64 / (target - 2) as f64;
        let mut out = Vec::with_capacity(target);
        out.push(points[0]);

        let mut selected = 0usize;
        for bucket in 0..(target - 2) {
            let range_start = (bucket as f64 * bucket_size) as usize + 1;
            let range_end = (((bucket + 1) as f64 * bucket_size) as usize + 1).min(n - 1);
            if range_start >= range_end {
                continue;
            }

            // Centroid of the following bucket; the final point stands in
            // once the next bucket would be empty.
            let avg_start = range_end;
            let avg_end = (((bucket + 2) as f64 * bucket_size) as usize + 1).min(n);
            let (avg_t, avg_v) = if avg_start < avg_end {
                let len = (avg_end - avg_start) as f64;
                let mut t_sum = 0.0;
                let mut v_sum = 0.0;
                for p in &points[avg_start..avg_end] {
                    t_sum += p.timestamp as f64;
                    v_sum += p.value;
                }
                (t_sum / len, v_sum / len)
            } else {
                (points[n - 1].timestamp as f64, points[n - 1].value)
            };

            let anchor = points[selected];
            let anchor_t = anchor.timestamp as f64;
            let mut best_idx = range_start;
            let mut best_area = -1.0_f64;
            for (idx, p) in points[range_start..range_end].iter().enumerate() {
                let area = ((anchor_t - avg_t) * (p.value - anchor.value)
                    - (anchor_t - p.timestamp as f64) * (avg_v - anchor.value))
                    .abs();
                if area > best_area {
                    best_area = area;
                    best_idx = range_start + idx;
                }
            }

            out.push(points[best_idx]);
            selected = best_idx;
        }

        out.push(points[n - 1]);
        out
    }
}

fn mean_of_finite(points: &[SeriesPoint]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for p in points {
        if p.value.is_finite() {
            sum += p.value;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f64)
}

/// Reduce an ascending series under `policy`.
///
/// Points within the `keep_recent_hours` window before `now` bypass the
/// strategy entirely and are appended, without timestamp duplication, after
/// the reduced older portion. The output always spans the input's first and
/// last timestamps (boundary points may be re-stamped to guarantee it) and
/// is never longer than the input.
pub fn reduce_series(
    points: &[SeriesPoint],
    policy: &ReductionPolicy,
    now: Timestamp,
) -> Vec<SeriesPoint> {
    if points.is_empty() {
        return Vec::new();
    }

    let (older, recent) = if policy.keep_recent_hours > 0 {
        let cutoff = now - i64::from(policy.keep_recent_hours) * 3600;
        let split = points.partition_point(|p| p.timestamp < cutoff);
        (&points[..split], &points[split..])
    } else {
        (points, &points[points.len()..])
    };

    let mut out = policy.method.apply(older);

    for p in recent {
        if out.last().map_or(true, |last| p.timestamp > last.timestamp) {
            out.push(*p);
        }
    }

    // Strategies can drop every point of a degenerate (e.g. all-NaN) input;
    // fall back to the raw boundary points so the span contract holds.
    if out.is_empty() {
        if let Some(first) = points.first() {
            out.push(*first);
        }
        if points.len() > 1 {
            if let Some(last) = points.last() {
                out.push(*last);
            }
        }
        return out;
    }

    if let (Some(first_in), Some(first_out)) = (points.first(), out.first_mut()) {
        first_out.timestamp = first_in.timestamp;
    }
    if let (Some(last_in), Some(last_out)) = (points.last(), out.last_mut()) {
        last_out.timestamp = last_in.timestamp;
    }

    out
}

/// Numeric observation field selectable for charting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartField {
    Temperature,
    Humidity,
    WindAvg,
    WindGust,
    WindDirection,
    Pressure,
    Illuminance,
    Uv,
    SolarRadiation,
    Rain,
    LightningCount,
    LightningDistance,
    Battery,
}

impl ChartField {
    pub fn extract(&self, obs: &Observation) -> f64 {
        match self {
            ChartField::Temperature => obs.air_temperature,
            ChartField::Humidity => obs.relative_humidity,
            ChartField::WindAvg => obs.wind_avg,
            ChartField::WindGust => obs.wind_gust,
            ChartField::WindDirection => obs.wind_direction,
            ChartField::Pressure => obs.station_pressure,
            ChartField::Illuminance => obs.illuminance,
            ChartField::Uv => f64::from(obs.uv),
            ChartField::SolarRadiation => obs.solar_radiation,
            ChartField::Rain => obs.rain_accumulated,
            ChartField::LightningCount => f64::from(obs.lightning_strike_count),
            ChartField::LightningDistance => obs.lightning_strike_avg_distance,
            ChartField::Battery => obs.battery,
        }
    }
}

/// Project one field out of a chronological history.
pub fn series_for_field(history: &[Observation], field: ChartField) -> Vec<SeriesPoint> {
    history
        .iter()
        .map(|o| SeriesPoint::new(o.timestamp, field.extract(o)))
        .collect()
}
