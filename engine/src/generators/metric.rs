//! Time-series metric generator.
//!
//! Produces one [`TimeSeries`] from a composite signal model and provides
//! bucket downsampling for rendering.

use crate::config::{ConfigError, TimeRange, TimeSeriesConfig};
use crate::models::{MetricPoint, MetricType, TimeSeries};
use crate::random::{clamp, SimRng};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::f64::consts::PI;

/// Generates one metric stream.
///
/// One point is emitted per `interval_seconds` from the range start up to and
/// including the range end. Each point is then annotated with the min/max of a
/// centred window of `max(1, n/100)` neighbours on each side.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
///
/// # Example
///
/// ```
/// use engine::config::{TimeRange, TimeSeriesConfig};
/// use engine::generators::generate_time_series;
/// use engine::random::SimRng;
/// use chrono::{Duration, Utc};
///
/// let range = TimeRange::last(Utc::now(), Duration::minutes(10));
/// let config = TimeSeriesConfig::new("cpu_usage", "api", range);
/// let series = generate_time_series(&config, &mut SimRng::seeded(1)).unwrap();
/// assert_eq!(series.points.len(), 11);
/// ```
pub fn generate_time_series(
    config: &TimeSeriesConfig,
    rng: &mut SimRng,
) -> Result<TimeSeries, ConfigError> {
    config.validate_config()?;

    let start = config.range.start;
    let step = Duration::seconds(i64::from(config.interval_seconds));
    let mut points = Vec::new();
    let mut t = start;
    while t <= config.range.end {
        #[allow(clippy::cast_precision_loss)]
        let elapsed_ms = (t - start).num_milliseconds() as f64;
        points.push(MetricPoint::new(t, sample_value(config, elapsed_ms, rng)));
        t += step;
    }
    annotate_band(&mut points);

    tracing::debug!(
        metric = %config.name,
        service = %config.service,
        points = points.len(),
        "Generated time series"
    );

    let mut series = TimeSeries::new(&config.name, &config.service, config.metric_type)
        .with_points(points);
    series.unit.clone_from(&config.unit);
    Ok(series)
}

fn sample_value(config: &TimeSeriesConfig, elapsed_ms: f64, rng: &mut SimRng) -> f64 {
    let period_ms = config.period_minutes * 60_000.0;
    let seasonal = config.amplitude * (2.0 * PI * elapsed_ms / period_ms).sin();
    let noise = rng.gaussian(0.0, 1.0) * config.base_value * config.noise_ratio;
    let trend = config.trend_per_minute * (elapsed_ms / 60_000.0);
    let anomaly = if rng.chance(config.anomaly_probability) {
        config.base_value * config.anomaly_magnitude * rng.uniform()
    } else {
        0.0
    };
    clamp(
        config.base_value + seasonal + noise + trend + anomaly,
        config.min_value,
        config.max_value,
    )
}

fn annotate_band(points: &mut [MetricPoint]) {
    let n = points.len();
    if n == 0 {
        return;
    }
    let half = (n / 100).max(1);
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    for (i, point) in points.iter_mut().enumerate() {
        let lo = i.saturating_sub(half);
        let hi = (i + half).min(n - 1);
        let window = &values[lo..=hi];
        point.min = Some(window.iter().copied().fold(f64::INFINITY, f64::min));
        point.max = Some(window.iter().copied().fold(f64::NEG_INFINITY, f64::max));
    }
}

/// Downsamples `points` to at most `max_points` buckets.
///
/// Buckets are contiguous runs of `ceil(n / max_points)` points. Each bucket
/// becomes one point stamped with its first timestamp, valued at the bucket
/// average and bounded by the bucket min/max. When the input already fits (or
/// `max_points` is zero) it is returned borrowed and untouched.
#[must_use]
pub fn aggregate_time_series(points: &[MetricPoint], max_points: usize) -> Cow<'_, [MetricPoint]> {
    if max_points == 0 || points.len() <= max_points {
        return Cow::Borrowed(points);
    }

    let bucket_size = points.len().div_ceil(max_points);
    let aggregated = points
        .chunks(bucket_size)
        .map(|bucket| {
            #[allow(clippy::cast_precision_loss)]
            let avg = bucket.iter().map(|p| p.value).sum::<f64>() / bucket.len() as f64;
            let min = bucket.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
            let max = bucket.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
            MetricPoint {
                timestamp: bucket[0].timestamp,
                value: avg,
                min: Some(min),
                max: Some(max),
            }
        })
        .collect();
    Cow::Owned(aggregated)
}

/// Preset signal shapes for the standard per-service metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricProfile {
    /// CPU utilisation, percent, daily season.
    Cpu,
    /// Memory utilisation, percent, slow upward drift.
    Memory,
    /// Requests per second, strong daily season.
    RequestRate,
    /// Error percentage, spiky.
    ErrorRate,
    /// p95 latency in milliseconds.
    LatencyP95,
}

impl MetricProfile {
    /// Every profile, in presentation order.
    pub const ALL: [Self; 5] = [
        Self::Cpu,
        Self::Memory,
        Self::RequestRate,
        Self::ErrorRate,
        Self::LatencyP95,
    ];

    /// Metric name used for series generated from this profile.
    #[must_use]
    pub const fn metric_name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu_usage",
            Self::Memory => "memory_usage",
            Self::RequestRate => "request_rate",
            Self::ErrorRate => "error_rate",
            Self::LatencyP95 => "latency_p95",
        }
    }

    /// Builds the generator configuration for `service` over `range`.
    #[must_use]
    pub fn config(self, service: &str, range: TimeRange, interval_seconds: u32) -> TimeSeriesConfig {
        let base = TimeSeriesConfig::new(self.metric_name(), service, range)
            .with_interval_seconds(interval_seconds);
        match self {
            Self::Cpu => TimeSeriesConfig {
                unit: Some("percent".to_string()),
                noise_ratio: 0.08,
                anomaly_magnitude: 0.8,
                ..base.with_signal(45.0, 15.0, 1440.0)
            },
            Self::Memory => TimeSeriesConfig {
                unit: Some("percent".to_string()),
                noise_ratio: 0.02,
                trend_per_minute: 0.001,
                anomaly_probability: 0.002,
                anomaly_magnitude: 0.3,
                ..base.with_signal(60.0, 5.0, 720.0)
            },
            Self::RequestRate => TimeSeriesConfig {
                unit: Some("req/s".to_string()),
                noise_ratio: 0.1,
                anomaly_magnitude: 1.0,
                ..base.with_signal(120.0, 60.0, 1440.0).with_bounds(0.0, 10_000.0)
            },
            Self::ErrorRate => TimeSeriesConfig {
                unit: Some("percent".to_string()),
                noise_ratio: 0.3,
                anomaly_probability: 0.02,
                anomaly_magnitude: 5.0,
                ..base.with_signal(1.0, 0.5, 360.0)
            },
            Self::LatencyP95 => TimeSeriesConfig {
                metric_type: MetricType::Histogram,
                unit: Some("ms".to_string()),
                noise_ratio: 0.15,
                anomaly_probability: 0.02,
                anomaly_magnitude: 2.0,
                ..base.with_signal(180.0, 40.0, 1440.0).with_bounds(0.0, 10_000.0)
            },
        }
    }
}

/// Generates every [`MetricProfile`] series for one service.
///
/// # Errors
///
/// Returns an error if the service name is empty, the range is inverted or
/// the interval is zero.
pub fn standard_series(
    service: &str,
    range: TimeRange,
    interval_seconds: u32,
    rng: &mut SimRng,
) -> Result<Vec<TimeSeries>, ConfigError> {
    MetricProfile::ALL
        .iter()
        .map(|profile| generate_time_series(&profile.config(service, range, interval_seconds), rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn range(minutes: i64) -> TimeRange {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        TimeRange::new(start, start + Duration::minutes(minutes))
    }

    fn flat_config(minutes: i64) -> TimeSeriesConfig {
        TimeSeriesConfig {
            amplitude: 0.0,
            noise_ratio: 0.0,
            trend_per_minute: 0.0,
            anomaly_probability: 0.0,
            ..TimeSeriesConfig::new("flat", "svc", range(minutes))
        }
    }

    #[test]
    fn test_flat_signal_is_exactly_base() {
        let series = generate_time_series(&flat_config(5), &mut SimRng::seeded(1)).unwrap();
        assert_eq!(series.points.len(), 6);
        for point in &series.points {
            assert!((point.value - 50.0).abs() < f64::EPSILON);
            assert_eq!(point.min, Some(50.0));
            assert_eq!(point.max, Some(50.0));
        }
    }

    #[test]
    fn test_end_inclusive_and_stops_past_end() {
        // 10 minutes at 3 minute spacing: 0, 3, 6, 9.
        let cfg = flat_config(10).with_interval_seconds(180);
        let series = generate_time_series(&cfg, &mut SimRng::seeded(1)).unwrap();
        assert_eq!(series.points.len(), 4);
        assert_eq!(
            series.points.last().unwrap().timestamp,
            cfg.range.start + Duration::minutes(9)
        );
    }

    #[test]
    fn test_values_clamped() {
        let cfg = TimeSeriesConfig {
            noise_ratio: 3.0,
            anomaly_probability: 0.5,
            anomaly_magnitude: 10.0,
            ..TimeSeriesConfig::new("wild", "svc", range(600)).with_bounds(20.0, 80.0)
        };
        let series = generate_time_series(&cfg, &mut SimRng::seeded(9)).unwrap();
        assert!(series
            .points
            .iter()
            .all(|p| (20.0..=80.0).contains(&p.value)));
        assert!(series.validate_series().is_ok());
    }

    #[test]
    fn test_band_contains_value() {
        let cfg = TimeSeriesConfig::new("cpu", "svc", range(300));
        let series = generate_time_series(&cfg, &mut SimRng::seeded(3)).unwrap();
        for p in &series.points {
            assert!(p.min.unwrap() <= p.value && p.value <= p.max.unwrap());
        }
    }

    #[test]
    fn test_trend_raises_values() {
        let cfg = TimeSeriesConfig {
            trend_per_minute: 1.0,
            ..flat_config(30).with_bounds(0.0, 1_000.0)
        };
        let series = generate_time_series(&cfg, &mut SimRng::seeded(1)).unwrap();
        assert!((series.points[30].value - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = flat_config(5).with_bounds(100.0, 0.0);
        assert!(generate_time_series(&cfg, &mut SimRng::seeded(1)).is_err());
    }

    #[test]
    fn test_aggregate_small_input_borrowed() {
        let series = generate_time_series(&flat_config(5), &mut SimRng::seeded(1)).unwrap();
        let out = aggregate_time_series(&series.points, 10);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out.as_ref(), series.points.as_slice());
    }

    #[test]
    fn test_aggregate_caps_and_covers() {
        let cfg = TimeSeriesConfig::new("cpu", "svc", range(1000));
        let series = generate_time_series(&cfg, &mut SimRng::seeded(4)).unwrap();
        assert_eq!(series.points.len(), 1001);

        let out = aggregate_time_series(&series.points, 100);
        assert!(out.len() <= 100);
        assert_eq!(out[0].timestamp, series.points[0].timestamp);

        // Bucket size is ceil(1001/100) = 11, so the last bucket starts at 990.
        assert_eq!(out.last().unwrap().timestamp, series.points[990].timestamp);
        let expected_avg = series.points[..11].iter().map(|p| p.value).sum::<f64>() / 11.0;
        assert!((out[0].value - expected_avg).abs() < 1e-9);
        assert!(out[0].min.unwrap() <= out[0].value && out[0].value <= out[0].max.unwrap());
    }

    #[test]
    fn test_aggregate_zero_cap_is_identity() {
        let series = generate_time_series(&flat_config(5), &mut SimRng::seeded(1)).unwrap();
        assert_eq!(aggregate_time_series(&series.points, 0).len(), 6);
    }

    #[test]
    fn test_standard_series_names() {
        let all = standard_series("checkout", range(60), 60, &mut SimRng::seeded(2)).unwrap();
        let names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["cpu_usage", "memory_usage", "request_rate", "error_rate", "latency_p95"]
        );
        assert!(all.iter().all(|s| s.service == "checkout"));
        assert_eq!(all[4].unit.as_deref(), Some("ms"));
    }
}
