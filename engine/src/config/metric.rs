//! Time-series generator configuration.

use super::{ensure_ordered, ConfigError, TimeRange};
use crate::models::MetricType;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Composite signal model for one metric stream.
///
/// The generated value at elapsed time `t` is a base level plus a sine
/// season, gaussian noise proportional to the base, a linear trend and rare
/// positive spikes, clamped to `[min_value, max_value]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TimeSeriesConfig {
    /// Metric name.
    #[validate(length(min = 1, message = "Metric name cannot be empty"))]
    pub name: String,
    /// Owning service.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,
    /// Metric type.
    #[serde(default)]
    pub metric_type: MetricType,
    /// Unit label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Level around which the signal oscillates.
    pub base_value: f64,
    /// Seasonal amplitude.
    pub amplitude: f64,
    /// Seasonal period in minutes.
    #[validate(range(exclusive_min = 0.0, message = "Period must be positive"))]
    pub period_minutes: f64,
    /// Noise standard deviation as a fraction of `base_value`.
    #[validate(range(min = 0.0, message = "Noise ratio cannot be negative"))]
    pub noise_ratio: f64,
    /// Linear drift per elapsed minute.
    pub trend_per_minute: f64,
    /// Per-point spike probability.
    #[validate(range(min = 0.0, max = 1.0))]
    pub anomaly_probability: f64,
    /// Maximum spike height as a multiple of `base_value`.
    pub anomaly_magnitude: f64,
    /// Lower clamp.
    pub min_value: f64,
    /// Upper clamp.
    pub max_value: f64,
    /// Generation window.
    pub range: TimeRange,
    /// Sample spacing.
    #[validate(range(min = 1, message = "Interval must be at least one second"))]
    pub interval_seconds: u32,
}

impl TimeSeriesConfig {
    /// Creates a percent-style gauge around 50 with mild seasonality and noise.
    #[must_use]
    pub fn new(name: impl Into<String>, service: impl Into<String>, range: TimeRange) -> Self {
        Self {
            name: name.into(),
            service: service.into(),
            metric_type: MetricType::Gauge,
            unit: None,
            base_value: 50.0,
            amplitude: 10.0,
            period_minutes: 60.0,
            noise_ratio: 0.05,
            trend_per_minute: 0.0,
            anomaly_probability: 0.01,
            anomaly_magnitude: 0.5,
            min_value: 0.0,
            max_value: 100.0,
            range,
            interval_seconds: 60,
        }
    }

    /// Sets base level, amplitude and period.
    #[must_use]
    pub fn with_signal(mut self, base_value: f64, amplitude: f64, period_minutes: f64) -> Self {
        self.base_value = base_value;
        self.amplitude = amplitude;
        self.period_minutes = period_minutes;
        self
    }

    /// Sets the clamp bounds.
    #[must_use]
    pub fn with_bounds(mut self, min_value: f64, max_value: f64) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    /// Sets the sample spacing.
    #[must_use]
    pub fn with_interval_seconds(mut self, interval_seconds: u32) -> Self {
        self.interval_seconds = interval_seconds;
        self
    }

    /// Validates field ranges and cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A field is out of range (empty name, non-positive period or interval)
    /// - `min_value > max_value`
    /// - The time range is inverted
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate()?;
        ensure_ordered("value", self.min_value, self.max_value)?;
        self.range.validate_range()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn config() -> TimeSeriesConfig {
        TimeSeriesConfig::new("cpu_usage", "api", TimeRange::last(Utc::now(), Duration::hours(1)))
    }

    #[test]
    fn test_default_is_valid() {
        assert!(config().validate_config().is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let cfg = config().with_bounds(10.0, 5.0);
        assert!(matches!(
            cfg.validate_config(),
            Err(ConfigError::InvertedRange { field: "value", .. })
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let cfg = config().with_interval_seconds(0);
        assert!(matches!(
            cfg.validate_config(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_period_rejected() {
        let cfg = config().with_signal(50.0, 1.0, 0.0);
        assert!(cfg.validate_config().is_err());
    }

    #[test]
    fn test_probability_above_one_rejected() {
        let cfg = TimeSeriesConfig {
            anomaly_probability: 1.5,
            ..config()
        };
        assert!(cfg.validate_config().is_err());
    }
}
