//! Metric time-series data model.
//!
//! A [`TimeSeries`] is one metric stream for one service: an identity plus a
//! time-ascending run of [`MetricPoint`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use validator::Validate;

/// Type of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// A counter that only increases (e.g., request count).
    Counter,
    /// A gauge that can go up or down (e.g., temperature, memory usage).
    #[default]
    Gauge,
    /// A histogram-derived value (e.g., a latency percentile).
    Histogram,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Counter => write!(f, "counter"),
            Self::Gauge => write!(f, "gauge"),
            Self::Histogram => write!(f, "histogram"),
        }
    }
}

/// A single sample.
///
/// `min`/`max` are filled by windowed aggregation and describe the band around
/// `value`; they never change `value` itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Sample time.
    pub timestamp: DateTime<Utc>,
    /// Sample value.
    pub value: f64,
    /// Lower band bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper band bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl MetricPoint {
    /// Creates a point without band bounds.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            min: None,
            max: None,
        }
    }
}

/// One metric stream for one service.
///
/// # Example
///
/// ```
/// use engine::models::{MetricPoint, MetricType, TimeSeries};
/// use chrono::Utc;
///
/// let series = TimeSeries::new("cpu_usage", "checkout", MetricType::Gauge)
///     .with_unit("percent")
///     .with_points(vec![MetricPoint::new(Utc::now(), 42.0)]);
///
/// assert!(series.validate_series().is_ok());
/// assert_eq!(series.metric_id, "checkout.cpu_usage");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TimeSeries {
    /// Stable identifier: `<service>.<name>`.
    pub metric_id: String,

    /// The name of the metric (e.g., "`cpu_usage`").
    #[validate(length(min = 1, message = "Metric name cannot be empty"))]
    pub name: String,

    /// The service owning this stream.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,

    /// The type of metric.
    #[serde(default)]
    pub metric_type: MetricType,

    /// Optional unit of the metric (e.g., "bytes", "ms").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Labels (dimensions) for the metric.
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Samples in ascending timestamp order.
    pub points: Vec<MetricPoint>,
}

/// Errors that can occur during series validation.
#[derive(Debug, Error)]
pub enum MetricValidationError {
    /// The metric name is empty.
    #[error("Metric name cannot be empty")]
    EmptyName,

    /// Points are not in ascending time order.
    #[error("Points must be ordered by timestamp (violation at index {0})")]
    UnorderedPoints(usize),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl TimeSeries {
    /// Creates an empty series.
    #[must_use]
    pub fn new(name: impl Into<String>, service: impl Into<String>, metric_type: MetricType) -> Self {
        let name = name.into();
        let service = service.into();
        Self {
            metric_id: format!("{service}.{name}"),
            name,
            service,
            metric_type,
            unit: None,
            labels: HashMap::new(),
            points: Vec::new(),
        }
    }

    /// Sets the unit of the metric.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Adds a label to the metric.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Replaces the points.
    #[must_use]
    pub fn with_points(mut self, points: Vec<MetricPoint>) -> Self {
        self.points = points;
        self
    }

    /// Returns the most recent value.
    #[must_use]
    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    /// Returns all values in order.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Validates the series.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is empty
    /// - Timestamps decrease anywhere
    pub fn validate_series(&self) -> Result<(), MetricValidationError> {
        if self.name.is_empty() {
            return Err(MetricValidationError::EmptyName);
        }

        if let Some(i) = self
            .points
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(MetricValidationError::UnorderedPoints(i + 1));
        }

        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_series_identity() {
        let series = TimeSeries::new("memory_usage", "cart", MetricType::Gauge)
            .with_unit("bytes")
            .with_label("env", "production");

        assert_eq!(series.metric_id, "cart.memory_usage");
        assert_eq!(series.unit, Some("bytes".to_string()));
        assert_eq!(series.labels.get("env"), Some(&"production".to_string()));
        assert!(series.last_value().is_none());
    }

    #[test]
    fn test_series_validation_empty_name() {
        let series = TimeSeries::new("", "cart", MetricType::Gauge);
        assert!(matches!(
            series.validate_series(),
            Err(MetricValidationError::EmptyName)
        ));
    }

    #[test]
    fn test_series_validation_unordered() {
        let now = Utc::now();
        let series = TimeSeries::new("cpu", "cart", MetricType::Gauge).with_points(vec![
            MetricPoint::new(now, 1.0),
            MetricPoint::new(now + Duration::seconds(10), 2.0),
            MetricPoint::new(now, 3.0),
        ]);
        assert!(matches!(
            series.validate_series(),
            Err(MetricValidationError::UnorderedPoints(2))
        ));
    }

    #[test]
    fn test_point_serialization_skips_band() {
        let point = MetricPoint::new(Utc::now(), 1.5);
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("\"value\":1.5"));
        assert!(!json.contains("min"));
    }

    #[test]
    fn test_metric_type_display() {
        assert_eq!(MetricType::Counter.to_string(), "counter");
        assert_eq!(MetricType::Gauge.to_string(), "gauge");
        assert_eq!(MetricType::Histogram.to_string(), "histogram");
    }
}
