//! Log stream generator configuration and policy tables.

use super::{ConfigError, TimeRange};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Hours `[start, end)` of a day, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    /// First hour in the window.
    pub start: u32,
    /// First hour after the window.
    pub end: u32,
}

impl HourWindow {
    /// Creates a window.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// True if `hour` falls inside the window.
    #[must_use]
    pub const fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }

    fn validate_window(&self) -> Result<(), ConfigError> {
        if self.start >= self.end || self.end > 24 {
            return Err(ConfigError::InvalidHourWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Traffic density policy table.
///
/// When several conditions apply, peak hours win, then night, then weekend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DensityPolicy {
    /// Busy windows.
    pub peak_hours: Vec<HourWindow>,
    /// Multiplier during peak hours.
    #[validate(range(exclusive_min = 0.0))]
    pub peak_multiplier: f64,
    /// Quiet window.
    pub night_hours: HourWindow,
    /// Multiplier during night hours.
    #[validate(range(exclusive_min = 0.0))]
    pub night_multiplier: f64,
    /// Multiplier on Saturdays and Sundays.
    #[validate(range(exclusive_min = 0.0))]
    pub weekend_multiplier: f64,
}

impl Default for DensityPolicy {
    fn default() -> Self {
        Self {
            peak_hours: vec![HourWindow::new(9, 12), HourWindow::new(14, 18)],
            peak_multiplier: 1.5,
            night_hours: HourWindow::new(0, 7),
            night_multiplier: 0.3,
            weekend_multiplier: 0.6,
        }
    }
}

impl DensityPolicy {
    /// Traffic multiplier at `t`.
    #[must_use]
    pub fn multiplier_at(&self, t: DateTime<Utc>) -> f64 {
        let hour = t.hour();
        if self.peak_hours.iter().any(|w| w.contains(hour)) {
            return self.peak_multiplier;
        }
        if self.night_hours.contains(hour) {
            return self.night_multiplier;
        }
        if matches!(t.weekday(), Weekday::Sat | Weekday::Sun) {
            return self.weekend_multiplier;
        }
        1.0
    }

    fn validate_policy(&self) -> Result<(), ConfigError> {
        self.validate()?;
        for window in &self.peak_hours {
            window.validate_window()?;
        }
        self.night_hours.validate_window()
    }
}

/// Error-cluster state machine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ClusterPolicy {
    /// Per-entry probability of entering a cluster.
    #[validate(range(min = 0.0, max = 1.0))]
    pub entry_probability: f64,
    /// Shortest cluster, minutes.
    #[validate(range(min = 1))]
    pub min_minutes: u32,
    /// Longest cluster, minutes.
    #[validate(range(min = 1))]
    pub max_minutes: u32,
    /// Error rate while in a cluster.
    #[validate(range(min = 0.0, max = 1.0))]
    pub cluster_error_rate: f64,
    /// Error rate otherwise.
    #[validate(range(min = 0.0, max = 1.0))]
    pub baseline_error_rate: f64,
}

impl Default for ClusterPolicy {
    fn default() -> Self {
        Self {
            entry_probability: 0.01,
            min_minutes: 5,
            max_minutes: 15,
            cluster_error_rate: 0.10,
            baseline_error_rate: 0.005,
        }
    }
}

/// How often log entries carry trace and span references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CorrelationPolicy {
    /// Fraction of entries with a trace ID.
    #[validate(range(min = 0.0, max = 1.0))]
    pub trace_probability: f64,
    /// Fraction of entries with a span ID. Bounded by `trace_probability`.
    #[validate(range(min = 0.0, max = 1.0))]
    pub span_probability: f64,
}

impl Default for CorrelationPolicy {
    fn default() -> Self {
        Self {
            trace_probability: 0.2,
            span_probability: 0.1,
        }
    }
}

/// Everything about a log stream except which service and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LogPolicy {
    /// Entries per minute at density 1.0.
    #[validate(range(exclusive_min = 0.0, message = "Log frequency must be positive"))]
    pub base_frequency_per_minute: f64,
    /// Density table.
    #[serde(default)]
    #[validate(nested)]
    pub density: DensityPolicy,
    /// Error clustering.
    #[serde(default)]
    #[validate(nested)]
    pub cluster: ClusterPolicy,
    /// Trace correlation.
    #[serde(default)]
    #[validate(nested)]
    pub correlation: CorrelationPolicy,
}

impl Default for LogPolicy {
    fn default() -> Self {
        Self {
            base_frequency_per_minute: 10.0,
            density: DensityPolicy::default(),
            cluster: ClusterPolicy::default(),
            correlation: CorrelationPolicy::default(),
        }
    }
}

impl LogPolicy {
    /// Validates field ranges and cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is out of range, a window is malformed,
    /// cluster bounds are inverted, or the span probability exceeds the trace
    /// probability.
    pub fn validate_policy(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.density.validate_policy()?;
        super::ensure_ordered(
            "cluster_minutes",
            f64::from(self.cluster.min_minutes),
            f64::from(self.cluster.max_minutes),
        )?;
        if self.correlation.span_probability > self.correlation.trace_probability {
            return Err(ConfigError::InconsistentProbability {
                field: "span_probability",
                limit_field: "trace_probability",
            });
        }
        Ok(())
    }
}

/// Configuration for one service's log stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LogStreamConfig {
    /// Emitting service.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,
    /// Generation window.
    pub range: TimeRange,
    /// Frequency, density, clustering and correlation.
    #[serde(flatten)]
    pub policy: LogPolicy,
}

impl LogStreamConfig {
    /// Creates a stream configuration with the default policy.
    #[must_use]
    pub fn new(service: impl Into<String>, range: TimeRange) -> Self {
        Self {
            service: service.into(),
            range,
            policy: LogPolicy::default(),
        }
    }

    /// Sets the base frequency.
    #[must_use]
    pub fn with_frequency(mut self, per_minute: f64) -> Self {
        self.policy.base_frequency_per_minute = per_minute;
        self
    }

    /// Replaces the policy.
    #[must_use]
    pub fn with_policy(mut self, policy: LogPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is empty, the range is inverted, or
    /// the policy is invalid.
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.range.validate_range()?;
        self.policy.validate_policy()
    }
}
