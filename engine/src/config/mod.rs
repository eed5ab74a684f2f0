//! Generation configuration.
//!
//! Every generator takes a configuration value object from this module and
//! validates it before drawing a single random number. Invalid configuration
//! is a caller error and is reported as a [`ConfigError`] instead of being
//! silently clamped.

pub mod alert;
pub mod dataset;
pub mod log;
pub mod metric;
pub mod trace;

pub use alert::{AlertGenerationConfig, AlertPolicy};
pub use dataset::DatasetConfig;
pub use log::{ClusterPolicy, CorrelationPolicy, DensityPolicy, HourWindow, LogPolicy, LogStreamConfig};
pub use metric::TimeSeriesConfig;
pub use trace::{TraceConfig, TraceShape};

use crate::models::ServiceDefinition;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised by configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The time range ends before it starts.
    #[error("Start time {start} is after end time {end}")]
    InvalidTimeRange {
        /// Range start.
        start: DateTime<Utc>,
        /// Range end.
        end: DateTime<Utc>,
    },

    /// A `min_*` bound exceeds its `max_*` counterpart.
    #[error("{field}: minimum {min} exceeds maximum {max}")]
    InvertedRange {
        /// The pair of fields, e.g. `depth`.
        field: &'static str,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Two probabilities are inconsistent with each other.
    #[error("{field} must not exceed {limit_field}")]
    InconsistentProbability {
        /// The dependent probability.
        field: &'static str,
        /// The probability it is bounded by.
        limit_field: &'static str,
    },

    /// An alert rule watches a service missing from the catalogue.
    #[error("Alert rule '{rule}' references unknown service '{service}'")]
    UnknownService {
        /// Rule identifier.
        rule: String,
        /// Missing service.
        service: String,
    },

    /// A catalogue service calls a service missing from the catalogue.
    #[error("Service '{service}' calls unknown downstream service '{downstream}'")]
    UnknownDownstream {
        /// Calling service.
        service: String,
        /// Missing callee.
        downstream: String,
    },

    /// The worst-case span count of a trace shape exceeds the limit.
    #[error("Trace shape allows up to {worst_case} spans, limit is {limit}")]
    TooManySpans {
        /// Span count of a fully branched tree.
        worst_case: u64,
        /// Largest accepted span count.
        limit: u64,
    },

    /// An hour window is malformed.
    #[error("Invalid hour window {start}..{end}: hours must satisfy start < end <= 24")]
    InvalidHourWindow {
        /// Window start hour.
        start: u32,
        /// Window end hour (exclusive).
        end: u32,
    },

    /// Field-level validation failed.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Checks that `min <= max` for a named pair of bounds.
pub(crate) fn ensure_ordered(field: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::InvertedRange { field, min, max });
    }
    Ok(())
}

/// Checks that every `downstream` entry names a service in `services`.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownDownstream`] for the first dangling reference.
pub fn validate_catalogue(services: &[ServiceDefinition]) -> Result<(), ConfigError> {
    let names: HashSet<&str> = services.iter().map(|s| s.name.as_str()).collect();
    for service in services {
        if let Some(missing) = service
            .downstream
            .iter()
            .find(|d| !names.contains(d.as_str()))
        {
            return Err(ConfigError::UnknownDownstream {
                service: service.name.clone(),
                downstream: missing.clone(),
            });
        }
    }
    Ok(())
}

/// Generation window `[start, end]`, both bounds inclusive.
///
/// # Example
///
/// ```
/// use engine::config::TimeRange;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let range = TimeRange::last(now, Duration::days(10));
/// assert!((range.days() - 10.0).abs() < 1e-9);
/// assert!(range.validate_range().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Inclusive end.
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range. Use [`TimeRange::validate_range`] to check ordering.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The window of length `length` ending at `end`.
    #[must_use]
    pub fn last(end: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start: end - length,
            end,
        }
    }

    /// Length of the range.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Length in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        self.duration().num_milliseconds()
    }

    /// Length in (fractional) days.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn days(&self) -> f64 {
        self.duration_ms() as f64 / 86_400_000.0
    }

    /// True if `t` lies within the range, bounds included.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }

    /// Validates the range.
    ///
    /// # Errors
    ///
    /// Returns an error if the range ends before it starts.
    pub fn validate_range(&self) -> Result<(), ConfigError> {
        if self.start > self.end {
            return Err(ConfigError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}
