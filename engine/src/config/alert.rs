//! Alert history generator configuration.

use super::{ConfigError, TimeRange};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// How often rules fire and how people react.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AlertPolicy {
    /// Events per day per rule.
    #[validate(range(min = 0.0, message = "Event density cannot be negative"))]
    pub event_density_per_day: f64,
    /// Mean incident length in minutes.
    #[validate(range(exclusive_min = 0.0, message = "Average duration must be positive"))]
    pub avg_duration_minutes: f64,
    /// Probability that an event gets acknowledged.
    #[validate(range(min = 0.0, max = 1.0))]
    pub ack_probability: f64,
    /// Acknowledgements land within this many minutes of firing.
    #[validate(range(min = 1))]
    pub ack_window_minutes: u32,
    /// People who acknowledge alerts.
    #[serde(default)]
    pub responders: Vec<String>,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            event_density_per_day: 2.0,
            avg_duration_minutes: 30.0,
            ack_probability: 0.7,
            ack_window_minutes: 5,
            responders: vec![
                "oncall-primary".to_string(),
                "oncall-secondary".to_string(),
                "sre-team".to_string(),
            ],
        }
    }
}

/// Configuration for alert history generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AlertGenerationConfig {
    /// History window.
    pub range: TimeRange,
    /// Firing and acknowledgement behaviour.
    #[serde(flatten)]
    #[validate(nested)]
    pub policy: AlertPolicy,
}

impl AlertGenerationConfig {
    /// Creates a configuration with the default policy.
    #[must_use]
    pub fn new(range: TimeRange) -> Self {
        Self {
            range,
            policy: AlertPolicy::default(),
        }
    }

    /// Sets events per day per rule.
    #[must_use]
    pub fn with_density(mut self, per_day: f64) -> Self {
        self.policy.event_density_per_day = per_day;
        self
    }

    /// Sets the mean incident length.
    #[must_use]
    pub fn with_avg_duration_minutes(mut self, minutes: f64) -> Self {
        self.policy.avg_duration_minutes = minutes;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is inverted or a policy field is out of range.
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.range.validate_range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn config() -> AlertGenerationConfig {
        AlertGenerationConfig::new(TimeRange::last(Utc::now(), Duration::days(1)))
    }

    #[test]
    fn test_default_is_valid() {
        assert!(config().validate_config().is_ok());
    }

    #[test]
    fn test_negative_density_rejected() {
        assert!(config().with_density(-1.0).validate_config().is_err());
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(config()
            .with_avg_duration_minutes(0.0)
            .validate_config()
            .is_err());
    }

    #[test]
    fn test_policy_serialization_roundtrip() {
        let cfg = config();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: AlertGenerationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
