//! Configuration for generating a complete, cross-correlated data set.

use super::{validate_catalogue, AlertPolicy, ConfigError, LogPolicy, TimeRange, TraceShape};
use crate::models::{default_catalogue, AlertRule, ServiceDefinition};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Everything needed to generate traces, metrics, logs and alerts for a
/// service catalogue over one window.
///
/// # Example
///
/// ```
/// use engine::config::{DatasetConfig, TimeRange};
/// use chrono::{Duration, Utc};
///
/// let config = DatasetConfig::new(TimeRange::last(Utc::now(), Duration::hours(1)))
///     .with_seed(42);
/// assert!(config.validate_config().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DatasetConfig {
    /// Service catalogue. May be empty.
    #[serde(default)]
    #[validate(nested)]
    pub services: Vec<ServiceDefinition>,
    /// Generation window.
    pub range: TimeRange,
    /// Number of traces spread over the window.
    pub trace_count: u32,
    /// Shape of every generated trace.
    #[serde(default)]
    #[validate(nested)]
    pub trace_shape: TraceShape,
    /// Sample spacing of metric series.
    #[validate(range(min = 1))]
    pub metric_interval_seconds: u32,
    /// Log stream policy, shared by every service.
    #[serde(default)]
    pub logs: LogPolicy,
    /// Alert firing policy.
    #[serde(default)]
    #[validate(nested)]
    pub alerts: AlertPolicy,
    /// Explicit alert rules. Derived from the catalogue when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<AlertRule>>,
    /// Seed for reproducible output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl DatasetConfig {
    /// Creates a configuration over the default catalogue.
    #[must_use]
    pub fn new(range: TimeRange) -> Self {
        Self {
            services: default_catalogue(),
            range,
            trace_count: 50,
            trace_shape: TraceShape::default(),
            metric_interval_seconds: 60,
            logs: LogPolicy::default(),
            alerts: AlertPolicy::default(),
            rules: None,
            seed: None,
        }
    }

    /// Replaces the service catalogue.
    #[must_use]
    pub fn with_services(mut self, services: Vec<ServiceDefinition>) -> Self {
        self.services = services;
        self
    }

    /// Sets the number of traces.
    #[must_use]
    pub fn with_trace_count(mut self, count: u32) -> Self {
        self.trace_count = count;
        self
    }

    /// Sets explicit alert rules.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<AlertRule>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// True if `name` is in the catalogue.
    #[must_use]
    pub fn has_service(&self, name: &str) -> bool {
        self.services.iter().any(|s| s.name == name)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any nested configuration is invalid
    /// - The range is inverted
    /// - A service calls a downstream service outside the catalogue
    /// - An explicit alert rule watches a service outside the catalogue
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.range.validate_range()?;
        validate_catalogue(&self.services)?;
        self.trace_shape.validate_shape()?;
        self.logs.validate_policy()?;
        if let Some(rules) = &self.rules {
            for rule in rules {
                rule.validate()?;
                if !self.has_service(&rule.service) {
                    return Err(ConfigError::UnknownService {
                        rule: rule.id.clone(),
                        service: rule.service.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertCondition, AlertSeverity};
    use chrono::{Duration, Utc};

    fn config() -> DatasetConfig {
        DatasetConfig::new(TimeRange::last(Utc::now(), Duration::hours(2)))
    }

    #[test]
    fn test_default_is_valid() {
        assert!(config().validate_config().is_ok());
    }

    #[test]
    fn test_empty_catalogue_is_valid() {
        assert!(config().with_services(Vec::new()).validate_config().is_ok());
    }

    #[test]
    fn test_rule_for_unknown_service_rejected() {
        let rule = AlertRule::new(
            "r1",
            "Ghost",
            "ghost-service",
            "cpu_usage",
            AlertCondition::Gt,
            90.0,
            AlertSeverity::Critical,
        );
        let err = config().with_rules(vec![rule]).validate_config().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownService { .. }));
        assert!(err.to_string().contains("ghost-service"));
    }

    #[test]
    fn test_dangling_downstream_rejected() {
        use crate::models::ServiceKind;

        let services = vec![ServiceDefinition::new("gw", ServiceKind::Gateway)
            .with_operation("GET /")
            .calls("ghost")];
        let err = config().with_services(services).validate_config().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDownstream { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_has_service() {
        let cfg = config();
        assert!(cfg.has_service("api-gateway"));
        assert!(!cfg.has_service("nope"));
    }
}
