//! Alert rule and alert event models.
//!
//! An [`AlertEvent`] moves firing → acknowledged → resolved. Transitions only
//! go forward and are never stamped before the event fired.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Alert severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Page someone.
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Comparison between the observed metric value and the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Equal
    Eq,
    /// Not equal
    Ne,
}

impl AlertCondition {
    /// Returns true if `value` satisfies the condition against `threshold`.
    #[must_use]
    pub fn evaluate(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Gte => value >= threshold,
            Self::Lt => value < threshold,
            Self::Lte => value <= threshold,
            Self::Eq => (value - threshold).abs() < f64::EPSILON,
            Self::Ne => (value - threshold).abs() >= f64::EPSILON,
        }
    }
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        };
        write!(f, "{symbol}")
    }
}

/// Static alert rule definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AlertRule {
    /// Unique rule identifier.
    #[validate(length(min = 1, message = "Rule ID cannot be empty"))]
    pub id: String,
    /// Human-readable name.
    #[validate(length(min = 1, message = "Rule name cannot be empty"))]
    pub name: String,
    /// Service whose metric is watched.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,
    /// Metric name.
    #[validate(length(min = 1, message = "Metric name cannot be empty"))]
    pub metric: String,
    /// Comparison operator.
    pub condition: AlertCondition,
    /// Threshold value.
    pub threshold: f64,
    /// Severity of resulting events.
    pub severity: AlertSeverity,
    /// How long the condition must hold before firing.
    pub duration_minutes: u32,
    /// Disabled rules never fire.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AlertRule {
    /// Creates an enabled rule with a five minute hold duration.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        service: impl Into<String>,
        metric: impl Into<String>,
        condition: AlertCondition,
        threshold: f64,
        severity: AlertSeverity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            service: service.into(),
            metric: metric.into(),
            condition,
            threshold,
            severity,
            duration_minutes: 5,
            enabled: true,
        }
    }

    /// Sets the hold duration.
    #[must_use]
    pub fn with_duration_minutes(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Where an event is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    /// Fired, nobody has reacted yet.
    Firing,
    /// Someone is on it.
    Acknowledged,
    /// Condition cleared.
    Resolved,
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Firing => write!(f, "firing"),
            Self::Acknowledged => write!(f, "acknowledged"),
            Self::Resolved => write!(f, "resolved"),
        }
    }
}

/// Illegal alert lifecycle transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlertLifecycleError {
    /// The event is already resolved.
    #[error("Alert event {0} is already resolved")]
    AlreadyResolved(String),

    /// The event is already acknowledged.
    #[error("Alert event {0} is already acknowledged")]
    AlreadyAcknowledged(String),

    /// The transition would be stamped before the event fired.
    #[error("Transition time precedes trigger time of alert event {0}")]
    BeforeTrigger(String),
}

/// One firing instance of an alert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Unique event identifier.
    pub id: String,
    /// Rule that fired.
    pub rule_id: String,
    /// Rule name at firing time.
    pub rule_name: String,
    /// Service the rule watches.
    pub service: String,
    /// Severity copied from the rule.
    pub severity: AlertSeverity,
    /// Observed metric value that crossed the threshold.
    pub value: f64,
    /// Human-readable summary.
    pub message: String,
    /// When the event fired.
    pub triggered_at: DateTime<Utc>,
    /// When the condition cleared, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Whether someone acknowledged the event.
    #[serde(default)]
    pub acknowledged: bool,
    /// Who acknowledged it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    /// When it was acknowledged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl AlertEvent {
    /// Creates a firing event for `rule`.
    #[must_use]
    pub fn firing(
        id: impl Into<String>,
        rule: &AlertRule,
        value: f64,
        triggered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            service: rule.service.clone(),
            severity: rule.severity,
            value,
            message: format!(
                "{} on {}: {} {:.2} {} {:.2}",
                rule.name, rule.service, rule.metric, value, rule.condition, rule.threshold
            ),
            triggered_at,
            resolved_at: None,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AlertState {
        if self.resolved_at.is_some() {
            AlertState::Resolved
        } else if self.acknowledged {
            AlertState::Acknowledged
        } else {
            AlertState::Firing
        }
    }

    /// Time from trigger to resolution, if resolved.
    #[must_use]
    pub fn time_to_resolve(&self) -> Option<chrono::Duration> {
        self.resolved_at.map(|r| r - self.triggered_at)
    }

    /// Marks the event acknowledged.
    ///
    /// # Errors
    ///
    /// Returns an error if the event is resolved, already acknowledged, or
    /// `at` is not after the trigger time.
    pub fn acknowledge(
        &mut self,
        by: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), AlertLifecycleError> {
        if self.resolved_at.is_some() {
            return Err(AlertLifecycleError::AlreadyResolved(self.id.clone()));
        }
        if self.acknowledged {
            return Err(AlertLifecycleError::AlreadyAcknowledged(self.id.clone()));
        }
        if at <= self.triggered_at {
            return Err(AlertLifecycleError::BeforeTrigger(self.id.clone()));
        }
        self.acknowledged = true;
        self.acknowledged_by = Some(by.into());
        self.acknowledged_at = Some(at);
        Ok(())
    }

    /// Marks the event resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the event is already resolved or `at` is not after
    /// the trigger time.
    pub fn resolve(&mut self, at: DateTime<Utc>) -> Result<(), AlertLifecycleError> {
        if self.resolved_at.is_some() {
            return Err(AlertLifecycleError::AlreadyResolved(self.id.clone()));
        }
        if at <= self.triggered_at {
            return Err(AlertLifecycleError::BeforeTrigger(self.id.clone()));
        }
        self.resolved_at = Some(at);
        Ok(())
    }
}
