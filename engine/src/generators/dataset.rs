//! Cross-correlated data set generation.
//!
//! Runs every generator over one catalogue and window: traces first, then
//! metric series per service, then log streams that reference the generated
//! traces, then alert history for the rule set.

use super::{default_rules, generate_alert_events, generate_log_stream, generate_traces, standard_series};
use crate::config::{AlertGenerationConfig, ConfigError, DatasetConfig, LogStreamConfig, TimeRange, TraceConfig};
use crate::models::{AlertEvent, AlertRule, LogEntry, ServiceDefinition, ServiceKind, TimeSeries, Trace};
use crate::random::SimRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Fallback root operation for services without declared operations.
const DEFAULT_ROOT_OPERATION: &str = "handle_request";

/// Everything generated for one catalogue and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Catalogue the data was generated for.
    pub services: Vec<ServiceDefinition>,
    /// Generation window.
    pub range: TimeRange,
    /// Traces, ordered by start time.
    pub traces: Vec<Trace>,
    /// Metric series, grouped by service.
    pub metrics: Vec<TimeSeries>,
    /// Log entries of every service, ordered by timestamp.
    pub logs: Vec<LogEntry>,
    /// Rules the alert history was generated from.
    pub rules: Vec<AlertRule>,
    /// Alert events, ordered by trigger time.
    pub alerts: Vec<AlertEvent>,
}

/// A reference that does not resolve within its data set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrelationViolation {
    /// A log entry names a trace that was not generated.
    UnknownTrace {
        /// Log entry ID.
        log_id: String,
        /// Dangling trace ID.
        trace_id: String,
    },
    /// A log entry names a span missing from its trace.
    UnknownSpan {
        /// Log entry ID.
        log_id: String,
        /// Dangling span ID.
        span_id: String,
    },
    /// An alert event names a rule outside the rule set.
    UnknownRule {
        /// Alert event ID.
        event_id: String,
        /// Dangling rule ID.
        rule_id: String,
    },
    /// Some entity names a service outside the catalogue.
    UnknownService {
        /// Entity type, e.g. `span` or `alert_rule`.
        entity: &'static str,
        /// Entity ID.
        id: String,
        /// Dangling service name.
        service: String,
    },
}

impl fmt::Display for CorrelationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTrace { log_id, trace_id } => {
                write!(f, "log {log_id} references unknown trace {trace_id}")
            }
            Self::UnknownSpan { log_id, span_id } => {
                write!(f, "log {log_id} references unknown span {span_id}")
            }
            Self::UnknownRule { event_id, rule_id } => {
                write!(f, "alert {event_id} references unknown rule {rule_id}")
            }
            Self::UnknownService {
                entity,
                id,
                service,
            } => write!(f, "{entity} {id} references unknown service {service}"),
        }
    }
}

impl Dataset {
    /// An empty data set over `range`.
    #[must_use]
    pub fn empty(services: Vec<ServiceDefinition>, range: TimeRange) -> Self {
        Self {
            services,
            range,
            traces: Vec::new(),
            metrics: Vec::new(),
            logs: Vec::new(),
            rules: Vec::new(),
            alerts: Vec::new(),
        }
    }

    /// True if nothing was generated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty() && self.metrics.is_empty() && self.logs.is_empty() && self.alerts.is_empty()
    }

    /// Finds a trace by ID.
    #[must_use]
    pub fn trace(&self, trace_id: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.trace_id() == trace_id)
    }

    /// Lists every trace, span, rule or service reference that does not
    /// resolve within this data set.
    #[must_use]
    pub fn correlation_violations(&self) -> Vec<CorrelationViolation> {
        let services: HashSet<&str> = self.services.iter().map(|s| s.name.as_str()).collect();
        let traces: HashMap<&str, &Trace> = self.traces.iter().map(|t| (t.trace_id(), t)).collect();
        let rules: HashSet<&str> = self.rules.iter().map(|r| r.id.as_str()).collect();
        let mut violations = Vec::new();

        let mut check_service = |entity: &'static str, id: &str, service: &str| {
            if !services.contains(service) {
                violations.push(CorrelationViolation::UnknownService {
                    entity,
                    id: id.to_string(),
                    service: service.to_string(),
                });
            }
        };
        for span in self.traces.iter().flat_map(Trace::spans) {
            check_service("span", &span.span_id, &span.service);
        }
        for series in &self.metrics {
            check_service("series", &series.metric_id, &series.service);
        }
        for entry in &self.logs {
            check_service("log", &entry.id, &entry.service);
        }
        for rule in &self.rules {
            check_service("alert_rule", &rule.id, &rule.service);
        }
        for event in &self.alerts {
            check_service("alert_event", &event.id, &event.service);
        }

        for entry in &self.logs {
            match (&entry.trace_id, &entry.span_id) {
                (Some(trace_id), span_id) => match traces.get(trace_id.as_str()) {
                    None => violations.push(CorrelationViolation::UnknownTrace {
                        log_id: entry.id.clone(),
                        trace_id: trace_id.clone(),
                    }),
                    Some(trace) => {
                        if let Some(span_id) = span_id.as_ref().filter(|id| trace.span(id).is_none()) {
                            violations.push(CorrelationViolation::UnknownSpan {
                                log_id: entry.id.clone(),
                                span_id: span_id.clone(),
                            });
                        }
                    }
                },
                (None, Some(span_id)) => violations.push(CorrelationViolation::UnknownSpan {
                    log_id: entry.id.clone(),
                    span_id: span_id.clone(),
                }),
                (None, None) => {}
            }
        }

        for event in &self.alerts {
            if !rules.contains(event.rule_id.as_str()) {
                violations.push(CorrelationViolation::UnknownRule {
                    event_id: event.id.clone(),
                    rule_id: event.rule_id.clone(),
                });
            }
        }
        violations
    }
}

/// Generates a complete data set.
///
/// Uses `config.seed` when set, fresh entropy otherwise.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, including rules that
/// watch services outside the catalogue.
pub fn generate_dataset(config: &DatasetConfig) -> Result<Dataset, ConfigError> {
    config.validate_config()?;
    let mut rng = SimRng::from_optional_seed(config.seed);

    if config.services.is_empty() {
        tracing::info!("Empty service catalogue, generated empty data set");
        return Ok(Dataset::empty(Vec::new(), config.range));
    }

    let traces = dataset_traces(config, &mut rng)?;

    let mut metrics = Vec::with_capacity(config.services.len() * 5);
    for service in &config.services {
        metrics.extend(standard_series(
            &service.name,
            config.range,
            config.metric_interval_seconds,
            &mut rng,
        )?);
    }

    let mut logs = Vec::new();
    for service in &config.services {
        let stream = LogStreamConfig::new(service.name.as_str(), config.range).with_policy(config.logs.clone());
        logs.extend(generate_log_stream(&stream, &traces, &mut rng)?);
    }
    logs.sort_by_key(|e| e.timestamp);

    let rules = config
        .rules
        .clone()
        .unwrap_or_else(|| default_rules(&config.services));
    let alert_config = AlertGenerationConfig {
        range: config.range,
        policy: config.alerts.clone(),
    };
    let alerts = generate_alert_events(&rules, &alert_config, &mut rng)?;

    let dataset = Dataset {
        services: config.services.clone(),
        range: config.range,
        traces,
        metrics,
        logs,
        rules,
        alerts,
    };
    tracing::info!(
        services = dataset.services.len(),
        traces = dataset.traces.len(),
        series = dataset.metrics.len(),
        logs = dataset.logs.len(),
        alerts = dataset.alerts.len(),
        "Generated data set"
    );
    Ok(dataset)
}

/// Traces rooted at gateway services, or at every service when the
/// catalogue has no gateway. The trace count is split evenly over roots.
fn dataset_traces(config: &DatasetConfig, rng: &mut SimRng) -> Result<Vec<Trace>, ConfigError> {
    let gateways: Vec<&ServiceDefinition> = config
        .services
        .iter()
        .filter(|s| s.kind == ServiceKind::Gateway)
        .collect();
    let roots: Vec<&ServiceDefinition> = if gateways.is_empty() {
        config.services.iter().collect()
    } else {
        gateways
    };

    let total = config.trace_count as usize;
    let mut traces = Vec::with_capacity(total);
    for (i, root) in roots.iter().enumerate() {
        let count = total / roots.len() + usize::from(i < total % roots.len());
        if count == 0 {
            continue;
        }
        let operation = root
            .operations
            .first()
            .map_or(DEFAULT_ROOT_OPERATION, String::as_str);
        let trace_config = TraceConfig::new(root.name.as_str(), operation, config.range.start)
            .with_shape(config.trace_shape.clone())
            .with_services(config.services.clone());
        traces.extend(generate_traces(&trace_config, config.range, count, rng)?);
    }
    traces.sort_by_key(Trace::start_time);
    Ok(traces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertCondition, AlertSeverity};
    use chrono::{Duration, TimeZone, Utc};

    fn config() -> DatasetConfig {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        DatasetConfig::new(TimeRange::new(start, start + Duration::hours(2)))
            .with_trace_count(20)
            .with_seed(7)
    }

    #[test]
    fn test_generated_dataset_is_consistent() {
        let dataset = generate_dataset(&config()).unwrap();
        assert_eq!(dataset.traces.len(), 20);
        assert_eq!(dataset.metrics.len(), dataset.services.len() * 5);
        assert!(!dataset.logs.is_empty());
        assert!(dataset.correlation_violations().is_empty());
        assert!(dataset
            .traces
            .iter()
            .all(|t| t.root_span().unwrap().service == "api-gateway"));
    }

    #[test]
    fn test_seed_reproduces_dataset() {
        let a = generate_dataset(&config()).unwrap();
        let b = generate_dataset(&config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_catalogue_yields_empty_dataset() {
        let dataset = generate_dataset(&config().with_services(Vec::new())).unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.correlation_violations().is_empty());
    }

    #[test]
    fn test_roots_fall_back_to_every_service() {
        let services = vec![
            ServiceDefinition::new("alpha", ServiceKind::Http).with_operation("run"),
            ServiceDefinition::new("beta", ServiceKind::Worker),
        ];
        let dataset = generate_dataset(&config().with_services(services).with_trace_count(4)).unwrap();
        let roots: HashSet<&str> = dataset
            .traces
            .iter()
            .map(|t| t.root_span().unwrap().service.as_str())
            .collect();
        assert_eq!(roots, HashSet::from(["alpha", "beta"]));
        assert!(dataset.correlation_violations().is_empty());
    }

    #[test]
    fn test_unknown_rule_service_rejected() {
        let rule = AlertRule::new(
            "r",
            "Ghost",
            "ghost",
            "cpu_usage",
            AlertCondition::Gt,
            1.0,
            AlertSeverity::Info,
        );
        assert!(matches!(
            generate_dataset(&config().with_rules(vec![rule])),
            Err(ConfigError::UnknownService { .. })
        ));
    }

    #[test]
    fn test_violations_detected() {
        let mut dataset = generate_dataset(&config()).unwrap();
        let mut entry = dataset.logs[0].clone();
        entry.trace_id = Some("missing".to_string());
        dataset.logs.push(entry);
        dataset.rules.clear();

        let violations = dataset.correlation_violations();
        assert!(violations
            .iter()
            .any(|v| matches!(v, CorrelationViolation::UnknownTrace { trace_id, .. } if trace_id == "missing")));
        if !dataset.alerts.is_empty() {
            assert!(violations
                .iter()
                .any(|v| matches!(v, CorrelationViolation::UnknownRule { .. })));
        }
    }
}
