//! Alert history generator.
//!
//! Each enabled rule fires `ceil(days * density)` times at uniform trigger
//! times. Incidents last an exponentially distributed multiple of the average
//! duration; events that would outlive the window stay firing.

use crate::config::{AlertGenerationConfig, ConfigError};
use crate::models::{AlertCondition, AlertEvent, AlertRule, AlertSeverity, ServiceDefinition};
use crate::random::SimRng;
use chrono::Duration;
use validator::Validate;

const MIN_INCIDENT_MS: i64 = 1_000;

/// Generates alert events for `rules` over the configured window.
///
/// Events from all rules are merged and sorted by trigger time. Disabled
/// rules never fire.
///
/// # Errors
///
/// Returns an error if the configuration or any rule is invalid.
///
/// # Example
///
/// ```
/// use engine::config::{AlertGenerationConfig, TimeRange};
/// use engine::generators::{default_rules, generate_alert_events};
/// use engine::models::default_catalogue;
/// use engine::random::SimRng;
/// use chrono::{Duration, Utc};
///
/// let config = AlertGenerationConfig::new(TimeRange::last(Utc::now(), Duration::days(7)));
/// let rules = default_rules(&default_catalogue());
/// let events = generate_alert_events(&rules, &config, &mut SimRng::seeded(1)).unwrap();
/// assert!(events.windows(2).all(|w| w[0].triggered_at <= w[1].triggered_at));
/// ```
pub fn generate_alert_events(
    rules: &[AlertRule],
    config: &AlertGenerationConfig,
    rng: &mut SimRng,
) -> Result<Vec<AlertEvent>, ConfigError> {
    config.validate_config()?;
    for rule in rules {
        rule.validate()?;
    }

    let policy = &config.policy;
    let range = config.range;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let per_rule = (range.days() * policy.event_density_per_day).ceil().max(0.0) as usize;

    let mut events = Vec::new();
    for rule in rules.iter().filter(|r| r.enabled) {
        for _ in 0..per_rule {
            let triggered_at = range.start + Duration::milliseconds(rng.random_i64(0, range.duration_ms()));
            let value = crossing_value(rng, rule.condition, rule.threshold);
            let mut event = AlertEvent::firing(rng.uuid().to_string(), rule, value, triggered_at);

            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = ((policy.avg_duration_minutes * rng.exponential(0.5, 2.0) * 60_000.0)
                .round() as i64)
                .max(MIN_INCIDENT_MS);
            // A resolution past chrono's calendar is past the window too.
            let resolved_at = Duration::try_milliseconds(duration_ms)
                .and_then(|d| triggered_at.checked_add_signed(d))
                .filter(|at| *at < range.end);

            if rng.chance(policy.ack_probability) {
                let window_ms = i64::from(policy.ack_window_minutes) * 60_000;
                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
                let offset_ms = ((rng.uniform() * window_ms as f64) as i64).max(MIN_INCIDENT_MS);
                let offset_ack = triggered_at.checked_add_signed(Duration::milliseconds(offset_ms));
                let acked_at = match resolved_at {
                    Some(resolved) if offset_ack.map_or(true, |at| at >= resolved) => {
                        Some(triggered_at + (resolved - triggered_at) / 2)
                    }
                    _ => offset_ack,
                };
                if let Some(acked_at) = acked_at.filter(|at| *at <= range.end) {
                    let responder = rng
                        .pick(&policy.responders)
                        .map_or("oncall", String::as_str)
                        .to_string();
                    if let Err(e) = event.acknowledge(responder, acked_at) {
                        tracing::warn!(error = %e, "Skipped acknowledgement");
                    }
                }
            }
            if let Some(at) = resolved_at {
                if let Err(e) = event.resolve(at) {
                    tracing::warn!(error = %e, "Skipped resolution");
                }
            }
            events.push(event);
        }
    }

    events.sort_by_key(|e| e.triggered_at);
    tracing::debug!(
        rules = rules.len(),
        events = events.len(),
        resolved = events.iter().filter(|e| e.resolved_at.is_some()).count(),
        "Generated alert events"
    );
    Ok(events)
}

/// A value that satisfies `condition` against `threshold`.
fn crossing_value(rng: &mut SimRng, condition: AlertCondition, threshold: f64) -> f64 {
    let margin = threshold.abs().max(1.0) * rng.range(0.05, 0.5);
    match condition {
        AlertCondition::Gt | AlertCondition::Gte | AlertCondition::Ne => threshold + margin,
        AlertCondition::Lt | AlertCondition::Lte => threshold - margin,
        AlertCondition::Eq => threshold,
    }
}

/// Standard rules for every catalogue service: high CPU, elevated error rate
/// and slow p95 latency.
#[must_use]
pub fn default_rules(services: &[ServiceDefinition]) -> Vec<AlertRule> {
    services
        .iter()
        .flat_map(|service| {
            let name = service.name.as_str();
            [
                AlertRule::new(
                    format!("{name}-cpu"),
                    "High CPU usage",
                    name,
                    "cpu_usage",
                    AlertCondition::Gt,
                    85.0,
                    AlertSeverity::Warning,
                ),
                AlertRule::new(
                    format!("{name}-errors"),
                    "Elevated error rate",
                    name,
                    "error_rate",
                    AlertCondition::Gt,
                    5.0,
                    AlertSeverity::Critical,
                )
                .with_duration_minutes(2),
                AlertRule::new(
                    format!("{name}-latency"),
                    "Slow responses",
                    name,
                    "latency_p95",
                    AlertCondition::Gte,
                    1_000.0,
                    AlertSeverity::Warning,
                )
                .with_duration_minutes(10),
            ]
        })
        .collect()
}
