//! Log stream generator.
//!
//! Emits one service's log entries over a time window. Arrival gaps follow
//! the time-of-day density policy, error bursts come from a small cluster
//! state machine, and a share of entries is correlated with generated traces.

use super::synthetic_error;
use crate::config::{ClusterPolicy, ConfigError, CorrelationPolicy, LogStreamConfig};
use crate::models::{LogContext, LogEntry, LogLevel, Trace};
use crate::random::SimRng;
use chrono::{DateTime, Duration, Utc};

const REGIONS: &[&str] = &["us-east-1", "us-west-2", "eu-west-1", "ap-southeast-1"];
const VERSIONS: &[&str] = &["1.4.2", "1.4.3", "1.5.0"];
const ENDPOINTS: &[&str] = &["/api/users", "/api/orders", "/api/products", "/api/payments", "/health"];

const DEBUG_MESSAGES: &[&str] = &[
    "Cache lookup for key {key}",
    "Resolved configuration in {ms}ms",
    "Acquired connection from pool ({n} idle)",
    "Parsed request headers",
];
const INFO_MESSAGES: &[&str] = &[
    "Request completed: GET {endpoint} 200 in {ms}ms",
    "Request completed: POST {endpoint} 201 in {ms}ms",
    "User {user} authenticated",
    "Processed batch of {n} records",
    "Health check passed",
];
const WARN_MESSAGES: &[&str] = &[
    "Slow request: {endpoint} took {ms}ms",
    "Retrying downstream call (attempt {n})",
    "Connection pool usage at {pct}%",
    "Deprecated endpoint {endpoint} called",
];
const ERROR_MESSAGES: &[&str] = &[
    "Request failed: {endpoint} returned 500",
    "Database query failed after {ms}ms",
    "Downstream service unavailable",
    "Failed to publish event to queue",
];
const FATAL_MESSAGES: &[&str] = &[
    "Out of memory, shutting down worker",
    "Unrecoverable state: database connection lost",
    "Panic in request handler, restarting",
];

/// Cluster state carried across ticks.
#[derive(Debug, Default)]
struct ClusterState {
    active: bool,
    ends_at: Option<DateTime<Utc>>,
}

impl ClusterState {
    fn advance(&mut self, rng: &mut SimRng, policy: &ClusterPolicy, now: DateTime<Utc>) {
        if self.active && self.ends_at.is_some_and(|end| now > end) {
            self.active = false;
            self.ends_at = None;
        }
        if !self.active && rng.chance(policy.entry_probability) {
            let minutes = rng.random_int(policy.min_minutes, policy.max_minutes);
            self.active = true;
            self.ends_at = now.checked_add_signed(Duration::minutes(i64::from(minutes)));
        }
    }

    fn error_rate(&self, policy: &ClusterPolicy) -> f64 {
        if self.active {
            policy.cluster_error_rate
        } else {
            policy.baseline_error_rate
        }
    }
}

/// Level weights for an error rate `e`.
///
/// The error mass splits 70/15/15 over ERROR/WARN/FATAL; the rest splits
/// 80/20 over INFO/DEBUG.
#[must_use]
pub fn level_weights(error_rate: f64) -> [(LogLevel, f64); 5] {
    let e = error_rate.clamp(0.0, 1.0);
    [
        (LogLevel::Error, 0.70 * e),
        (LogLevel::Warn, 0.15 * e),
        (LogLevel::Fatal, 0.15 * e),
        (LogLevel::Info, 0.80 * (1.0 - e)),
        (LogLevel::Debug, 0.20 * (1.0 - e)),
    ]
}

/// Generates a log stream for one service.
///
/// `pool` holds the traces entries may be correlated with. Traces touching
/// the stream's service are preferred; with an empty pool no entry carries a
/// trace or span ID. Output is sorted by timestamp and every timestamp lies
/// within the configured range.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn generate_log_stream(
    config: &LogStreamConfig,
    pool: &[Trace],
    rng: &mut SimRng,
) -> Result<Vec<LogEntry>, ConfigError> {
    config.validate_config()?;

    let policy = &config.policy;
    let candidates = correlation_candidates(pool, &config.service);
    let instance_id = format!("{}-{}", config.service, &rng.span_id()[..8]);
    let host = format!("ip-10-0-{}-{}", rng.random_int(0, 255), rng.random_int(1, 254));
    let region = rng.pick(REGIONS).copied().unwrap_or("us-east-1");
    let version = rng.pick(VERSIONS).copied().unwrap_or("1.0.0");

    let mut entries = Vec::new();
    let mut cluster = ClusterState::default();
    let mut now = config.range.start;
    let mut cluster_ticks = 0_usize;

    loop {
        let multiplier = policy.density.multiplier_at(now).max(f64::MIN_POSITIVE);
        let mean_gap = 60.0 / (policy.base_frequency_per_minute * multiplier);
        #[allow(clippy::cast_possible_truncation)]
        let gap_secs = (mean_gap * (rng.uniform() + 0.5)).ceil().max(1.0) as i64;
        // An arrival past chrono's calendar is past the window too.
        let next = Duration::try_seconds(gap_secs).and_then(|gap| now.checked_add_signed(gap));
        match next {
            Some(next) if next <= config.range.end => now = next,
            _ => break,
        }

        cluster.advance(rng, &policy.cluster, now);
        if cluster.active {
            cluster_ticks += 1;
        }
        let weights = level_weights(cluster.error_rate(&policy.cluster));
        let level = rng.weighted_choice(&weights).copied().unwrap_or_default();

        let mut entry = LogEntry::new(
            rng.uuid().to_string(),
            now,
            level,
            render_message(rng, level),
            config.service.as_str(),
        )
        .with_context(LogContext {
            request_id: Some(rng.uuid().to_string()),
            instance_id: Some(instance_id.clone()),
            host: Some(host.clone()),
            region: Some(region.to_string()),
            version: Some(version.to_string()),
            ..LogContext::default()
        });

        if let Some((trace_id, span_id)) =
            correlate(rng, &candidates, &policy.correlation, &config.service)
        {
            entry.trace_id = Some(trace_id);
            entry.span_id = span_id;
        }
        if level.is_error() {
            let error = synthetic_error(rng, &config.service, "handle_request");
            entry.stack_trace = Some(error.stack_trace);
            entry.context = entry.context.with_custom("error.type", error.kind);
        }
        entries.push(entry);
    }

    entries.sort_by_key(|e| e.timestamp);
    tracing::debug!(
        service = %config.service,
        entries = entries.len(),
        errors = entries.iter().filter(|e| e.level.is_error()).count(),
        cluster_ticks,
        "Generated log stream"
    );
    Ok(entries)
}

fn correlation_candidates<'a>(pool: &'a [Trace], service: &str) -> Vec<&'a Trace> {
    let touching: Vec<&Trace> = pool.iter().filter(|t| t.involves(service)).collect();
    if touching.is_empty() {
        pool.iter().collect()
    } else {
        touching
    }
}

/// Draws correlation IDs. Spans are attached conditionally on a trace so the
/// overall span share equals `span_probability`.
fn correlate(
    rng: &mut SimRng,
    candidates: &[&Trace],
    policy: &CorrelationPolicy,
    service: &str,
) -> Option<(String, Option<String>)> {
    if candidates.is_empty() || !rng.chance(policy.trace_probability) {
        return None;
    }
    let trace = *rng.pick(candidates)?;

    let span_share = if policy.trace_probability > 0.0 {
        policy.span_probability / policy.trace_probability
    } else {
        0.0
    };
    let span_id = if rng.chance(span_share) {
        let own: Vec<_> = trace.spans().iter().filter(|s| s.service == service).collect();
        let span = if own.is_empty() {
            rng.pick(trace.spans())
        } else {
            rng.pick(&own).copied()
        };
        span.map(|s| s.span_id.clone())
    } else {
        None
    };
    Some((trace.trace_id().to_string(), span_id))
}

fn render_message(rng: &mut SimRng, level: LogLevel) -> String {
    let templates = match level {
        LogLevel::Debug => DEBUG_MESSAGES,
        LogLevel::Info => INFO_MESSAGES,
        LogLevel::Warn => WARN_MESSAGES,
        LogLevel::Error => ERROR_MESSAGES,
        LogLevel::Fatal => FATAL_MESSAGES,
    };
    let template = rng.pick(templates).copied().unwrap_or("Event");
    let endpoint = rng.pick(ENDPOINTS).copied().unwrap_or("/");
    template
        .replace("{endpoint}", endpoint)
        .replace("{ms}", &rng.random_int(5, 2_500).to_string())
        .replace("{n}", &rng.random_int(1, 50).to_string())
        .replace("{pct}", &rng.random_int(80, 99).to_string())
        .replace("{user}", &format!("user-{}", rng.random_int(1_000, 9_999)))
        .replace("{key}", &format!("session:{}", &rng.span_id()[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogPolicy, TimeRange, TraceConfig};
    use crate::generators::generate_traces;
    use crate::models::default_catalogue;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn monday(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap()
    }

    fn config(hours: i64) -> LogStreamConfig {
        LogStreamConfig::new(
            "order-service",
            TimeRange::new(monday(8), monday(8) + Duration::hours(hours)),
        )
    }

    fn pool() -> Vec<Trace> {
        let trace_config = TraceConfig::new("api-gateway", "POST /api/orders", monday(8))
            .with_services(default_catalogue());
        generate_traces(&trace_config, config(2).range, 30, &mut SimRng::seeded(99)).unwrap()
    }

    #[test]
    fn test_level_weights_sum_to_one() {
        for e in [0.0, 0.005, 0.1, 1.0] {
            let total: f64 = level_weights(e).iter().map(|(_, w)| w).sum();
            assert!((total - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_entries_sorted_and_in_range() {
        let cfg = config(2);
        let entries = generate_log_stream(&cfg, &[], &mut SimRng::seeded(1)).unwrap();
        assert!(!entries.is_empty());
        for pair in entries.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        assert!(entries.iter().all(|e| cfg.range.contains(e.timestamp)));
        assert!(entries.iter().all(|e| e.validate_entry().is_ok()));
    }

    #[test]
    fn test_empty_pool_has_no_correlation() {
        let entries = generate_log_stream(&config(2), &[], &mut SimRng::seeded(2)).unwrap();
        assert!(entries.iter().all(|e| e.trace_id.is_none() && e.span_id.is_none()));
    }

    #[test]
    fn test_correlation_ids_resolve_in_pool() {
        let pool = pool();
        let trace_ids: HashSet<&str> = pool.iter().map(Trace::trace_id).collect();
        let entries = generate_log_stream(&config(2), &pool, &mut SimRng::seeded(3)).unwrap();

        let correlated: Vec<&LogEntry> = entries.iter().filter(|e| e.trace_id.is_some()).collect();
        assert!(!correlated.is_empty());
        for entry in correlated {
            let trace_id = entry.trace_id.as_deref().unwrap();
            assert!(trace_ids.contains(trace_id));
            if let Some(span_id) = &entry.span_id {
                let trace = pool.iter().find(|t| t.trace_id() == trace_id).unwrap();
                assert!(trace.span(span_id).is_some());
            }
        }
        assert!(entries.iter().all(|e| e.span_id.is_none() || e.trace_id.is_some()));
    }

    #[test]
    fn test_errors_carry_stack_traces() {
        let mut policy = LogPolicy::default();
        policy.cluster.baseline_error_rate = 0.5;
        let entries =
            generate_log_stream(&config(1).with_policy(policy), &[], &mut SimRng::seeded(4)).unwrap();
        assert!(entries.iter().any(|e| e.level.is_error()));
        for entry in &entries {
            assert_eq!(entry.level.is_error(), entry.stack_trace.is_some());
        }
    }

    #[test]
    fn test_zero_error_rates_emit_no_errors() {
        let mut policy = LogPolicy::default();
        policy.cluster.baseline_error_rate = 0.0;
        policy.cluster.cluster_error_rate = 0.0;
        let entries =
            generate_log_stream(&config(3).with_policy(policy), &[], &mut SimRng::seeded(5)).unwrap();
        assert!(entries
            .iter()
            .all(|e| matches!(e.level, LogLevel::Info | LogLevel::Debug)));
    }

    #[test]
    fn test_night_is_quieter_than_peak() {
        let night = LogStreamConfig::new("svc", TimeRange::new(monday(1), monday(4)));
        let peak = LogStreamConfig::new("svc", TimeRange::new(monday(14), monday(17)));
        let night_count = generate_log_stream(&night, &[], &mut SimRng::seeded(6)).unwrap().len();
        let peak_count = generate_log_stream(&peak, &[], &mut SimRng::seeded(6)).unwrap().len();
        assert!(night_count * 2 < peak_count, "{night_count} vs {peak_count}");
    }

    #[test]
    fn test_range_shorter_than_gap_is_empty() {
        let cfg = LogStreamConfig::new("svc", TimeRange::new(monday(10), monday(10)));
        assert!(generate_log_stream(&cfg, &[], &mut SimRng::seeded(7)).unwrap().is_empty());
    }

    #[test]
    fn test_vanishing_frequency_ends_stream() {
        for per_minute in [1e-12, f64::MIN_POSITIVE] {
            let cfg = config(24).with_frequency(per_minute);
            assert!(cfg.validate_config().is_ok());
            let entries = generate_log_stream(&cfg, &[], &mut SimRng::seeded(10)).unwrap();
            assert!(entries.is_empty());
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let a = generate_log_stream(&config(1), &[], &mut SimRng::seeded(8)).unwrap();
        let b = generate_log_stream(&config(1), &[], &mut SimRng::seeded(8)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cluster_state_expires() {
        let policy = ClusterPolicy {
            entry_probability: 1.0,
            min_minutes: 5,
            max_minutes: 5,
            ..ClusterPolicy::default()
        };
        let mut rng = SimRng::seeded(9);
        let mut state = ClusterState::default();
        state.advance(&mut rng, &policy, monday(10));
        assert!(state.active);
        assert_eq!(state.ends_at, Some(monday(10) + Duration::minutes(5)));

        let never = ClusterPolicy {
            entry_probability: 0.0,
            ..policy
        };
        state.advance(&mut rng, &never, monday(10) + Duration::minutes(6));
        assert!(!state.active);
    }
}
