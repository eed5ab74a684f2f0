//! Summary statistics over generated telemetry.
//!
//! Every rollup returns zeroed values for empty input.

use crate::models::{AlertEvent, AlertState, LogEntry, LogLevel, Span, TimeSeries, Trace};
use serde::Serialize;
use std::collections::BTreeMap;

/// Arithmetic mean; zero for no values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; zero for no values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Nearest-rank percentile of ascending `sorted` values; zero when empty.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Trace-level statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceStats {
    /// Number of traces.
    pub trace_count: usize,
    /// Number of spans across all traces.
    pub span_count: usize,
    /// Traces containing at least one error span.
    pub error_trace_count: usize,
    /// `error_trace_count / trace_count`.
    pub error_rate: f64,
    /// Mean trace duration.
    pub avg_duration_ms: f64,
    /// Median trace duration.
    pub p50_duration_ms: f64,
    /// 95th percentile trace duration.
    pub p95_duration_ms: f64,
    /// 99th percentile trace duration.
    pub p99_duration_ms: f64,
}

/// Computes [`TraceStats`].
#[must_use]
pub fn trace_stats(traces: &[Trace]) -> TraceStats {
    let durations = sorted(traces.iter().map(Trace::duration_ms).collect());
    let error_trace_count = traces.iter().filter(|t| t.error_count() > 0).count();
    TraceStats {
        trace_count: traces.len(),
        span_count: traces.iter().map(Trace::span_count).sum(),
        error_trace_count,
        error_rate: ratio(error_trace_count, traces.len()),
        avg_duration_ms: mean(&durations),
        p50_duration_ms: percentile(&durations, 50.0),
        p95_duration_ms: percentile(&durations, 95.0),
        p99_duration_ms: percentile(&durations, 99.0),
    }
}

/// Per-service span statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    /// Service name.
    pub service: String,
    /// Spans owned by the service.
    pub span_count: usize,
    /// Error spans owned by the service.
    pub error_count: usize,
    /// `error_count / span_count`.
    pub error_rate: f64,
    /// Mean span duration.
    pub avg_duration_ms: f64,
    /// 95th percentile span duration.
    pub p95_duration_ms: f64,
}

/// Computes [`ServiceStats`] for every service, sorted by name.
#[must_use]
pub fn service_stats(traces: &[Trace]) -> Vec<ServiceStats> {
    let mut by_service: BTreeMap<&str, Vec<&Span>> = BTreeMap::new();
    for span in traces.iter().flat_map(Trace::spans) {
        by_service.entry(span.service.as_str()).or_default().push(span);
    }

    by_service
        .into_iter()
        .map(|(service, spans)| {
            let durations = sorted(spans.iter().map(|s| s.duration_ms()).collect());
            let error_count = spans.iter().filter(|s| s.is_error()).count();
            ServiceStats {
                service: service.to_string(),
                span_count: spans.len(),
                error_count,
                error_rate: ratio(error_count, spans.len()),
                avg_duration_ms: mean(&durations),
                p95_duration_ms: percentile(&durations, 95.0),
            }
        })
        .collect()
}

/// Log statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogStats {
    /// Number of entries.
    pub total: usize,
    /// Entries per level; every level is present.
    pub by_level: BTreeMap<LogLevel, usize>,
    /// ERROR and FATAL entries.
    pub error_count: usize,
    /// `error_count / total`.
    pub error_rate: f64,
    /// Entries carrying a trace ID.
    pub correlated_count: usize,
}

/// Computes [`LogStats`].
#[must_use]
pub fn log_stats(entries: &[LogEntry]) -> LogStats {
    let mut by_level: BTreeMap<LogLevel, usize> = LogLevel::ALL.iter().map(|l| (*l, 0)).collect();
    for entry in entries {
        *by_level.entry(entry.level).or_default() += 1;
    }
    let error_count = entries.iter().filter(|e| e.level.is_error()).count();
    LogStats {
        total: entries.len(),
        by_level,
        error_count,
        error_rate: ratio(error_count, entries.len()),
        correlated_count: entries.iter().filter(|e| e.trace_id.is_some()).count(),
    }
}

/// Alert statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertStats {
    /// Number of events.
    pub total: usize,
    /// Unacknowledged, unresolved events.
    pub firing: usize,
    /// Acknowledged, unresolved events.
    pub acknowledged: usize,
    /// Resolved events.
    pub resolved: usize,
    /// Mean time from trigger to resolution over resolved events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_time_to_resolve_minutes: Option<f64>,
}

/// Computes [`AlertStats`].
#[must_use]
pub fn alert_stats(events: &[AlertEvent]) -> AlertStats {
    let mut stats = AlertStats {
        total: events.len(),
        ..AlertStats::default()
    };
    let mut resolve_minutes = Vec::new();
    for event in events {
        match event.state() {
            AlertState::Firing => stats.firing += 1,
            AlertState::Acknowledged => stats.acknowledged += 1,
            AlertState::Resolved => stats.resolved += 1,
        }
        if let Some(ttr) = event.time_to_resolve() {
            #[allow(clippy::cast_precision_loss)]
            resolve_minutes.push(ttr.num_milliseconds() as f64 / 60_000.0);
        }
    }
    if !resolve_minutes.is_empty() {
        stats.mean_time_to_resolve_minutes = Some(mean(&resolve_minutes));
    }
    stats
}

/// Summary of one metric series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    /// Series identifier.
    pub metric_id: String,
    /// Number of points.
    pub count: usize,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Mean value.
    pub avg: f64,
    /// Most recent value.
    pub last: f64,
    /// 95th percentile value.
    pub p95: f64,
}

/// Summarizes a series. All values are zero for an empty series.
#[must_use]
pub fn summarize_series(series: &TimeSeries) -> SeriesSummary {
    let values = series.values();
    let ordered = sorted(values.clone());
    SeriesSummary {
        metric_id: series.metric_id.clone(),
        count: values.len(),
        min: ordered.first().copied().unwrap_or(0.0),
        max: ordered.last().copied().unwrap_or(0.0),
        avg: mean(&values),
        last: series.last_value().unwrap_or(0.0),
        p95: percentile(&ordered, 95.0),
    }
}
