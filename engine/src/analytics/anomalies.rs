//! Outlier detection for spans and metric series.

use super::stats::{mean, std_dev};
use crate::models::{Span, TimeSeries};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default number of standard deviations for metric anomalies.
pub const DEFAULT_ANOMALY_SIGMA: f64 = 3.0;

/// Standard deviations above the mean that make a span slow.
const SLOW_SPAN_SIGMA: f64 = 2.0;

/// Slow-span threshold in milliseconds: `mean + 2 * stddev` of durations.
///
/// Zero for no spans.
#[must_use]
pub fn slow_span_threshold_ms<'a>(spans: impl IntoIterator<Item = &'a Span>) -> f64 {
    let durations: Vec<f64> = spans.into_iter().map(Span::duration_ms).collect();
    mean(&durations) + SLOW_SPAN_SIGMA * std_dev(&durations)
}

/// Returns spans strictly slower than the threshold, slowest first.
///
/// Without `threshold_ms` the statistical threshold from
/// [`slow_span_threshold_ms`] is used, so uniform durations yield nothing.
///
/// # Example
///
/// ```
/// use engine::analytics::detect_slow_spans;
/// use engine::models::Span;
///
/// let spans = vec![
///     Span::new("t", "a", "fast", "svc").with_duration_us(1_000),
///     Span::new("t", "b", "slow", "svc").with_duration_us(90_000),
/// ];
/// let slow = detect_slow_spans(&spans, Some(50.0));
/// assert_eq!(slow[0].span_id, "b");
/// ```
#[must_use]
pub fn detect_slow_spans<'a>(
    spans: impl IntoIterator<Item = &'a Span>,
    threshold_ms: Option<f64>,
) -> Vec<&'a Span> {
    let spans: Vec<&Span> = spans.into_iter().collect();
    let threshold = threshold_ms.unwrap_or_else(|| slow_span_threshold_ms(spans.iter().copied()));

    let mut slow: Vec<&Span> = spans
        .into_iter()
        .filter(|s| s.duration_ms() > threshold)
        .collect();
    slow.sort_by(|a, b| b.duration_us.cmp(&a.duration_us));
    slow
}

/// A metric sample far from its series mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricAnomaly {
    /// Sample time.
    pub timestamp: DateTime<Utc>,
    /// Sample value.
    pub value: f64,
    /// Signed distance from the mean, in standard deviations.
    pub z_score: f64,
}

/// Finds points deviating from the series mean by more than `sigma`
/// standard deviations (default 3).
///
/// A constant or empty series has no anomalies.
#[must_use]
pub fn detect_metric_anomalies(series: &TimeSeries, sigma: Option<f64>) -> Vec<MetricAnomaly> {
    let sigma = sigma.unwrap_or(DEFAULT_ANOMALY_SIGMA);
    let values = series.values();
    let avg = mean(&values);
    let sd = std_dev(&values);
    if sd <= f64::EPSILON {
        return Vec::new();
    }

    series
        .points
        .iter()
        .filter_map(|p| {
            let z_score = (p.value - avg) / sd;
            (z_score.abs() > sigma).then_some(MetricAnomaly {
                timestamp: p.timestamp,
                value: p.value,
                z_score,
            })
        })
        .collect()
}
