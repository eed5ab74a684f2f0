//! Trace and span data models.
//!
//! A [`Trace`] is produced wholesale by the trace generator and never mutated
//! afterwards; its rollups are computed once in [`Trace::from_spans`].

use super::attributes::SpanTags;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use validator::Validate;

/// Status code for a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    /// The span completed without error.
    #[default]
    Ok,
    /// The span encountered an error.
    Error,
}

impl std::fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Kind of span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    /// Default span kind (internal operation).
    #[default]
    Internal,
    /// The span represents a server handling a request.
    Server,
    /// The span represents a client making a request.
    Client,
    /// The span represents a producer sending a message.
    Producer,
    /// The span represents a consumer receiving a message.
    Consumer,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal => write!(f, "internal"),
            Self::Server => write!(f, "server"),
            Self::Client => write!(f, "client"),
            Self::Producer => write!(f, "producer"),
            Self::Consumer => write!(f, "consumer"),
        }
    }
}

/// A span-local event, e.g. an exception or a slow-operation marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    /// The name of the event.
    pub name: String,
    /// Timestamp when the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Additional attributes for the event.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl SpanEvent {
    /// Creates an event without attributes.
    #[must_use]
    pub fn new(name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            timestamp,
            attributes: HashMap::new(),
        }
    }

    /// Adds an attribute to the event.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.attributes.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }
}

/// A span representing a unit of work in a distributed trace.
///
/// # Example
///
/// ```
/// use engine::models::{Span, SpanKind};
/// use chrono::Utc;
///
/// let span = Span::new("trace-123", "span-456", "GET /api/users", "api-service")
///     .with_kind(SpanKind::Server)
///     .with_start_time(Utc::now())
///     .with_duration_us(12_000);
///
/// assert!(span.validate_span().is_ok());
/// assert!((span.duration_ms() - 12.0).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Span {
    /// Unique identifier for the trace this span belongs to.
    #[validate(length(min = 1, message = "Trace ID cannot be empty"))]
    pub trace_id: String,

    /// Unique identifier for this span.
    #[validate(length(min = 1, message = "Span ID cannot be empty"))]
    pub span_id: String,

    /// The parent span ID (None for root spans).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,

    /// The operation this span measured.
    #[validate(length(min = 1, message = "Operation cannot be empty"))]
    pub operation: String,

    /// The service that generated this span.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,

    /// The kind of span.
    #[serde(default)]
    pub kind: SpanKind,

    /// The status of the span.
    #[serde(default)]
    pub status: SpanStatus,

    /// Timestamp when the span started.
    pub start_time: DateTime<Utc>,

    /// Duration in microseconds.
    pub duration_us: i64,

    /// Typed span attributes.
    #[serde(default)]
    pub tags: SpanTags,

    /// Span-local events, in timestamp order.
    #[serde(default)]
    pub logs: Vec<SpanEvent>,
}

/// Errors that can occur during span validation.
#[derive(Debug, Error)]
pub enum SpanValidationError {
    /// The trace ID is empty.
    #[error("Trace ID cannot be empty")]
    EmptyTraceId,

    /// The span ID is empty.
    #[error("Span ID cannot be empty")]
    EmptySpanId,

    /// The operation is empty.
    #[error("Operation cannot be empty")]
    EmptyOperation,

    /// The service name is empty.
    #[error("Service name cannot be empty")]
    EmptyService,

    /// The duration is negative.
    #[error("Duration cannot be negative")]
    NegativeDuration,

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl Span {
    /// Creates a zero-length span starting now.
    #[must_use]
    pub fn new(
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        operation: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_span_id: None,
            operation: operation.into(),
            service: service.into(),
            kind: SpanKind::default(),
            status: SpanStatus::default(),
            start_time: Utc::now(),
            duration_us: 0,
            tags: SpanTags::default(),
            logs: Vec::new(),
        }
    }

    /// Sets the parent span ID.
    #[must_use]
    pub fn with_parent(mut self, parent_span_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(parent_span_id.into());
        self
    }

    /// Sets the span kind.
    #[must_use]
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the span status.
    #[must_use]
    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the start time.
    #[must_use]
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    /// Sets the duration in microseconds.
    #[must_use]
    pub fn with_duration_us(mut self, duration_us: i64) -> Self {
        self.duration_us = duration_us;
        self
    }

    /// Sets the span tags.
    #[must_use]
    pub fn with_tags(mut self, tags: SpanTags) -> Self {
        self.tags = tags;
        self
    }

    /// Appends a span-local event.
    #[must_use]
    pub fn with_log(mut self, event: SpanEvent) -> Self {
        self.logs.push(event);
        self
    }

    /// Returns the duration of the span.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::microseconds(self.duration_us)
    }

    /// Returns the duration in (fractional) milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_ms(&self) -> f64 {
        self.duration_us as f64 / 1000.0
    }

    /// Returns the end time of the span.
    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + self.duration()
    }

    /// Returns true if this is a root span (no parent).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// Returns true if the span errored.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == SpanStatus::Error
    }

    /// Returns true if `other` lies entirely within this span's interval.
    #[must_use]
    pub fn contains(&self, other: &Span) -> bool {
        other.start_time >= self.start_time && other.end_time() <= self.end_time()
    }

    /// Returns true if `at` falls within the span, end inclusive.
    #[must_use]
    pub fn contains_time(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_time && at <= self.end_time()
    }

    /// Validates the span.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The trace ID is empty
    /// - The span ID is empty
    /// - The operation is empty
    /// - The service is empty
    /// - The duration is negative
    pub fn validate_span(&self) -> Result<(), SpanValidationError> {
        if self.trace_id.is_empty() {
            return Err(SpanValidationError::EmptyTraceId);
        }
        if self.span_id.is_empty() {
            return Err(SpanValidationError::EmptySpanId);
        }
        if self.operation.is_empty() {
            return Err(SpanValidationError::EmptyOperation);
        }
        if self.service.is_empty() {
            return Err(SpanValidationError::EmptyService);
        }
        if self.duration_us < 0 {
            return Err(SpanValidationError::NegativeDuration);
        }
        self.validate()?;
        Ok(())
    }
}

/// A trace consisting of multiple spans, with its rollups.
///
/// Fields are read-only; a trace is a value produced in one piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    trace_id: String,
    spans: Vec<Span>,
    services: Vec<String>,
    duration_us: i64,
    span_count: usize,
    error_count: usize,
    status: SpanStatus,
}

impl Trace {
    /// Creates a trace from a collection of spans.
    ///
    /// Returns `None` for an empty collection.
    #[must_use]
    pub fn from_spans(spans: Vec<Span>) -> Option<Self> {
        let first = spans.first()?;
        let trace_id = first.trace_id.clone();
        let start = first.start_time;
        let end = first.end_time();
        Some(Self::rollup(trace_id, start, end, spans))
    }

    /// Creates a trace from its root span and the root's descendants.
    #[must_use]
    pub fn from_root(root: Span, descendants: Vec<Span>) -> Self {
        let trace_id = root.trace_id.clone();
        let start = root.start_time;
        let end = root.end_time();
        let mut spans = Vec::with_capacity(descendants.len() + 1);
        spans.push(root);
        spans.extend(descendants);
        Self::rollup(trace_id, start, end, spans)
    }

    fn rollup(trace_id: String, start: DateTime<Utc>, end: DateTime<Utc>, spans: Vec<Span>) -> Self {
        let start = spans.iter().map(|s| s.start_time).fold(start, std::cmp::min);
        let end = spans.iter().map(Span::end_time).fold(end, std::cmp::max);
        let duration_us = (end - start).num_microseconds().unwrap_or(i64::MAX);

        let mut services: Vec<String> = spans.iter().map(|s| s.service.clone()).collect();
        services.sort_unstable();
        services.dedup();

        let error_count = spans.iter().filter(|s| s.is_error()).count();
        let status = if error_count > 0 {
            SpanStatus::Error
        } else {
            SpanStatus::Ok
        };

        Self {
            trace_id,
            span_count: spans.len(),
            spans,
            services,
            duration_us,
            error_count,
            status,
        }
    }

    /// Returns the trace ID.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Returns all spans in this trace.
    #[must_use]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Returns the root span if it exists.
    #[must_use]
    pub fn root_span(&self) -> Option<&Span> {
        self.spans.iter().find(|s| s.is_root())
    }

    /// Looks up a span by ID.
    #[must_use]
    pub fn span(&self, span_id: &str) -> Option<&Span> {
        self.spans.iter().find(|s| s.span_id == span_id)
    }

    /// Returns the direct children of a span, in generation order.
    #[must_use]
    pub fn children_of(&self, span_id: &str) -> Vec<&Span> {
        self.spans
            .iter()
            .filter(|s| s.parent_span_id.as_deref() == Some(span_id))
            .collect()
    }

    /// Earliest span start.
    #[must_use]
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.spans.iter().map(|s| s.start_time).min()
    }

    /// Total duration, from earliest start to latest end, in microseconds.
    #[must_use]
    pub fn duration_us(&self) -> i64 {
        self.duration_us
    }

    /// Total duration in (fractional) milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_ms(&self) -> f64 {
        self.duration_us as f64 / 1000.0
    }

    /// Returns the number of spans in this trace.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.span_count
    }

    /// Returns the number of errored spans.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Error if any span errored.
    #[must_use]
    pub fn status(&self) -> SpanStatus {
        self.status
    }

    /// Returns all services involved in this trace, sorted and deduplicated.
    #[must_use]
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Returns true if any span belongs to `service`.
    #[must_use]
    pub fn involves(&self, service: &str) -> bool {
        self.services.iter().any(|s| s == service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_at(span_id: &str, service: &str, offset_ms: i64, duration_ms: i64) -> Span {
        let base = DateTime::parse_from_rfc3339("2024-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Span::new("trace-123", span_id, "op", service)
            .with_start_time(base + Duration::milliseconds(offset_ms))
            .with_duration_us(duration_ms * 1000)
    }

    #[test]
    fn test_span_new() {
        let span = Span::new("trace-123", "span-456", "GET /api", "api-service");

        assert_eq!(span.trace_id, "trace-123");
        assert_eq!(span.span_id, "span-456");
        assert_eq!(span.operation, "GET /api");
        assert_eq!(span.service, "api-service");
        assert!(span.is_root());
        assert_eq!(span.status, SpanStatus::Ok);
    }

    #[test]
    fn test_span_with_parent() {
        let span =
            Span::new("trace-123", "span-456", "DB query", "db-service").with_parent("span-123");

        assert!(!span.is_root());
        assert_eq!(span.parent_span_id, Some("span-123".to_string()));
    }

    #[test]
    fn test_span_end_time_and_contains() {
        let parent = span_at("a", "api", 0, 100);
        let child = span_at("b", "db", 10, 50);
        let overflowing = span_at("c", "db", 60, 50);

        assert_eq!(parent.end_time() - parent.start_time, Duration::milliseconds(100));
        assert!(parent.contains(&child));
        assert!(!parent.contains(&overflowing));
    }

    #[test]
    fn test_span_validation_empty_trace_id() {
        let span = Span::new("", "span-456", "operation", "service");
        assert!(matches!(
            span.validate_span(),
            Err(SpanValidationError::EmptyTraceId)
        ));
    }

    #[test]
    fn test_span_validation_negative_duration() {
        let span = Span::new("trace-123", "span-456", "operation", "service").with_duration_us(-1);
        assert!(matches!(
            span.validate_span(),
            Err(SpanValidationError::NegativeDuration)
        ));
    }

    #[test]
    fn test_span_serialization() {
        let span = Span::new("trace-123", "span-456", "GET /api", "api").with_kind(SpanKind::Server);

        let json = serde_json::to_string(&span).unwrap();

        assert!(json.contains("\"trace_id\":\"trace-123\""));
        assert!(json.contains("\"kind\":\"server\""));
        assert!(!json.contains("parent_span_id"));
    }

    #[test]
    fn test_trace_from_empty_spans() {
        assert!(Trace::from_spans(Vec::new()).is_none());
    }

    #[test]
    fn test_trace_rollups() {
        let root = span_at("span-1", "api", 0, 100);
        let child = span_at("span-2", "db", 20, 130)
            .with_parent("span-1")
            .with_status(SpanStatus::Error);
        let sibling = span_at("span-3", "api", 5, 10).with_parent("span-1");

        let trace = Trace::from_spans(vec![root, child, sibling]).unwrap();

        assert_eq!(trace.trace_id(), "trace-123");
        assert_eq!(trace.span_count(), 3);
        assert_eq!(trace.error_count(), 1);
        assert_eq!(trace.status(), SpanStatus::Error);
        assert_eq!(trace.duration_us(), 150_000);
        assert_eq!(trace.services(), ["api".to_string(), "db".to_string()]);
        assert_eq!(trace.root_span().map(|s| s.span_id.as_str()), Some("span-1"));
        assert_eq!(trace.children_of("span-1").len(), 2);
        assert!(trace.involves("db"));
        assert!(!trace.involves("cache"));
    }

    #[test]
    fn test_span_status_display() {
        assert_eq!(SpanStatus::Ok.to_string(), "ok");
        assert_eq!(SpanStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_span_kind_display() {
        assert_eq!(SpanKind::Server.to_string(), "server");
        assert_eq!(SpanKind::Client.to_string(), "client");
        assert_eq!(SpanKind::Internal.to_string(), "internal");
    }
}
