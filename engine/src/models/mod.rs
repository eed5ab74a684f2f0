//! Data models for generated telemetry.
//!
//! This module contains the core data structures for traces, metrics, logs,
//! alerts and the service catalogue that ties them together.

pub mod alert;
pub mod attributes;
pub mod log;
pub mod metric;
pub mod service;
pub mod trace;

pub use alert::{
    AlertCondition, AlertEvent, AlertLifecycleError, AlertRule, AlertSeverity, AlertState,
};
pub use attributes::{DbAttributes, HttpAttributes, LogContext, MessagingAttributes, SpanTags};
pub use log::{LogEntry, LogLevel, LogValidationError};
pub use metric::{MetricPoint, MetricType, MetricValidationError, TimeSeries};
pub use service::{default_catalogue, ServiceDefinition, ServiceKind};
pub use trace::{Span, SpanEvent, SpanKind, SpanStatus, SpanValidationError, Trace};
