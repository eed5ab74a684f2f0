//! Log data model.
//!
//! Defines the `LogEntry` structure produced by the log stream generator.

use super::attributes::LogContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Log severity level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational messages.
    #[default]
    Info,
    /// Warning conditions.
    Warn,
    /// Error conditions.
    Error,
    /// Critical/fatal conditions.
    Fatal,
}

impl LogLevel {
    /// All levels in ascending severity.
    pub const ALL: [Self; 5] = [Self::Debug, Self::Info, Self::Warn, Self::Error, Self::Fatal];

    /// True for `Error` and `Fatal`.
    #[must_use]
    pub fn is_error(self) -> bool {
        self >= Self::Error
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// A log entry representing a single log event.
///
/// # Example
///
/// ```
/// use engine::models::{LogEntry, LogLevel};
/// use chrono::Utc;
///
/// let log = LogEntry::new("log-1", Utc::now(), LogLevel::Info, "User logged in", "auth-service")
///     .with_trace_id("4bf92f3577b34da6a3ce929d0e0e4736");
///
/// assert!(log.validate_entry().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LogEntry {
    /// Unique identifier.
    #[validate(length(min = 1, message = "Log ID cannot be empty"))]
    pub id: String,

    /// Timestamp when the log event occurred.
    pub timestamp: DateTime<Utc>,

    /// Name of the service that generated the log.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,

    /// Severity level of the log.
    #[serde(default)]
    pub level: LogLevel,

    /// The log message content.
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,

    /// Trace this entry was written under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// Span this entry was written under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,

    /// Request and instance metadata.
    #[serde(default)]
    pub context: LogContext,

    /// Multi-line stack trace for error entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

/// Errors that can occur during log entry validation.
#[derive(Debug, Error)]
pub enum LogValidationError {
    /// The log message is empty.
    #[error("Log message cannot be empty")]
    EmptyMessage,

    /// The service name is empty.
    #[error("Service name cannot be empty")]
    EmptyService,

    /// A span ID is present without a trace ID.
    #[error("Span ID requires a trace ID")]
    SpanWithoutTrace,

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl LogEntry {
    /// Creates a new log entry.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        level: LogLevel,
        message: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            service: service.into(),
            level,
            message: message.into(),
            trace_id: None,
            span_id: None,
            context: LogContext::default(),
            stack_trace: None,
        }
    }

    /// Sets the trace ID for distributed tracing correlation.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets the span ID for distributed tracing correlation.
    #[must_use]
    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    /// Sets the request/instance context.
    #[must_use]
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    /// Attaches a stack trace.
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    /// Validates the log entry.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The message is empty
    /// - The service name is empty
    /// - A span ID is set without a trace ID
    pub fn validate_entry(&self) -> Result<(), LogValidationError> {
        if self.message.is_empty() {
            return Err(LogValidationError::EmptyMessage);
        }
        if self.service.is_empty() {
            return Err(LogValidationError::EmptyService);
        }
        if self.span_id.is_some() && self.trace_id.is_none() {
            return Err(LogValidationError::SpanWithoutTrace);
        }
        self.validate()?;
        Ok(())
    }
}
