//! Typed attribute records for spans and log entries.
//!
//! Each domain (HTTP, database, messaging) has a fixed set of keys. Anything
//! else goes into the open `custom` map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP request attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpAttributes {
    /// Request method (`GET`, `POST`, ...).
    pub method: String,
    /// Route template, e.g. `/api/orders/{id}`.
    pub route: String,
    /// Response status code.
    pub status_code: u16,
}

/// Database call attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbAttributes {
    /// Database system (`postgresql`, `redis`, ...).
    pub system: String,
    /// The statement that was executed.
    pub statement: String,
    /// Table or keyspace the statement touched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

/// Messaging attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingAttributes {
    /// Messaging system (`kafka`, `rabbitmq`, ...).
    pub system: String,
    /// Topic or queue name.
    pub destination: String,
    /// `publish` or `process`.
    pub operation: String,
}

/// Span tags: fixed-key records per domain plus an open extension map.
///
/// # Example
///
/// ```
/// use engine::models::{HttpAttributes, SpanTags};
///
/// let tags = SpanTags::default()
///     .with_http(HttpAttributes {
///         method: "GET".into(),
///         route: "/api/users".into(),
///         status_code: 200,
///     })
///     .with_custom("region", "eu-west-1");
///
/// assert!(tags.http.is_some());
/// assert_eq!(tags.custom.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanTags {
    /// HTTP attributes, for spans served or sent over HTTP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpAttributes>,
    /// Database attributes, for storage calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<DbAttributes>,
    /// Messaging attributes, for queue producers and consumers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messaging: Option<MessagingAttributes>,
    /// Free-form attributes.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom: HashMap<String, serde_json::Value>,
}

impl SpanTags {
    /// Sets the HTTP attributes.
    #[must_use]
    pub fn with_http(mut self, http: HttpAttributes) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the database attributes.
    #[must_use]
    pub fn with_db(mut self, db: DbAttributes) -> Self {
        self.db = Some(db);
        self
    }

    /// Sets the messaging attributes.
    #[must_use]
    pub fn with_messaging(mut self, messaging: MessagingAttributes) -> Self {
        self.messaging = Some(messaging);
        self
    }

    /// Adds a free-form attribute.
    #[must_use]
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.custom.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }
}

/// Request and instance metadata attached to a log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogContext {
    /// Request identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Instance (pod) that emitted the entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Host name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Deployment region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Deployed service version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Free-form attributes.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom: HashMap<String, serde_json::Value>,
}

impl LogContext {
    /// Adds a free-form attribute.
    #[must_use]
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.custom.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }
}
