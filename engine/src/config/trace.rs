//! Trace tree generator configuration.

use super::{ensure_ordered, validate_catalogue, ConfigError};
use crate::models::ServiceDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Deepest tree the generator will build.
pub const MAX_TREE_DEPTH: u32 = 12;

/// Widest fan-out per node.
pub const MAX_FAN_OUT: u32 = 16;

/// Largest span count a fully branched tree may reach.
pub const MAX_SPANS_PER_TRACE: u64 = 100_000;

/// Shape parameters of a generated span tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TraceShape {
    /// Depth below which every node has children.
    #[validate(range(max = MAX_TREE_DEPTH))]
    pub min_depth: u32,
    /// Depth at which nodes become leaves.
    #[validate(range(max = MAX_TREE_DEPTH))]
    pub max_depth: u32,
    /// Minimum fan-out of an inner node.
    #[validate(range(min = 1, max = MAX_FAN_OUT, message = "Nodes with children need at least one"))]
    pub min_children: u32,
    /// Maximum fan-out of an inner node.
    #[validate(range(min = 1, max = MAX_FAN_OUT))]
    pub max_children: u32,
    /// Per-span error probability.
    #[validate(range(min = 0.0, max = 1.0))]
    pub error_probability: f64,
    /// Per-span slow-marker probability.
    #[validate(range(min = 0.0, max = 1.0))]
    pub slow_probability: f64,
    /// Probability that a node past `min_depth` has children.
    #[validate(range(min = 0.0, max = 1.0))]
    pub branch_probability: f64,
    /// Duration budget of the root, in milliseconds.
    #[validate(range(exclusive_min = 0.0, message = "Base duration must be positive"))]
    pub base_duration_ms: f64,
}

impl Default for TraceShape {
    fn default() -> Self {
        Self {
            min_depth: 1,
            max_depth: 4,
            min_children: 1,
            max_children: 3,
            error_probability: 0.02,
            slow_probability: 0.05,
            branch_probability: 0.7,
            base_duration_ms: 250.0,
        }
    }
}

impl TraceShape {
    /// Span count of a tree where every node down to `max_depth` has
    /// `max_children` children. Saturates instead of overflowing.
    #[must_use]
    pub fn worst_case_spans(&self) -> u64 {
        let fan_out = u64::from(self.max_children);
        let mut level = 1_u64;
        let mut total = 1_u64;
        for _ in 0..self.max_depth {
            level = level.saturating_mul(fan_out);
            total = total.saturating_add(level);
        }
        total
    }

    /// Validates field ranges and cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is out of range, a min/max pair is
    /// inverted, or a fully branched tree would exceed
    /// [`MAX_SPANS_PER_TRACE`] spans.
    pub fn validate_shape(&self) -> Result<(), ConfigError> {
        self.validate()?;
        ensure_ordered(
            "depth",
            f64::from(self.min_depth),
            f64::from(self.max_depth),
        )?;
        ensure_ordered(
            "children",
            f64::from(self.min_children),
            f64::from(self.max_children),
        )?;
        let worst_case = self.worst_case_spans();
        if worst_case > MAX_SPANS_PER_TRACE {
            return Err(ConfigError::TooManySpans {
                worst_case,
                limit: MAX_SPANS_PER_TRACE,
            });
        }
        Ok(())
    }
}

/// Configuration for one generated trace.
///
/// # Example
///
/// ```
/// use engine::config::TraceConfig;
/// use chrono::Utc;
///
/// let config = TraceConfig::new("api-gateway", "GET /api/products", Utc::now());
/// assert!(config.validate_config().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TraceConfig {
    /// Service of the root span.
    #[validate(length(min = 1, message = "Root service cannot be empty"))]
    pub root_service: String,
    /// Operation of the root span.
    #[validate(length(min = 1, message = "Root operation cannot be empty"))]
    pub root_operation: String,
    /// Start of the root span.
    pub start_time: DateTime<Utc>,
    /// Tree shape.
    #[serde(flatten)]
    #[validate(nested)]
    pub shape: TraceShape,
    /// Catalogue used to pick child services and operations.
    #[serde(default)]
    #[validate(nested)]
    pub services: Vec<ServiceDefinition>,
}

impl TraceConfig {
    /// Creates a configuration with the default shape and no catalogue.
    #[must_use]
    pub fn new(
        root_service: impl Into<String>,
        root_operation: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            root_service: root_service.into(),
            root_operation: root_operation.into(),
            start_time,
            shape: TraceShape::default(),
            services: Vec::new(),
        }
    }

    /// Sets the tree shape.
    #[must_use]
    pub fn with_shape(mut self, shape: TraceShape) -> Self {
        self.shape = shape;
        self
    }

    /// Sets the service catalogue.
    #[must_use]
    pub fn with_services(mut self, services: Vec<ServiceDefinition>) -> Self {
        self.services = services;
        self
    }

    /// Validates field ranges and cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The root service or operation is empty
    /// - `min_depth > max_depth` or `min_children > max_children`
    /// - A probability is outside `[0, 1]` or the base duration is not positive
    /// - The shape allows more than [`MAX_SPANS_PER_TRACE`] spans
    /// - A catalogue service calls a service outside the catalogue
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.shape.validate_shape()?;
        validate_catalogue(&self.services)
    }
}
