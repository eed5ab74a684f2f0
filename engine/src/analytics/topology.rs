//! Service dependency graph derived from traces.

use crate::models::Trace;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Error rate above which a service is down.
pub const DOWN_ERROR_RATE: f64 = 0.10;

/// Error rate above which a service is degraded.
pub const DEGRADED_ERROR_RATE: f64 = 0.05;

/// Health classification of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Error rate at or below 5%.
    #[default]
    Healthy,
    /// Error rate above 5%.
    Degraded,
    /// Error rate above 10%.
    Down,
}

impl HealthStatus {
    /// Classifies an error rate in `[0, 1]`.
    #[must_use]
    pub fn from_error_rate(error_rate: f64) -> Self {
        if error_rate > DOWN_ERROR_RATE {
            Self::Down
        } else if error_rate > DEGRADED_ERROR_RATE {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }
}

/// A service in the topology.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceNode {
    /// Service name.
    pub service: String,
    /// Spans owned by the service.
    pub request_count: usize,
    /// Error spans owned by the service.
    pub error_count: usize,
    /// `error_count / request_count`.
    pub error_rate: f64,
    /// Mean span duration.
    pub avg_duration_ms: f64,
    /// Health derived from the error rate.
    pub health: HealthStatus,
}

/// Calls from one service to another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceEdge {
    /// Calling service.
    pub source: String,
    /// Called service.
    pub target: String,
    /// Parent/child span pairs across the two services.
    pub call_count: usize,
    /// Calls whose child span errored.
    pub error_count: usize,
    /// Mean duration of the child spans.
    pub avg_duration_ms: f64,
}

/// Nodes and edges, both sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceTopology {
    /// One node per service.
    pub nodes: Vec<ServiceNode>,
    /// One edge per distinct caller/callee pair of different services.
    pub edges: Vec<ServiceEdge>,
}

impl ServiceTopology {
    /// Looks up a node by service name.
    #[must_use]
    pub fn node(&self, service: &str) -> Option<&ServiceNode> {
        self.nodes.iter().find(|n| n.service == service)
    }
}

#[derive(Default)]
struct Tally {
    count: usize,
    errors: usize,
    total_ms: f64,
}

impl Tally {
    fn add(&mut self, is_error: bool, duration_ms: f64) {
        self.count += 1;
        self.errors += usize::from(is_error);
        self.total_ms += duration_ms;
    }

    #[allow(clippy::cast_precision_loss)]
    fn rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.errors as f64 / self.count as f64
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

/// Builds the service topology of `traces`.
///
/// Calls within one service produce no edge. Parents missing from their
/// trace are ignored.
#[must_use]
pub fn build_topology(traces: &[Trace]) -> ServiceTopology {
    let mut nodes: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut edges: BTreeMap<(&str, &str), Tally> = BTreeMap::new();

    for trace in traces {
        let services: HashMap<&str, &str> = trace
            .spans()
            .iter()
            .map(|s| (s.span_id.as_str(), s.service.as_str()))
            .collect();

        for span in trace.spans() {
            nodes
                .entry(span.service.as_str())
                .or_default()
                .add(span.is_error(), span.duration_ms());

            let parent_service = span
                .parent_span_id
                .as_deref()
                .and_then(|id| services.get(id).copied());
            if let Some(parent) = parent_service.filter(|p| *p != span.service) {
                edges
                    .entry((parent, span.service.as_str()))
                    .or_default()
                    .add(span.is_error(), span.duration_ms());
            }
        }
    }

    ServiceTopology {
        nodes: nodes
            .into_iter()
            .map(|(service, tally)| ServiceNode {
                service: service.to_string(),
                request_count: tally.count,
                error_count: tally.errors,
                error_rate: tally.rate(),
                avg_duration_ms: tally.avg_ms(),
                health: HealthStatus::from_error_rate(tally.rate()),
            })
            .collect(),
        edges: edges
            .into_iter()
            .map(|((source, target), tally)| ServiceEdge {
                source: source.to_string(),
                target: target.to_string(),
                call_count: tally.count,
                error_count: tally.errors,
                avg_duration_ms: tally.avg_ms(),
            })
            .collect(),
    }
}
