//! Flame graph construction.

use super::critical_path::{children_index, critical_path};
use crate::models::{Span, SpanStatus, Trace};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One frame of a flame graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlameNode {
    /// Span ID.
    pub span_id: String,
    /// Operation name.
    pub name: String,
    /// Owning service.
    pub service: String,
    /// Offset from the trace start, in microseconds.
    pub start_offset_us: i64,
    /// Span duration, in microseconds.
    pub duration_us: i64,
    /// Duration not covered by direct children, floored at zero.
    pub self_time_us: i64,
    /// Distance from the root.
    pub depth: u32,
    /// Span status.
    pub status: SpanStatus,
    /// True if the span lies on the critical path.
    pub on_critical_path: bool,
    /// Child frames, in trace order.
    pub children: Vec<FlameNode>,
}

impl FlameNode {
    /// Number of frames in this subtree.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        1 + self.children.iter().map(FlameNode::frame_count).sum::<usize>()
    }
}

/// Builds the flame graph of `trace`, rooted at its root span.
///
/// Returns `None` when the trace has no root span.
#[must_use]
pub fn flame_graph(trace: &Trace) -> Option<FlameNode> {
    let root = trace.root_span()?;
    let start = trace.start_time()?;
    let children = children_index(trace);
    let on_path: HashSet<&str> = critical_path(trace)
        .into_iter()
        .map(|s| s.span_id.as_str())
        .collect();

    let builder = FlameBuilder {
        start,
        children: &children,
        on_path: &on_path,
    };
    Some(builder.node(root, 0))
}

struct FlameBuilder<'a> {
    start: DateTime<Utc>,
    children: &'a HashMap<&'a str, Vec<&'a Span>>,
    on_path: &'a HashSet<&'a str>,
}

impl FlameBuilder<'_> {
    fn node(&self, span: &Span, depth: u32) -> FlameNode {
        let kids: Vec<FlameNode> = self
            .children
            .get(span.span_id.as_str())
            .map(|kids| kids.iter().map(|kid| self.node(kid, depth + 1)).collect())
            .unwrap_or_default();
        let child_time: i64 = kids.iter().map(|k| k.duration_us).sum();

        FlameNode {
            span_id: span.span_id.clone(),
            name: span.operation.clone(),
            service: span.service.clone(),
            start_offset_us: (span.start_time - self.start).num_microseconds().unwrap_or(0),
            duration_us: span.duration_us,
            self_time_us: (span.duration_us - child_time).max(0),
            depth,
            status: span.status,
            on_critical_path: self.on_path.contains(span.span_id.as_str()),
            children: kids,
        }
    }
}
