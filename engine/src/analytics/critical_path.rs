//! Critical path extraction.

use crate::models::{Span, Trace};
use std::collections::{HashMap, HashSet};

/// Parent span ID to children, in trace order.
///
/// Only the first span with a given ID is indexed, and never one reusing the
/// root's ID, so walking the index down from the root always terminates.
pub(crate) fn children_index(trace: &Trace) -> HashMap<&str, Vec<&Span>> {
    let mut seen: HashSet<&str> = trace.root_span().map(|r| r.span_id.as_str()).into_iter().collect();
    let mut index: HashMap<&str, Vec<&Span>> = HashMap::new();
    for span in trace.spans() {
        let Some(parent) = &span.parent_span_id else {
            continue;
        };
        if seen.insert(span.span_id.as_str()) {
            index.entry(parent.as_str()).or_default().push(span);
        } else {
            tracing::debug!(span_id = %span.span_id, "Skipped span with duplicate ID");
        }
    }
    index
}

/// Returns the chain of spans from the root that carries the most work.
///
/// At every level the walk descends into the child whose subtree has the
/// largest summed span duration; on an exact tie the earlier child wins. An
/// empty trace yields an empty path.
///
/// # Example
///
/// ```
/// use engine::analytics::critical_path;
/// use engine::models::{Span, Trace};
///
/// let root = Span::new("t", "a", "GET /", "gateway").with_duration_us(10_000);
/// let child = Span::new("t", "b", "query", "db")
///     .with_parent("a")
///     .with_start_time(root.start_time)
///     .with_duration_us(4_000);
/// let trace = Trace::from_spans(vec![root, child]).unwrap();
///
/// let path: Vec<&str> = critical_path(&trace).iter().map(|s| s.span_id.as_str()).collect();
/// assert_eq!(path, ["a", "b"]);
/// ```
#[must_use]
pub fn critical_path(trace: &Trace) -> Vec<&Span> {
    let Some(root) = trace.root_span() else {
        return Vec::new();
    };
    let children = children_index(trace);
    let mut totals: HashMap<&str, i64> = HashMap::new();

    let mut path = vec![root];
    let mut current = root;
    while let Some(kids) = children.get(current.span_id.as_str()) {
        let mut best: Option<(&Span, i64)> = None;
        for &kid in kids {
            let total = subtree_total(kid, &children, &mut totals);
            if best.map_or(true, |(_, best_total)| total > best_total) {
                best = Some((kid, total));
            }
        }
        match best {
            Some((next, _)) => {
                path.push(next);
                current = next;
            }
            None => break,
        }
    }
    path
}

/// Summed duration of `span` and all its descendants, memoized.
fn subtree_total<'a>(
    span: &'a Span,
    children: &HashMap<&'a str, Vec<&'a Span>>,
    totals: &mut HashMap<&'a str, i64>,
) -> i64 {
    if let Some(&total) = totals.get(span.span_id.as_str()) {
        return total;
    }
    let mut total = span.duration_us;
    if let Some(kids) = children.get(span.span_id.as_str()) {
        for &kid in kids {
            total = total.saturating_add(subtree_total(kid, children, totals));
        }
    }
    totals.insert(span.span_id.as_str(), total);
    total
}
