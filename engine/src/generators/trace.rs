//! Trace tree generator.
//!
//! Builds one distributed request as a span tree. Each call to the node
//! builder returns its own subtree, so there is no accumulator shared across
//! the recursion. All timing is integer microseconds; a parent's final
//! duration is stretched to cover its last child, so containment is exact.

use super::synthetic_error;
use crate::config::{ConfigError, TimeRange, TraceConfig};
use crate::models::{
    DbAttributes, HttpAttributes, MessagingAttributes, ServiceDefinition, ServiceKind, Span,
    SpanEvent, SpanKind, SpanStatus, SpanTags, Trace,
};
use crate::random::SimRng;
use chrono::{DateTime, Duration, Utc};

/// Gap before each child, in microseconds.
const MIN_CHILD_GAP_US: i64 = 1_000;
const MAX_CHILD_GAP_US: i64 = 10_000;

/// Share of the children budget actually handed to children; the rest is
/// slack for the gaps between them.
const CHILD_BUDGET_SHARE: f64 = 0.8;

/// Generates one trace.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
///
/// # Example
///
/// ```
/// use engine::config::TraceConfig;
/// use engine::generators::generate_trace;
/// use engine::random::SimRng;
/// use chrono::Utc;
///
/// let config = TraceConfig::new("api-gateway", "GET /api/products", Utc::now());
/// let trace = generate_trace(&config, &mut SimRng::seeded(3)).unwrap();
/// assert_eq!(trace.root_span().unwrap().service, "api-gateway");
/// ```
pub fn generate_trace(config: &TraceConfig, rng: &mut SimRng) -> Result<Trace, ConfigError> {
    config.validate_config()?;

    let trace_id = rng.trace_id();
    let builder = TreeBuilder {
        config,
        trace_id: &trace_id,
    };
    let root_service = builder.resolve(&config.root_service);
    #[allow(clippy::cast_possible_truncation)]
    let budget_us = (config.shape.base_duration_ms * 1000.0).round().max(1.0) as i64;

    let root = builder.build_node(
        rng,
        NodeRequest {
            depth: 0,
            service: root_service,
            operation: config.root_operation.clone(),
            parent_span_id: None,
            parent_service: None,
            start: config.start_time,
            budget_us,
        },
    );

    let trace = Trace::from_root(root.span, root.descendants);
    tracing::debug!(
        trace_id = %trace.trace_id(),
        spans = trace.span_count(),
        errors = trace.error_count(),
        duration_ms = trace.duration_ms(),
        "Generated trace"
    );
    Ok(trace)
}

/// Generates `count` traces with start times spread uniformly over `range`.
///
/// Root operations are drawn from the root service's catalogue entry when it
/// lists any; otherwise `config.root_operation` is used. Output is ordered by
/// start time.
///
/// # Errors
///
/// Returns an error if the configuration or range is invalid.
pub fn generate_traces(
    config: &TraceConfig,
    range: TimeRange,
    count: usize,
    rng: &mut SimRng,
) -> Result<Vec<Trace>, ConfigError> {
    config.validate_config()?;
    range.validate_range()?;

    let operations: Vec<String> = config
        .services
        .iter()
        .find(|s| s.name == config.root_service)
        .map(|s| s.operations.clone())
        .unwrap_or_default();

    let mut traces = Vec::with_capacity(count);
    for _ in 0..count {
        let offset_ms = rng.random_i64(0, range.duration_ms());
        let mut per_trace = config.clone();
        per_trace.start_time = range.start + Duration::milliseconds(offset_ms);
        if let Some(op) = rng.pick(&operations) {
            per_trace.root_operation.clone_from(op);
        }
        traces.push(generate_trace(&per_trace, rng)?);
    }
    traces.sort_by_key(Trace::start_time);
    Ok(traces)
}

/// Service identity as seen by the builder.
#[derive(Clone, Copy)]
struct ServiceRef<'a> {
    name: &'a str,
    kind: ServiceKind,
    definition: Option<&'a ServiceDefinition>,
}

struct NodeRequest<'a> {
    depth: u32,
    service: ServiceRef<'a>,
    operation: String,
    parent_span_id: Option<String>,
    parent_service: Option<&'a str>,
    start: DateTime<Utc>,
    budget_us: i64,
}

/// A finished subtree: its root span, every descendant in pre-order, and the
/// subtree's end time.
struct Subtree {
    span: Span,
    descendants: Vec<Span>,
    end: DateTime<Utc>,
}

struct TreeBuilder<'a> {
    config: &'a TraceConfig,
    trace_id: &'a str,
}

impl<'a> TreeBuilder<'a> {
    fn resolve(&self, name: &'a str) -> ServiceRef<'a> {
        let definition = self.config.services.iter().find(|s| s.name == name);
        ServiceRef {
            name,
            kind: definition.map_or(ServiceKind::Http, |d| d.kind),
            definition,
        }
    }

    fn build_node(&self, rng: &mut SimRng, req: NodeRequest<'a>) -> Subtree {
        let shape = &self.config.shape;
        let span_id = rng.span_id();

        let child_count = if req.depth >= shape.max_depth {
            0
        } else if req.depth < shape.min_depth || rng.chance(shape.branch_probability) {
            rng.random_int(shape.min_children, shape.max_children)
        } else {
            0
        };

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let self_time_us = (req.budget_us as f64 * (0.2 + rng.uniform() * 0.3)).round() as i64;

        let mut descendants = Vec::new();
        let mut last_child_end = req.start;
        if child_count > 0 {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            let child_budget_us = ((req.budget_us - self_time_us) as f64 / f64::from(child_count)
                * CHILD_BUDGET_SHARE)
                .round()
                .max(1.0) as i64;

            let mut cursor = req.start + Duration::microseconds(self_time_us / 2);
            for _ in 0..child_count {
                cursor += Duration::microseconds(rng.random_i64(MIN_CHILD_GAP_US, MAX_CHILD_GAP_US));
                let (service, operation) = self.pick_callee(rng, req.service);
                let child = self.build_node(
                    rng,
                    NodeRequest {
                        depth: req.depth + 1,
                        service,
                        operation,
                        parent_span_id: Some(span_id.clone()),
                        parent_service: Some(req.service.name),
                        start: cursor,
                        budget_us: child_budget_us,
                    },
                );
                cursor = child.end;
                last_child_end = child.end;
                descendants.push(child.span);
                descendants.extend(child.descendants);
            }
        }

        let children_span_us = (last_child_end - req.start)
            .num_microseconds()
            .unwrap_or(i64::MAX);
        let duration_us = self_time_us.max(children_span_us);

        let is_error = rng.chance(shape.error_probability);
        let is_slow = rng.chance(shape.slow_probability);

        let tags = span_tags(rng, req.service, &req.operation, is_error);
        let mut span = Span::new(self.trace_id, span_id, req.operation, req.service.name)
            .with_kind(span_kind(req.service, req.parent_service))
            .with_start_time(req.start)
            .with_duration_us(duration_us)
            .with_tags(tags);
        span.parent_span_id = req.parent_span_id;

        if is_error {
            span.status = SpanStatus::Error;
            let error = synthetic_error(rng, &span.service, &span.operation);
            let exception = SpanEvent::new("exception", event_time(rng, &span))
                .with_attribute("exception.type", error.kind)
                .with_attribute("exception.message", error.message)
                .with_attribute("exception.stacktrace", error.stack_trace);
            span = span.with_log(exception);
        }
        if is_slow {
            span.tags = span.tags.with_custom("slow", true);
            let slow = SpanEvent::new("slow_operation", event_time(rng, &span))
                .with_attribute("duration_ms", span.duration_ms());
            span = span.with_log(slow);
        }
        span.logs.sort_by_key(|e| e.timestamp);

        let end = span.end_time();
        Subtree {
            span,
            descendants,
            end,
        }
    }

    /// Chooses the service and operation of a child call.
    ///
    /// Declared downstream services win. A catalogued service without
    /// dependencies does internal work on itself; an uncatalogued one calls
    /// into any catalogue service.
    fn pick_callee(&self, rng: &mut SimRng, parent: ServiceRef<'a>) -> (ServiceRef<'a>, String) {
        let services = &self.config.services;
        let callee = match parent.definition {
            Some(def) if !def.downstream.is_empty() => rng
                .pick(&def.downstream)
                .map_or(parent, |name| self.resolve(name)),
            Some(_) => parent,
            None => rng
                .pick(services)
                .map_or(parent, |def| self.resolve(&def.name)),
        };

        let operation = callee
            .definition
            .and_then(|def| rng.pick(&def.operations).cloned())
            .unwrap_or_else(|| "process".to_string());
        (callee, operation)
    }
}

fn span_kind(service: ServiceRef<'_>, parent_service: Option<&str>) -> SpanKind {
    match parent_service {
        None => return SpanKind::Server,
        Some(parent) if parent == service.name => return SpanKind::Internal,
        Some(_) => {}
    }
    match service.kind {
        ServiceKind::Database | ServiceKind::Cache => SpanKind::Client,
        ServiceKind::Queue => SpanKind::Producer,
        ServiceKind::Worker => SpanKind::Consumer,
        ServiceKind::Gateway | ServiceKind::Http => SpanKind::Server,
    }
}

fn span_tags(rng: &mut SimRng, service: ServiceRef<'_>, operation: &str, is_error: bool) -> SpanTags {
    let tags = SpanTags::default().with_custom("service.kind", service.kind);
    let tags = match service.kind {
        ServiceKind::Gateway | ServiceKind::Http => {
            let (method, route) = split_http_operation(operation);
            let status_code = if is_error {
                *rng.pick(&[500_u16, 502, 503, 504]).unwrap_or(&500)
            } else if method == "POST" {
                201
            } else {
                200
            };
            tags.with_http(HttpAttributes {
                method,
                route,
                status_code,
            })
        }
        ServiceKind::Database => {
            let table = rng
                .pick(&["users", "orders", "products", "payments"])
                .copied()
                .unwrap_or("users");
            tags.with_db(DbAttributes {
                system: "postgresql".to_string(),
                statement: sql_statement(operation, table),
                table: Some(table.to_string()),
            })
        }
        ServiceKind::Cache => tags.with_db(DbAttributes {
            system: "redis".to_string(),
            statement: format!("{operation} {}:{}", service.name, rng.random_int(1, 9_999)),
            table: None,
        }),
        ServiceKind::Queue => tags.with_messaging(MessagingAttributes {
            system: "kafka".to_string(),
            destination: operation
                .split_whitespace()
                .last()
                .unwrap_or("events")
                .to_string(),
            operation: "publish".to_string(),
        }),
        ServiceKind::Worker => tags.with_custom("job.name", operation),
    };
    if is_error {
        tags.with_custom("error", true)
    } else {
        tags
    }
}

/// Splits `"GET /api/users"` into method and route; RPC-style names become
/// `POST /rpc/<name>`.
fn split_http_operation(operation: &str) -> (String, String) {
    match operation.split_once(' ') {
        Some((method, route)) if method.chars().all(|c| c.is_ascii_uppercase()) => {
            (method.to_string(), route.to_string())
        }
        _ => ("POST".to_string(), format!("/rpc/{operation}")),
    }
}

fn sql_statement(operation: &str, table: &str) -> String {
    match operation {
        "INSERT" => format!("INSERT INTO {table} VALUES ($1, $2, $3)"),
        "UPDATE" => format!("UPDATE {table} SET updated_at = now() WHERE id = $1"),
        "DELETE" => format!("DELETE FROM {table} WHERE id = $1"),
        _ => format!("SELECT * FROM {table} WHERE id = $1"),
    }
}

fn event_time(rng: &mut SimRng, span: &Span) -> DateTime<Utc> {
    span.start_time + Duration::microseconds(rng.random_i64(0, span.duration_us))
}
