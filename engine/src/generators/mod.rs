//! Synthetic telemetry generators.
//!
//! Every generator takes a validated configuration value and a `SimRng`, and
//! returns plain model data. A fixed seed reproduces the same output.

pub mod alert;
pub mod dataset;
pub mod log;
pub mod metric;
pub mod trace;

pub use alert::{default_rules, generate_alert_events};
pub use dataset::{generate_dataset, Dataset};
pub use log::generate_log_stream;
pub use metric::{aggregate_time_series, generate_time_series, standard_series, MetricProfile};
pub use trace::{generate_trace, generate_traces};

use crate::random::SimRng;

/// A made-up failure for span events and log entries.
pub(crate) struct SyntheticError {
    pub kind: &'static str,
    pub message: String,
    pub stack_trace: String,
}

const ERROR_KINDS: &[(&str, &str)] = &[
    ("TimeoutError", "upstream request timed out after {ms}ms"),
    ("ConnectionRefused", "connection refused by {peer}"),
    ("NullReferenceError", "unexpected null value in response payload"),
    ("ValidationError", "request payload failed schema validation"),
    ("DeadlockDetected", "transaction aborted: deadlock detected"),
    ("ResourceExhausted", "connection pool exhausted (max {pool})"),
];

const FRAME_FUNCTIONS: &[&str] = &[
    "handle_request",
    "dispatch",
    "execute_query",
    "call_downstream",
    "serialize_response",
    "acquire_connection",
    "retry_with_backoff",
];

/// Synthesizes an error with a multi-line stack trace rooted in `operation`.
pub(crate) fn synthetic_error(rng: &mut SimRng, service: &str, operation: &str) -> SyntheticError {
    let (kind, template) = rng
        .pick(ERROR_KINDS)
        .copied()
        .unwrap_or(("InternalError", "internal error"));
    let message = template
        .replace("{ms}", &rng.random_int(1_000, 30_000).to_string())
        .replace("{peer}", &format!("10.0.{}.{}:5432", rng.random_int(0, 255), rng.random_int(1, 254)))
        .replace("{pool}", &rng.random_int(10, 100).to_string());

    let module = service.replace('-', "_");
    let mut stack_trace = format!("{kind}: {message}\n");
    stack_trace.push_str(&format!("    at {module}::{}\n", operation_frame(operation)));
    for _ in 0..rng.random_int(2, 5) {
        let function = rng.pick(FRAME_FUNCTIONS).copied().unwrap_or("dispatch");
        stack_trace.push_str(&format!(
            "    at {module}::{function} (src/{function}.rs:{})\n",
            rng.random_int(10, 480)
        ));
    }
    stack_trace.push_str("    at runtime::worker::run");

    SyntheticError {
        kind,
        message,
        stack_trace,
    }
}

/// Turns `"GET /api/users/{id}"` into `get_api_users_id`.
fn operation_frame(operation: &str) -> String {
    let mut frame = String::with_capacity(operation.len());
    for c in operation.chars() {
        if c.is_ascii_alphanumeric() {
            frame.push(c.to_ascii_lowercase());
        } else if !frame.ends_with('_') && !frame.is_empty() {
            frame.push('_');
        }
    }
    frame.trim_end_matches('_').to_string()
}
