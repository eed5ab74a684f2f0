//! Analytics derived from generated telemetry.
//!
//! Everything here is a pure function of its input and returns an empty or
//! zeroed value for empty input.

pub mod anomalies;
pub mod critical_path;
pub mod flame;
pub mod stats;
pub mod topology;

pub use anomalies::{
    detect_metric_anomalies, detect_slow_spans, slow_span_threshold_ms, MetricAnomaly,
    DEFAULT_ANOMALY_SIGMA,
};
pub use critical_path::critical_path;
pub use flame::{flame_graph, FlameNode};
pub use stats::{
    alert_stats, log_stats, mean, percentile, service_stats, std_dev, summarize_series,
    trace_stats, AlertStats, LogStats, SeriesSummary, ServiceStats, TraceStats,
};
pub use topology::{
    build_topology, HealthStatus, ServiceEdge, ServiceNode, ServiceTopology, DEGRADED_ERROR_RATE,
    DOWN_ERROR_RATE,
};
