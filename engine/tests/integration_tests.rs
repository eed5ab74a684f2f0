//! Integration tests for the Mocksight engine.
//!
//! These tests check the structural guarantees of generated data across
//! many seeds, and that analytics agree with the data they summarize.

use chrono::{DateTime, Duration, TimeZone, Utc};
use engine::config::{DatasetConfig, TimeRange, TraceConfig, TraceShape};
use engine::generators::generate_dataset;
use engine::models::default_catalogue;
use engine::random::SimRng;
use std::collections::HashMap;

const SEEDS: u64 = 25;

/// A Monday morning, so density policies see a weekday.
fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
}

fn hours(n: i64) -> TimeRange {
    TimeRange::new(monday(), monday() + Duration::hours(n))
}

fn busy_shape() -> TraceShape {
    TraceShape {
        min_depth: 1,
        max_depth: 6,
        min_children: 1,
        max_children: 4,
        error_probability: 0.1,
        slow_probability: 0.1,
        branch_probability: 0.8,
        base_duration_ms: 800.0,
    }
}

// ============================================================================
// TRACE TESTS
// ============================================================================

mod traces {
    use super::*;
    use engine::generators::{generate_trace, generate_traces};
    use engine::models::Span;

    #[test]
    fn test_trees_are_well_formed_across_seeds() {
        let config = TraceConfig::new("api-gateway", "GET /api/products", monday())
            .with_services(default_catalogue())
            .with_shape(busy_shape());

        for seed in 0..SEEDS {
            let trace = generate_trace(&config, &mut SimRng::seeded(seed)).unwrap();
            let by_id: HashMap<&str, &Span> = trace
                .spans()
                .iter()
                .map(|s| (s.span_id.as_str(), s))
                .collect();

            assert_eq!(trace.spans().iter().filter(|s| s.is_root()).count(), 1);
            for span in trace.spans() {
                assert!(span.validate_span().is_ok());
                if let Some(parent) = &span.parent_span_id {
                    assert!(by_id[parent.as_str()].contains(span), "seed {seed}");
                }
            }

            let start = trace.spans().iter().map(|s| s.start_time).min().unwrap();
            let end = trace.spans().iter().map(Span::end_time).max().unwrap();
            assert_eq!(trace.duration_us(), (end - start).num_microseconds().unwrap());
            assert_eq!(
                trace.error_count(),
                trace.spans().iter().filter(|s| s.is_error()).count()
            );
        }
    }

    #[test]
    fn test_fixed_chain_shape() {
        let config = TraceConfig::new("api-gateway", "GET /", monday()).with_shape(TraceShape {
            min_depth: 3,
            max_depth: 3,
            min_children: 1,
            max_children: 1,
            error_probability: 0.0,
            slow_probability: 0.0,
            branch_probability: 0.7,
            base_duration_ms: 1000.0,
        });
        for seed in 0..SEEDS {
            let trace = generate_trace(&config, &mut SimRng::seeded(seed)).unwrap();
            assert_eq!(trace.span_count(), 4);
            assert_eq!(trace.error_count(), 0);
            let root = trace.root_span().unwrap();
            let deepest = trace.spans().iter().map(Span::end_time).max().unwrap();
            assert!(root.duration() >= deepest - root.start_time);
        }
    }

    #[test]
    fn test_children_call_declared_downstream() {
        let catalogue = default_catalogue();
        let config = TraceConfig::new("api-gateway", "GET /", monday())
            .with_services(catalogue.clone())
            .with_shape(busy_shape());
        let traces = generate_traces(&config, hours(1), 30, &mut SimRng::seeded(3)).unwrap();

        for trace in &traces {
            for span in trace.spans() {
                let Some(parent_id) = &span.parent_span_id else {
                    continue;
                };
                let parent = trace.span(parent_id).unwrap();
                if parent.service == span.service {
                    continue;
                }
                let definition = catalogue.iter().find(|s| s.name == parent.service).unwrap();
                assert!(definition.downstream.contains(&span.service));
            }
        }
    }

    #[test]
    fn test_same_seed_same_trace() {
        let config = TraceConfig::new("api-gateway", "GET /", monday()).with_services(default_catalogue());
        let a = generate_trace(&config, &mut SimRng::seeded(5)).unwrap();
        let b = generate_trace(&config, &mut SimRng::seeded(5)).unwrap();
        assert_eq!(a, b);
    }
}

// ============================================================================
// METRIC TESTS
// ============================================================================

mod metrics {
    use super::*;
    use engine::config::TimeSeriesConfig;
    use engine::generators::{aggregate_time_series, generate_time_series, standard_series, MetricProfile};

    #[test]
    fn test_values_within_bounds_and_ordered() {
        for seed in 0..SEEDS {
            let mut rng = SimRng::seeded(seed);
            for profile in MetricProfile::ALL {
                let config = profile.config("order-service", hours(6), 60);
                let series = generate_time_series(&config, &mut rng).unwrap();
                assert!(series.validate_series().is_ok());
                assert!(series
                    .points
                    .iter()
                    .all(|p| p.value >= config.min_value && p.value <= config.max_value));
                for pair in series.points.windows(2) {
                    assert!(pair[0].timestamp <= pair[1].timestamp);
                }
            }
        }
    }

    #[test]
    fn test_standard_series_per_service() {
        let series = standard_series("order-service", hours(1), 60, &mut SimRng::seeded(9)).unwrap();
        assert_eq!(series.len(), MetricProfile::ALL.len());
        assert!(series.iter().all(|s| s.service == "order-service" && s.points.len() == 61));
    }

    #[test]
    fn test_flat_series_is_exact() {
        let config = TimeSeriesConfig {
            base_value: 50.0,
            amplitude: 0.0,
            noise_ratio: 0.0,
            trend_per_minute: 0.0,
            anomaly_probability: 0.0,
            ..TimeSeriesConfig::new("flat", "svc", hours(2))
        };
        let series = generate_time_series(&config, &mut SimRng::seeded(1)).unwrap();
        assert!(!series.points.is_empty());
        assert!(series.points.iter().all(|p| (p.value - 50.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_aggregation_caps_and_covers() {
        let config = TimeSeriesConfig::new("cpu", "svc", hours(24));
        let series = generate_time_series(&config, &mut SimRng::seeded(2)).unwrap();
        let points = &series.points;

        let reduced = aggregate_time_series(points, 100);
        assert!(reduced.len() <= 100);
        assert_eq!(reduced.first().unwrap().timestamp, points.first().unwrap().timestamp);
        assert!(reduced.last().unwrap().timestamp <= points.last().unwrap().timestamp);
        assert!(reduced
            .iter()
            .all(|p| p.min.unwrap() <= p.value + 1e-9 && p.value <= p.max.unwrap() + 1e-9));

        let untouched = aggregate_time_series(points, points.len());
        assert_eq!(untouched.as_ref(), points.as_slice());
    }
}

// ============================================================================
// LOG STREAM TESTS
// ============================================================================

mod logs {
    use super::*;
    use engine::config::{LogPolicy, LogStreamConfig};
    use engine::generators::{generate_log_stream, generate_traces};
    use engine::models::{LogEntry, LogLevel, Trace};

    #[allow(clippy::cast_precision_loss)]
    fn share(entries: &[LogEntry], pred: impl Fn(&LogEntry) -> bool) -> f64 {
        entries.iter().filter(|e| pred(e)).count() as f64 / entries.len() as f64
    }

    fn stream(policy: LogPolicy, pool: &[Trace], seed: u64) -> Vec<LogEntry> {
        let config = LogStreamConfig::new("order-service", hours(12)).with_policy(policy);
        generate_log_stream(&config, pool, &mut SimRng::seeded(seed)).unwrap()
    }

    fn busy_policy() -> LogPolicy {
        LogPolicy {
            base_frequency_per_minute: 40.0,
            ..LogPolicy::default()
        }
    }

    #[test]
    fn test_correlation_rates() {
        let trace_config = TraceConfig::new("api-gateway", "POST /api/orders", monday())
            .with_services(default_catalogue());
        let pool = generate_traces(&trace_config, hours(12), 40, &mut SimRng::seeded(11)).unwrap();
        let entries = stream(busy_policy(), &pool, 12);
        assert!(entries.len() > 10_000, "{}", entries.len());

        let with_trace = share(&entries, |e| e.trace_id.is_some());
        let with_span = share(&entries, |e| e.span_id.is_some());
        assert!((with_trace - 0.20).abs() < 0.02, "trace share {with_trace}");
        assert!((with_span - 0.10).abs() < 0.02, "span share {with_span}");
        assert!(entries.iter().all(|e| e.span_id.is_none() || e.trace_id.is_some()));

        for entry in entries.iter().filter(|e| e.span_id.is_some()) {
            let trace = pool
                .iter()
                .find(|t| Some(t.trace_id()) == entry.trace_id.as_deref())
                .unwrap();
            assert!(trace.span(entry.span_id.as_deref().unwrap()).is_some());
        }
    }

    #[test]
    fn test_clusters_raise_error_rate() {
        let is_problem = |e: &LogEntry| matches!(e.level, LogLevel::Warn | LogLevel::Error | LogLevel::Fatal);

        let mut always = busy_policy();
        always.cluster.entry_probability = 1.0;
        let clustered = share(&stream(always, &[], 13), is_problem);

        let mut never = busy_policy();
        never.cluster.entry_probability = 0.0;
        let baseline = share(&stream(never, &[], 13), is_problem);

        assert!((clustered - 0.10).abs() < 0.02, "clustered {clustered}");
        assert!((baseline - 0.005).abs() < 0.004, "baseline {baseline}");
        assert!(clustered > baseline * 5.0);
    }
}

// ============================================================================
// DATASET TESTS
// ============================================================================

mod dataset {
    use super::*;
    use engine::models::AlertRule;

    fn config(seed: u64) -> DatasetConfig {
        DatasetConfig::new(hours(3))
            .with_trace_count(40)
            .with_seed(seed)
    }

    #[test]
    fn test_references_resolve_across_seeds() {
        for seed in 0..5 {
            let dataset = generate_dataset(&config(seed)).unwrap();
            let violations = dataset.correlation_violations();
            assert!(violations.is_empty(), "seed {seed}: {violations:?}");
        }
    }

    #[test]
    fn test_logs_sorted_within_window() {
        let dataset = generate_dataset(&config(11)).unwrap();
        for pair in dataset.logs.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        assert!(dataset.logs.iter().all(|l| dataset.range.contains(l.timestamp)));
        assert!(dataset.logs.iter().any(|l| l.trace_id.is_some()));
    }

    #[test]
    fn test_alert_lifecycle_times() {
        let dataset = generate_dataset(&config(12)).unwrap();
        for event in &dataset.alerts {
            if let Some(resolved) = event.resolved_at {
                assert!(resolved > event.triggered_at);
            }
            if let Some(acked) = event.acknowledged_at {
                assert!(acked > event.triggered_at);
            }
        }
    }

    #[test]
    fn test_alert_count_from_density() {
        use engine::config::AlertGenerationConfig;
        use engine::generators::generate_alert_events;
        use engine::models::{AlertCondition, AlertSeverity};

        let range = TimeRange::new(monday(), monday() + Duration::days(10));
        let rule = AlertRule::new(
            "cpu",
            "High CPU",
            "api-gateway",
            "cpu_usage",
            AlertCondition::Gt,
            90.0,
            AlertSeverity::Critical,
        );
        let config = AlertGenerationConfig::new(range).with_density(1.0);
        let events = generate_alert_events(&[rule], &config, &mut SimRng::seeded(4)).unwrap();
        assert_eq!(events.len(), 10);
    }

    #[test]
    fn test_acknowledgements_within_window() {
        use engine::config::AlertGenerationConfig;
        use engine::generators::{default_rules, generate_alert_events};

        let range = TimeRange::new(monday(), monday() + Duration::days(30));
        let rules = default_rules(&default_catalogue());
        for avg_minutes in [2.0, 30.0] {
            let mut config = AlertGenerationConfig::new(range).with_avg_duration_minutes(avg_minutes);
            config.policy.ack_probability = 1.0;
            let window = Duration::minutes(i64::from(config.policy.ack_window_minutes));

            let events = generate_alert_events(&rules, &config, &mut SimRng::seeded(14)).unwrap();
            let acked: Vec<_> = events.iter().filter(|e| e.acknowledged_at.is_some()).collect();
            assert!(acked.len() * 10 > events.len() * 9, "{} of {}", acked.len(), events.len());

            for event in acked {
                let at = event.acknowledged_at.unwrap();
                assert!(at > event.triggered_at);
                assert!(at - event.triggered_at <= window);
                assert!(at <= range.end);
                if let Some(resolved) = event.resolved_at {
                    assert!(at < resolved);
                }
            }
        }
    }

    #[test]
    fn test_dangling_downstream_rejected() {
        use engine::config::ConfigError;
        use engine::models::{ServiceDefinition, ServiceKind};

        let services = vec![ServiceDefinition::new("gw", ServiceKind::Gateway)
            .with_operation("GET /")
            .calls("ghost")];
        let config = config(15).with_services(services);
        assert!(matches!(
            config.validate_config(),
            Err(ConfigError::UnknownDownstream { .. })
        ));
        assert!(generate_dataset(&config).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let dataset = generate_dataset(&config(13).with_trace_count(5)).unwrap();
        let json = serde_json::to_string(&dataset).unwrap();
        let back: engine::generators::Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back.traces, dataset.traces);
        assert_eq!(back.alerts.len(), dataset.alerts.len());
    }
}

// ============================================================================
// ANALYTICS TESTS
// ============================================================================

mod analytics {
    use super::*;
    use engine::analytics::{
        build_topology, critical_path, detect_slow_spans, flame_graph, log_stats, service_stats,
        trace_stats,
    };

    #[test]
    fn test_topology_has_no_self_edges() {
        let dataset = generate_dataset(&DatasetConfig::new(hours(2)).with_trace_count(60).with_seed(21)).unwrap();
        let topology = build_topology(&dataset.traces);

        assert!(!topology.edges.is_empty());
        for edge in &topology.edges {
            assert_ne!(edge.source, edge.target);
            assert!(topology.node(&edge.source).is_some());
            assert!(topology.node(&edge.target).is_some());
        }
        let total: usize = topology.nodes.iter().map(|n| n.request_count).sum();
        assert_eq!(total, dataset.traces.iter().map(|t| t.span_count()).sum::<usize>());
    }

    #[test]
    fn test_critical_path_is_a_root_to_leaf_chain() {
        let config = TraceConfig::new("api-gateway", "GET /", monday())
            .with_services(default_catalogue())
            .with_shape(busy_shape());
        for seed in 0..SEEDS {
            let trace = engine::generators::generate_trace(&config, &mut SimRng::seeded(seed)).unwrap();
            let path = critical_path(&trace);
            assert!(path[0].is_root());
            for pair in path.windows(2) {
                assert_eq!(pair[1].parent_span_id.as_deref(), Some(pair[0].span_id.as_str()));
            }
            assert!(trace.children_of(&path.last().unwrap().span_id).is_empty());

            let flame = flame_graph(&trace).unwrap();
            assert_eq!(flame.frame_count(), trace.span_count());
        }
    }

    #[test]
    fn test_slow_spans_exceed_threshold() {
        let dataset = generate_dataset(&DatasetConfig::new(hours(1)).with_trace_count(30).with_seed(22)).unwrap();
        let spans = dataset.traces.iter().flat_map(|t| t.spans());
        let slow = detect_slow_spans(spans, Some(50.0));
        assert!(slow.iter().all(|s| s.duration_ms() > 50.0));
        for pair in slow.windows(2) {
            assert!(pair[0].duration_us >= pair[1].duration_us);
        }
    }

    #[test]
    fn test_rollups_agree_with_data() {
        let dataset = generate_dataset(&DatasetConfig::new(hours(1)).with_trace_count(25).with_seed(23)).unwrap();
        let traces = trace_stats(&dataset.traces);
        assert_eq!(traces.trace_count, 25);
        assert!(traces.p50_duration_ms <= traces.p95_duration_ms);
        assert!(traces.p95_duration_ms <= traces.p99_duration_ms);

        let per_service: usize = service_stats(&dataset.traces).iter().map(|s| s.span_count).sum();
        assert_eq!(per_service, traces.span_count);

        let logs = log_stats(&dataset.logs);
        assert_eq!(logs.by_level.values().sum::<usize>(), dataset.logs.len());
    }
}

// ============================================================================
// CACHE TESTS
// ============================================================================

mod cache {
    use super::*;
    use engine::cache::WindowCache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_dataset_generated_once_per_window() {
        let cache = Arc::new(WindowCache::new(Duration::minutes(10)));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cache
                        .get_or_generate(monday(), || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            generate_dataset(&DatasetConfig::new(hours(1)).with_trace_count(5).with_seed(1))
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
