//! Mocksight CLI
//!
//! Generates synthetic observability data and prints it as JSON.
//!
//! # Usage
//!
//! ```bash
//! mocksight --help
//! mocksight --seed 42 trace --analyze
//! mocksight --hours 6 logs --service order-service --traces 20
//! mocksight --services catalogue.json dataset --traces 100
//! ```

#![deny(unsafe_code)]

mod config;

use anyhow::{ensure, Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use config::{load_catalogue, Config, LogFormat};
use engine::analytics::{
    alert_stats, build_topology, critical_path, flame_graph, log_stats, service_stats,
    summarize_series, trace_stats,
};
use engine::config::{
    AlertGenerationConfig, DatasetConfig, LogStreamConfig, TimeRange, TraceConfig, TraceShape,
};
use engine::generators::{
    aggregate_time_series, default_rules, generate_alert_events, generate_dataset,
    generate_log_stream, generate_time_series, generate_trace, generate_traces, standard_series,
    MetricProfile,
};
use engine::models::{ServiceDefinition, ServiceKind};
use engine::random::SimRng;
use serde::Serialize;
use std::path::PathBuf;

/// Fallback operation for services that declare none.
const DEFAULT_OPERATION: &str = "handle_request";

/// Mocksight CLI - Synthetic telemetry generator
#[derive(Parser)]
#[command(name = "mocksight")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Seed for reproducible output
    #[arg(long, global = true, env = "MOCKSIGHT_SEED")]
    seed: Option<u64>,

    /// Service catalogue JSON file (defaults to the built-in catalogue)
    #[arg(long, global = true, env = "MOCKSIGHT_SERVICES")]
    services: Option<PathBuf>,

    /// Length of the generated window, ending now
    #[arg(long, global = true, env = "MOCKSIGHT_HOURS", default_value_t = 1.0)]
    hours: f64,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one trace
    Trace {
        /// Root service (defaults to the first gateway)
        #[arg(long)]
        service: Option<String>,
        /// Root operation
        #[arg(long)]
        operation: Option<String>,
        /// Maximum tree depth
        #[arg(long, default_value_t = 4)]
        max_depth: u32,
        /// Per-span error probability
        #[arg(long, default_value_t = 0.02)]
        error_probability: f64,
        /// Include critical path and flame graph
        #[arg(long)]
        analyze: bool,
    },
    /// Generate metric series
    Metrics {
        /// Service (defaults to every service)
        #[arg(long)]
        service: Option<String>,
        /// Single metric, e.g. `cpu_usage` (defaults to every standard metric)
        #[arg(long)]
        metric: Option<String>,
        /// Seconds between samples
        #[arg(long, default_value_t = 60)]
        interval: u32,
        /// Downsample each series to at most this many points
        #[arg(long)]
        max_points: Option<usize>,
    },
    /// Generate a log stream
    Logs {
        /// Emitting service (defaults to the first service)
        #[arg(long)]
        service: Option<String>,
        /// Base entries per minute
        #[arg(long, default_value_t = 10.0)]
        frequency: f64,
        /// Traces to generate as the correlation pool
        #[arg(long, default_value_t = 0)]
        traces: usize,
    },
    /// Generate alert history from the standard rules
    Alerts {
        /// Events per day per rule
        #[arg(long, default_value_t = 2.0)]
        density: f64,
    },
    /// Generate a complete cross-correlated data set
    Dataset {
        /// Number of traces
        #[arg(long, default_value_t = 50)]
        traces: u32,
    },
    /// Derive the service topology of generated traces
    Topology {
        /// Number of traces
        #[arg(long, default_value_t = 200)]
        traces: u32,
    },
    /// Summarize a generated data set
    Stats {
        /// Number of traces
        #[arg(long, default_value_t = 200)]
        traces: u32,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let cli = Cli::parse();
    run(&cli)
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn run(cli: &Cli) -> Result<()> {
    ensure!(
        cli.hours.is_finite() && cli.hours > 0.0,
        "--hours must be positive"
    );
    let services = load_catalogue(cli.services.as_deref())?;
    let now = Utc::now();
    #[allow(clippy::cast_possible_truncation)]
    let range = Duration::try_seconds((cli.hours * 3600.0).round() as i64)
        .and_then(|length| now.checked_sub_signed(length))
        .map(|start| TimeRange::new(start, now))
        .context("--hours reaches past the supported calendar")?;
    let mut rng = SimRng::from_optional_seed(cli.seed);
    tracing::info!(seed = ?cli.seed, services = services.len(), hours = cli.hours, "Generating");

    match &cli.command {
        Commands::Trace {
            service,
            operation,
            max_depth,
            error_probability,
            analyze,
        } => {
            let root = root_service(&services, service.as_deref())?;
            let operation = operation
                .clone()
                .or_else(|| root.operations.first().cloned())
                .unwrap_or_else(|| DEFAULT_OPERATION.to_string());
            let trace_config = TraceConfig::new(root.name.as_str(), operation, range.start)
                .with_services(services.clone())
                .with_shape(TraceShape {
                    max_depth: *max_depth,
                    min_depth: (*max_depth).min(1),
                    error_probability: *error_probability,
                    ..TraceShape::default()
                });
            let trace = generate_trace(&trace_config, &mut rng)?;
            if *analyze {
                let path: Vec<&str> = critical_path(&trace)
                    .into_iter()
                    .map(|s| s.span_id.as_str())
                    .collect();
                let flame = flame_graph(&trace);
                print_json(
                    &serde_json::json!({
                        "trace": &trace,
                        "critical_path": path,
                        "flame_graph": flame,
                    }),
                    cli.pretty,
                )
            } else {
                print_json(&trace, cli.pretty)
            }
        }
        Commands::Metrics {
            service,
            metric,
            interval,
            max_points,
        } => {
            let targets: Vec<&ServiceDefinition> = match service {
                Some(name) => vec![find_service(&services, name)?],
                None => services.iter().collect(),
            };
            let mut series = Vec::new();
            for target in targets {
                match metric {
                    Some(name) => {
                        let profile = MetricProfile::ALL
                            .into_iter()
                            .find(|p| p.metric_name() == name.as_str())
                            .with_context(|| format!("Unknown metric '{name}'"))?;
                        series.push(generate_time_series(
                            &profile.config(&target.name, range, *interval),
                            &mut rng,
                        )?);
                    }
                    None => series.extend(standard_series(&target.name, range, *interval, &mut rng)?),
                }
            }
            if let Some(cap) = max_points {
                for s in &mut series {
                    s.points = aggregate_time_series(&s.points, *cap).into_owned();
                }
            }
            print_json(&series, cli.pretty)
        }
        Commands::Logs {
            service,
            frequency,
            traces,
        } => {
            let name = match service {
                Some(name) => find_service(&services, name)?.name.clone(),
                None => services
                    .first()
                    .map(|s| s.name.clone())
                    .context("Service catalogue is empty")?,
            };
            let pool = if *traces > 0 {
                let root = root_service(&services, None)?;
                let operation = root.operations.first().map_or(DEFAULT_OPERATION, String::as_str);
                let trace_config = TraceConfig::new(root.name.as_str(), operation, range.start)
                    .with_services(services.clone());
                generate_traces(&trace_config, range, *traces, &mut rng)?
            } else {
                Vec::new()
            };
            let stream = LogStreamConfig::new(name, range).with_frequency(*frequency);
            print_json(&generate_log_stream(&stream, &pool, &mut rng)?, cli.pretty)
        }
        Commands::Alerts { density } => {
            let alert_config = AlertGenerationConfig::new(range).with_density(*density);
            let events = generate_alert_events(&default_rules(&services), &alert_config, &mut rng)?;
            print_json(&events, cli.pretty)
        }
        Commands::Dataset { traces } => {
            let dataset = generate_dataset(&dataset_config(cli, services, range, *traces))?;
            print_json(&dataset, cli.pretty)
        }
        Commands::Topology { traces } => {
            let dataset = generate_dataset(&dataset_config(cli, services, range, *traces))?;
            print_json(&build_topology(&dataset.traces), cli.pretty)
        }
        Commands::Stats { traces } => {
            let dataset = generate_dataset(&dataset_config(cli, services, range, *traces))?;
            let series: Vec<_> = dataset.metrics.iter().map(summarize_series).collect();
            print_json(
                &serde_json::json!({
                    "traces": trace_stats(&dataset.traces),
                    "services": service_stats(&dataset.traces),
                    "logs": log_stats(&dataset.logs),
                    "alerts": alert_stats(&dataset.alerts),
                    "series": series,
                }),
                cli.pretty,
            )
        }
    }
}

fn dataset_config(
    cli: &Cli,
    services: Vec<ServiceDefinition>,
    range: TimeRange,
    traces: u32,
) -> DatasetConfig {
    let config = DatasetConfig::new(range)
        .with_services(services)
        .with_trace_count(traces);
    match cli.seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    }
}

fn find_service<'a>(services: &'a [ServiceDefinition], name: &str) -> Result<&'a ServiceDefinition> {
    services
        .iter()
        .find(|s| s.name == name)
        .with_context(|| format!("Unknown service '{name}'"))
}

/// The named service, else the first gateway, else the first service.
fn root_service<'a>(
    services: &'a [ServiceDefinition],
    name: Option<&str>,
) -> Result<&'a ServiceDefinition> {
    if let Some(name) = name {
        return find_service(services, name);
    }
    services
        .iter()
        .find(|s| s.kind == ServiceKind::Gateway)
        .or_else(|| services.first())
        .context("Service catalogue is empty")
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
