//! Mocksight Engine
//!
//! Synthetic telemetry generation: distributed traces, metric time series,
//! log streams and alert histories that cross-reference each other, plus
//! analytics over the generated data.
//!
//! # Modules
//!
//! - [`models`] - Data models for traces, metrics, logs, alerts and services
//! - [`config`] - Generator configuration and validation
//! - [`random`] - Seedable random process utilities
//! - [`generators`] - Trace, metric, log, alert and data set generators
//! - [`analytics`] - Critical path, flame graph, outliers, topology, statistics
//! - [`cache`] - Time-windowed cache of generated values
//!
//! # Example
//!
//! ```
//! use engine::config::{LogStreamConfig, TimeRange};
//! use engine::generators::generate_log_stream;
//! use engine::random::SimRng;
//! use chrono::{Duration, Utc};
//!
//! let range = TimeRange::last(Utc::now(), Duration::minutes(30));
//! let config = LogStreamConfig::new("auth-service", range);
//! let logs = generate_log_stream(&config, &[], &mut SimRng::seeded(42)).unwrap();
//!
//! assert!(logs.iter().all(|log| log.validate_entry().is_ok()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod analytics;
pub mod cache;
pub mod config;
pub mod generators;
pub mod models;
pub mod random;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
