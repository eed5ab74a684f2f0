//! CLI configuration.
//!
//! Handles environment-only settings and loading the service catalogue.

use anyhow::{bail, Context, Result};
use engine::config::validate_catalogue;
use engine::models::{default_catalogue, ServiceDefinition};
use engine::validator::Validate;
use std::path::Path;

/// Diagnostic log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => bail!("Unknown log format '{other}', expected 'text' or 'json'"),
        }
    }
}

/// Settings read from the environment.
///
/// - `MOCKSIGHT_LOG_FORMAT`: `text` (default) or `json`
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Diagnostic log format.
    pub log_format: LogFormat,
}

impl Config {
    /// Creates a configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `MOCKSIGHT_LOG_FORMAT` is set to an unknown format.
    pub fn from_env() -> Result<Self> {
        let log_format = std::env::var("MOCKSIGHT_LOG_FORMAT")
            .ok()
            .map(|f| f.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self { log_format })
    }
}

/// Loads a service catalogue from a JSON file, or the built-in catalogue
/// when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an entry is
/// invalid, or a service calls one missing from the file.
pub fn load_catalogue(path: Option<&Path>) -> Result<Vec<ServiceDefinition>> {
    let Some(path) = path else {
        return Ok(default_catalogue());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read service catalogue {}", path.display()))?;
    let services: Vec<ServiceDefinition> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid service catalogue {}", path.display()))?;
    for service in &services {
        service
            .validate()
            .with_context(|| format!("Invalid service entry '{}'", service.name))?;
    }
    validate_catalogue(&services)
        .with_context(|| format!("Inconsistent service catalogue {}", path.display()))?;
    tracing::debug!(path = %path.display(), services = services.len(), "Loaded service catalogue");
    Ok(services)
}
