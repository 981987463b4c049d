use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use travelmind_core::DistanceMetric;
use travelmind_sources::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Result cap when the request does not set its own limit.
    pub max_results: usize,
    /// Detail lookups issued per composite request.
    pub max_enriched: usize,
    /// Zero disables the deadline.
    pub request_timeout_ms: u64,
    pub distance_metric: DistanceMetric,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            max_enriched: 5,
            request_timeout_ms: 15_000,
            distance_metric: DistanceMetric::Haversine,
        }
    }
}

/// Settings for the place and detail collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub catalog_path: Option<PathBuf>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub router: RouterConfig,
    pub sources: SourceConfig,
}

impl AppConfig {
    /// Defaults, then the optional JSON file, then `TRAVELMIND_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing config {}", path.display()))
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup("TRAVELMIND_MAX_RESULTS") {
            self.router.max_results = parse_number("TRAVELMIND_MAX_RESULTS", &value)?;
        }
        if let Some(value) = lookup("TRAVELMIND_MAX_ENRICHED") {
            self.router.max_enriched = parse_number("TRAVELMIND_MAX_ENRICHED", &value)?;
        }
        if let Some(value) = lookup("TRAVELMIND_REQUEST_TIMEOUT_MS") {
            self.router.request_timeout_ms =
                parse_number("TRAVELMIND_REQUEST_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("TRAVELMIND_DISTANCE_METRIC") {
            self.router.distance_metric = DistanceMetric::parse(&value)
                .with_context(|| format!("unknown TRAVELMIND_DISTANCE_METRIC '{value}'"))?;
        }
        if let Some(value) = lookup("TRAVELMIND_CATALOG") {
            self.sources.catalog_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("TRAVELMIND_RETRY_MAX") {
            self.sources.retry.max_retries = parse_number("TRAVELMIND_RETRY_MAX", &value)?;
        }
        if let Some(value) = lookup("TRAVELMIND_RETRY_BASE_DELAY_MS") {
            self.sources.retry.base_delay_ms =
                parse_number("TRAVELMIND_RETRY_BASE_DELAY_MS", &value)?;
        }

        if self.router.max_results == 0 {
            bail!("max_results must be at least 1");
        }

        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    match value.trim().parse() {
        Ok(parsed) => Ok(parsed),
        Err(_) => bail!("{key} must be a non-negative integer, got '{value}'"),
    }
}
