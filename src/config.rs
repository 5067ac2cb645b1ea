//! Operator list and consolidation policy, loaded from a JSON file.
//!
//! ```json
//! {
//!   "thresholds": { "rail_m": 200.0, "bus_m": 100.0 },
//!   "request_delay_ms": 1000,
//!   "attribution": "Transit data: 511 SF Bay",
//!   "operators": [
//!     {
//!       "id": "BA", "name": "BART", "color": "#0099CC", "type": "rail",
//!       "source": "https://example.org/gtfs/BA/stops.txt",
//!       "auth": { "kind": "url_param", "param_name": "api_key" },
//!       "api_key_env": "TRANSIT_API_KEY"
//!     }
//!   ]
//! }
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashSet;

use crate::engine::Thresholds;
use crate::model::Operator;

pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;

/// Describes how an operator feed expects its API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedAuth {
    /// No authentication required.
    #[default]
    None,
    /// API key appended as a URL query parameter with the given name.
    UrlParam { param_name: String },
    /// API key sent as an HTTP header with the given name.
    Header { header_name: String },
}

impl FeedAuth {
    /// Returns `true` if any authentication credentials are needed.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, FeedAuth::None)
    }
}

/// One operator feed to fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorConfig {
    #[serde(flatten)]
    pub operator: Operator,
    /// URL or local path of the operator's `stops.txt`.
    pub source: String,
    #[serde(default)]
    pub auth: FeedAuth,
    /// Environment variable holding the API key, when `auth` needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsolidatorConfig {
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Pause between consecutive operator fetches.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default)]
    pub attribution: Option<String>,
    pub operators: Vec<OperatorConfig>,
}

fn default_request_delay_ms() -> u64 {
    DEFAULT_REQUEST_DELAY_MS
}

impl ConsolidatorConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("Invalid config '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.operators.is_empty() {
            bail!("no operators configured");
        }

        let mut ids = HashSet::new();
        for op in &self.operators {
            let id = op.operator.id.trim();
            if id.is_empty() {
                bail!("operator '{}' has an empty id", op.operator.name);
            }
            if !ids.insert(id) {
                bail!("duplicate operator id '{id}'");
            }
            if op.auth.requires_auth() && op.api_key_env.is_none() {
                bail!("operator '{id}' requires auth but sets no api_key_env");
            }
        }

        for (name, value) in [("rail_m", self.thresholds.rail_m), ("bus_m", self.thresholds.bus_m)] {
            if !value.is_finite() || value <= 0.0 {
                bail!("threshold {name} must be a positive number of meters, got {value}");
            }
        }

        Ok(())
    }
}
