//! JSON request and response shapes for the CLI.

use omograph_classifier::{Classification, DispatchPath, GroupingEngine};
use serde::{Deserialize, Serialize};

/// One classification job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// Sentence around each candidate, parallel to `candidates`.
    pub contexts: Vec<String>,
    /// Stress-marked candidate variants, grouped by occurrence.
    pub candidates: Vec<String>,
    /// Candidates per occurrence. Derived from the candidates when absent.
    #[serde(default)]
    pub occurrence_sizes: Option<Vec<usize>>,
}

impl ClassifyRequest {
    /// Parse a request from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a field is missing.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| anyhow::anyhow!("Failed to parse classification request: {}", e))
    }

    /// Explicit occurrence sizes, or the grouping engine's partition.
    pub fn resolve_sizes(&self, grouping: &GroupingEngine) -> Vec<usize> {
        match &self.occurrence_sizes {
            Some(sizes) => sizes.clone(),
            None => grouping.group_sizes(&self.candidates),
        }
    }
}

/// Winners plus the strategy that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyResponse {
    /// One winning candidate per occurrence, in occurrence order.
    pub winners: Vec<String>,
    /// Strategy used for the call.
    pub path: DispatchPath,
}

impl From<Classification> for ClassifyResponse {
    fn from(c: Classification) -> Self {
        Self {
            winners: c.winners,
            path: c.path,
        }
    }
}

impl ClassifyResponse {
    /// Serialize to JSON, optionally pretty-printed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, pretty: bool) -> anyhow::Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }
}
