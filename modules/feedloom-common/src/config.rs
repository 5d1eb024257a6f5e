use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How an existing topic's centroid absorbs a newly assigned member.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentroidUpdate {
    /// Plain running mean over all members: `(c * n + e) / (n + 1)`.
    RunningMean,
    /// Exponential moving average: `c * (1 - alpha) + e * alpha`.
    /// Weights recent members more heavily.
    Ewma { alpha: f64 },
}

/// Pipeline configuration. Explicit struct passed at construction time;
/// there is no process-wide state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Normalized texts shorter than this are rejected as too noisy to embed.
    pub min_signal_length: usize,
    /// Inclusive cosine-similarity floor for assigning a signal to an
    /// existing topic. Below it, a new topic is created.
    pub similarity_threshold: f64,
    pub centroid_update: CentroidUpdate,
    /// Bound on compare-and-update retries for a contended centroid.
    pub max_cas_retries: u32,
    /// Worker sleep between polls when the queue is drained.
    pub poll_interval: Duration,
    /// Maximum signals a worker drains per batch.
    pub batch_size: usize,
    /// Product name → repository ("owner/repo") mapping for downstream
    /// consumers. Case-insensitive lookup via `repo_for_product`.
    pub product_repos: HashMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_signal_length: 10,
            similarity_threshold: 0.75,
            centroid_update: CentroidUpdate::RunningMean,
            max_cas_retries: 5,
            poll_interval: Duration::from_secs(1),
            batch_size: 10,
            product_repos: HashMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_signal_length: env_parsed("FEEDLOOM_MIN_SIGNAL_LENGTH", defaults.min_signal_length),
            similarity_threshold: env_parsed(
                "FEEDLOOM_SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
            ),
            centroid_update: defaults.centroid_update,
            max_cas_retries: env_parsed("FEEDLOOM_MAX_CAS_RETRIES", defaults.max_cas_retries),
            poll_interval: Duration::from_secs_f64(env_parsed(
                "FEEDLOOM_POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs_f64(),
            )),
            batch_size: env_parsed("FEEDLOOM_BATCH_SIZE", defaults.batch_size),
            product_repos: product_repos_from_env(),
        }
    }

    /// Repository mapped to a product name, case-insensitive.
    pub fn repo_for_product(&self, product: &str) -> Option<&str> {
        let wanted = product.to_lowercase();
        self.product_repos
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(_, repo)| repo.as_str())
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, raw = %raw, "Unparseable env value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// FEEDLOOM_PRODUCT_REPOS holds a JSON object: {"product": "owner/repo", ...}.
fn product_repos_from_env() -> HashMap<String, String> {
    let Ok(raw) = env::var("FEEDLOOM_PRODUCT_REPOS") else {
        return HashMap::new();
    };
    match serde_json::from_str(&raw) {
        Ok(map) => map,
        Err(e) => {
            warn!(error = %e, "Failed to parse FEEDLOOM_PRODUCT_REPOS, ignoring");
            HashMap::new()
        }
    }
}
