use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Input ---

/// One unit of ingested text plus metadata. Transient: owned by the caller,
/// consumed once by the ingest service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub text: String,
    pub source: String,
    pub url: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub product: Option<String>,
}

// --- Fingerprint record ---

/// Content-addressed dedup record, keyed by the hex SHA-256 of the signal's
/// normalized text. Exactly one record exists per distinct digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Hex-encoded SHA-256 of the normalized text (64 chars). The store key.
    pub hash: String,
    pub text: String,
    pub normalized: String,
    pub source: String,
    pub url: String,
    pub title: String,
    pub author: String,
    pub product: String,
    /// Unix seconds of first observation.
    pub first_seen: i64,
    /// Unix seconds of most recent observation. Monotonically non-decreasing.
    pub last_seen: i64,
    /// Set once by the clustering engine, never by ingestion.
    pub topic_id: Option<String>,
    /// Observations beyond the first.
    pub duplicates: u64,
}

impl FingerprintRecord {
    pub fn new(signal: &Signal, hash: String, normalized: String, now: DateTime<Utc>) -> Self {
        let ts = now.timestamp();
        Self {
            hash,
            text: signal.text.clone(),
            normalized,
            source: signal.source.clone(),
            url: signal.url.clone(),
            title: signal.title.clone().unwrap_or_default(),
            author: signal.author.clone().unwrap_or_default(),
            product: signal.product.clone().unwrap_or_default(),
            first_seen: ts,
            last_seen: ts,
            topic_id: None,
            duplicates: 0,
        }
    }
}

// --- Topic ---

/// A cluster of semantically similar signals, represented by the running-mean
/// centroid of its members' embeddings. Owned and mutated solely by the
/// clustering engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub centroid: Vec<f64>,
    pub member_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency counter for centroid compare-and-update.
    pub version: u64,
}

impl Topic {
    /// A fresh single-member topic founded by the given embedding.
    pub fn founded(id: String, centroid: Vec<f64>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            centroid,
            member_count: 1,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

// --- Pipeline outcomes (transient, reported to callers and logs) ---

/// Outcome of the dedup check for one signal.
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// Empty when the signal was invalid.
    pub hash: String,
    pub is_duplicate: bool,
    pub normalized: String,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// New signal, stored and queued for embedding.
    Queued,
    /// Seen before; observation recorded, nothing queued.
    Duplicate,
    /// Too short after normalization to be worth embedding.
    Invalid,
}

impl std::fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestStatus::Queued => write!(f, "queued"),
            IngestStatus::Duplicate => write!(f, "duplicate"),
            IngestStatus::Invalid => write!(f, "invalid"),
        }
    }
}

/// Outcome of ingesting a single signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub signal_id: String,
    pub hash: String,
    pub status: IngestStatus,
}

/// Aggregated outcome of a sequential batch ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub queued: usize,
    pub duplicates: usize,
    pub invalid: usize,
    /// Per-signal outcomes in order of appearance.
    pub results: Vec<IngestOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterAction {
    Assigned,
    Created,
}

impl std::fmt::Display for ClusterAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterAction::Assigned => write!(f, "assigned"),
            ClusterAction::Created => write!(f, "created"),
        }
    }
}

/// Outcome of clustering one embedded signal.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    pub action: ClusterAction,
    pub topic_id: String,
    /// Best cosine similarity when assigned; None when a new topic was created.
    pub similarity: Option<f64>,
}
