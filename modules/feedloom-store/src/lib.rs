//! Shared mutable state behind one trait: fingerprint records, the
//! to-embed work queue, and the topic set.
//!
//! One trait rather than three because the exactly-once contract couples
//! them: creating a fingerprint record and enqueueing its hash must be
//! indivisible with respect to the existence check. A backend that exposes
//! "check, then write, then push" as separate steps cannot satisfy
//! `observe_fingerprint` under concurrent writers.

pub mod memory;

use chrono::{DateTime, Utc};
use feedloom_common::{FeedloomError, FingerprintRecord, Topic};

pub use memory::MemoryStore;

#[async_trait::async_trait]
pub trait SignalStore: Send + Sync {
    /// Record an observation of the given fingerprint, atomically.
    ///
    /// If no record exists for `record.hash`: store the record and push its
    /// hash onto the work queue, returning `true`. Otherwise bump the
    /// existing record's `last_seen` to `now` (never backwards) and increment
    /// its duplicate count, returning `false`. Two concurrent calls for the
    /// same hash result in exactly one creation and exactly one enqueue.
    ///
    /// This is the only path that pushes to the work queue, so a hash is
    /// enqueued at most once across its lifetime.
    async fn observe_fingerprint(
        &self,
        record: FingerprintRecord,
        now: DateTime<Utc>,
    ) -> Result<bool, FeedloomError>;

    async fn get_fingerprint(&self, hash: &str)
        -> Result<Option<FingerprintRecord>, FeedloomError>;

    /// Write-once topic assignment. Fails with `TopicConflict` if the
    /// record already carries a topic id.
    async fn assign_topic(&self, hash: &str, topic_id: &str) -> Result<(), FeedloomError>;

    /// Pop the oldest queued hash, or None when the queue is drained.
    /// Non-blocking. A popped hash is not re-queued on processing failure.
    async fn pop_pending(&self) -> Result<Option<String>, FeedloomError>;

    async fn pending_len(&self) -> Result<usize, FeedloomError>;

    /// All topics, sorted by id. The clustering engine's working set.
    async fn list_topics(&self) -> Result<Vec<Topic>, FeedloomError>;

    async fn create_topic(&self, topic: Topic) -> Result<(), FeedloomError>;

    /// Compare-and-update a topic keyed on its `version` field: persists
    /// `topic` (with version incremented) only if the stored version equals
    /// `topic.version`. Returns `false` on version mismatch, in which case
    /// the caller re-reads and retries. Serializes centroid
    /// read-modify-write across concurrent clustering calls.
    async fn compare_and_update_topic(&self, topic: Topic) -> Result<bool, FeedloomError>;
}
