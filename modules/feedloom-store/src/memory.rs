//! In-process store backend. Thread-safe via interior Mutex.
//!
//! Suitable for single-process deployments and tests. The single lock makes
//! `observe_fingerprint` atomic by construction; shared multi-process
//! backends must provide the same contract through their own primitives
//! (transactions, create-if-absent commands, per-key CAS).

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use feedloom_common::{FeedloomError, FingerprintRecord, Topic};

use crate::SignalStore;

#[derive(Default)]
struct MemoryStoreInner {
    records: HashMap<String, FingerprintRecord>,
    pending: VecDeque<String>,
    topics: BTreeMap<String, Topic>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryStoreInner>, FeedloomError> {
        // A poisoned lock means a writer panicked mid-mutation; treat the
        // store as unavailable rather than exposing torn state.
        self.inner
            .lock()
            .map_err(|_| FeedloomError::StoreUnavailable("memory store lock poisoned".into()))
    }
}

#[async_trait::async_trait]
impl SignalStore for MemoryStore {
    async fn observe_fingerprint(
        &self,
        record: FingerprintRecord,
        now: DateTime<Utc>,
    ) -> Result<bool, FeedloomError> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner.records.get_mut(&record.hash) {
            existing.last_seen = existing.last_seen.max(now.timestamp());
            existing.duplicates += 1;
            return Ok(false);
        }

        let hash = record.hash.clone();
        inner.records.insert(hash.clone(), record);
        inner.pending.push_back(hash);
        Ok(true)
    }

    async fn get_fingerprint(
        &self,
        hash: &str,
    ) -> Result<Option<FingerprintRecord>, FeedloomError> {
        Ok(self.lock()?.records.get(hash).cloned())
    }

    async fn assign_topic(&self, hash: &str, topic_id: &str) -> Result<(), FeedloomError> {
        let mut inner = self.lock()?;
        let Some(record) = inner.records.get_mut(hash) else {
            return Err(FeedloomError::StoreUnavailable(format!(
                "no fingerprint record for {hash}"
            )));
        };
        if let Some(existing) = &record.topic_id {
            return Err(FeedloomError::TopicConflict {
                hash: hash.to_string(),
                existing: existing.clone(),
            });
        }
        record.topic_id = Some(topic_id.to_string());
        Ok(())
    }

    async fn pop_pending(&self) -> Result<Option<String>, FeedloomError> {
        Ok(self.lock()?.pending.pop_front())
    }

    async fn pending_len(&self) -> Result<usize, FeedloomError> {
        Ok(self.lock()?.pending.len())
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, FeedloomError> {
        // BTreeMap iteration is already id-sorted.
        Ok(self.lock()?.topics.values().cloned().collect())
    }

    async fn create_topic(&self, topic: Topic) -> Result<(), FeedloomError> {
        let mut inner = self.lock()?;
        if inner.topics.contains_key(&topic.id) {
            return Err(FeedloomError::Clustering(format!(
                "topic {} already exists",
                topic.id
            )));
        }
        inner.topics.insert(topic.id.clone(), topic);
        Ok(())
    }

    async fn compare_and_update_topic(&self, topic: Topic) -> Result<bool, FeedloomError> {
        let mut inner = self.lock()?;
        let Some(stored) = inner.topics.get_mut(&topic.id) else {
            return Err(FeedloomError::Clustering(format!(
                "topic {} does not exist",
                topic.id
            )));
        };
        if stored.version != topic.version {
            return Ok(false);
        }
        *stored = Topic {
            version: topic.version + 1,
            ..topic
        };
        Ok(true)
    }
}
