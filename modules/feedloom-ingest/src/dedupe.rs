//! Dedup engine: normalize, fingerprint, and atomically record one signal.

use chrono::Utc;
use feedloom_common::{DedupOutcome, FeedloomError, FingerprintRecord, Signal};
use feedloom_store::SignalStore;
use tracing::{debug, info};

use crate::normalize::{fingerprint, is_valid, normalize};

/// Check whether a signal has been seen before and store it if new.
///
/// New signals are created and queued for embedding in one atomic store
/// operation; repeat observations only refresh the existing record. Invalid
/// signals (too short after normalization) touch neither store nor queue.
pub async fn check_and_store(
    store: &dyn SignalStore,
    signal: &Signal,
    min_length: usize,
) -> Result<DedupOutcome, FeedloomError> {
    let normalized = normalize(&signal.text);

    if !is_valid(&normalized, min_length) {
        debug!(signal_id = %signal.id, "Signal too short after normalization");
        return Ok(DedupOutcome {
            hash: String::new(),
            is_duplicate: false,
            normalized,
            is_valid: false,
        });
    }

    let hash = fingerprint(&normalized);
    let now = Utc::now();
    let record = FingerprintRecord::new(signal, hash.clone(), normalized.clone(), now);

    let created = store.observe_fingerprint(record, now).await?;
    if created {
        info!(hash = %&hash[..16], "New signal stored, queued for embedding");
    } else {
        debug!(hash = %&hash[..16], "Duplicate signal observed");
    }

    Ok(DedupOutcome {
        hash,
        is_duplicate: !created,
        normalized,
        is_valid: true,
    })
}
