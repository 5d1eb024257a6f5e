//! Ingest service: the synchronous-path orchestrator.

use std::sync::Arc;

use feedloom_common::{
    BatchOutcome, FeedloomError, IngestOutcome, IngestStatus, PipelineConfig, Signal,
};
use feedloom_store::SignalStore;
use tracing::info;

use crate::dedupe::check_and_store;

/// First stage of the pipeline: normalize, dedup, store, queue.
///
/// Callers may invoke this from many concurrent request handlers; the
/// exactly-once guarantees live in the store, not here.
pub struct IngestService {
    store: Arc<dyn SignalStore>,
    config: PipelineConfig,
}

impl IngestService {
    pub fn new(store: Arc<dyn SignalStore>, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Ingest a single signal. Infrastructure failures propagate; validity
    /// and duplication are first-class statuses, not errors.
    pub async fn ingest_one(&self, signal: &Signal) -> Result<IngestOutcome, FeedloomError> {
        let outcome =
            check_and_store(self.store.as_ref(), signal, self.config.min_signal_length).await?;

        let status = if !outcome.is_valid {
            IngestStatus::Invalid
        } else if outcome.is_duplicate {
            IngestStatus::Duplicate
        } else {
            IngestStatus::Queued
        };

        Ok(IngestOutcome {
            signal_id: signal.id.clone(),
            hash: outcome.hash,
            status,
        })
    }

    /// Ingest a batch sequentially, preserving order of appearance in the
    /// per-signal results. Invalid and duplicate signals never fail the
    /// batch; an infrastructure failure stops processing and propagates
    /// (re-ingesting the whole batch is safe, dedup makes it idempotent).
    pub async fn ingest_batch(&self, signals: &[Signal]) -> Result<BatchOutcome, FeedloomError> {
        let mut results = Vec::with_capacity(signals.len());
        let mut queued = 0;
        let mut duplicates = 0;
        let mut invalid = 0;

        for signal in signals {
            let outcome = self.ingest_one(signal).await?;
            match outcome.status {
                IngestStatus::Queued => queued += 1,
                IngestStatus::Duplicate => duplicates += 1,
                IngestStatus::Invalid => invalid += 1,
            }
            results.push(outcome);
        }

        info!(
            total = signals.len(),
            queued, duplicates, invalid, "Batch ingest complete"
        );

        Ok(BatchOutcome {
            total: signals.len(),
            queued,
            duplicates,
            invalid,
            results,
        })
    }
}
