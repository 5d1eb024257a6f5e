//! Background worker that drains the to-embed queue.
//!
//! Single cooperative polling loop: pop a fingerprint hash, load the record,
//! embed its normalized text, hand the vector to the clusterer. Per-item
//! failures are logged and dropped rather than re-queued — a deliberate
//! simplification that avoids retry storms on poison items at the cost of
//! silently losing failed embeddings. The stats counters expose that loss.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use feedloom_common::{FeedloomError, PipelineConfig, TextEmbedder};
use feedloom_store::SignalStore;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cluster::Clusterer;

/// Cumulative worker counters. Cheap to share and read from outside the loop.
#[derive(Default)]
pub struct WorkerStats {
    processed: AtomicU64,
    embed_failures: AtomicU64,
    cluster_failures: AtomicU64,
}

impl WorkerStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn embed_failures(&self) -> u64 {
        self.embed_failures.load(Ordering::Relaxed)
    }

    pub fn cluster_failures(&self) -> u64 {
        self.cluster_failures.load(Ordering::Relaxed)
    }
}

pub struct EmbedWorker {
    store: Arc<dyn SignalStore>,
    embedder: Arc<dyn TextEmbedder>,
    clusterer: Clusterer,
    config: PipelineConfig,
    stats: Arc<WorkerStats>,
}

impl EmbedWorker {
    pub fn new(
        store: Arc<dyn SignalStore>,
        embedder: Arc<dyn TextEmbedder>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            clusterer: Clusterer::new(Arc::clone(&store), config.clone()),
            store,
            embedder,
            config,
            stats: Arc::new(WorkerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Process a single queued signal. Returns `false` only when the queue
    /// was empty. Embedding and clustering failures are handled here — the
    /// item is dropped and `true` is returned; only store failures propagate.
    pub async fn process_one(&self) -> Result<bool, FeedloomError> {
        let Some(hash) = self.store.pop_pending().await? else {
            return Ok(false);
        };
        debug!(hash = %short(&hash), "Processing queued signal");

        let Some(record) = self.store.get_fingerprint(&hash).await? else {
            // Evicted or expired externally since it was queued.
            warn!(hash = %short(&hash), "Queued signal has no fingerprint record");
            return Ok(true);
        };

        let text = if record.normalized.is_empty() {
            record.text.as_str()
        } else {
            record.normalized.as_str()
        };
        if text.is_empty() {
            warn!(hash = %short(&hash), "Queued signal has no text");
            return Ok(true);
        }

        let embedding = match self.embedder.embed(text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                error!(hash = %short(&hash), error = %e, "Failed to embed signal, dropping");
                self.stats.embed_failures.fetch_add(1, Ordering::Relaxed);
                return Ok(true);
            }
        };

        match self.clusterer.cluster_signal(&hash, text, &embedding).await {
            Ok(_) => {
                self.stats.processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                // The signal stays fingerprinted and deduplicated, just
                // un-clustered.
                error!(hash = %short(&hash), error = %e, "Failed to cluster signal");
                self.stats.cluster_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(true)
    }

    /// Process up to `batch_size` signals, stopping early when the queue
    /// drains. Returns the number of items handled.
    pub async fn process_batch(&self) -> Result<usize, FeedloomError> {
        let mut handled = 0;
        for _ in 0..self.config.batch_size {
            if self.process_one().await? {
                handled += 1;
            } else {
                break;
            }
        }
        Ok(handled)
    }

    /// Run the polling loop until `stop` flips to true. The stop signal is
    /// observed between units of work, never mid-item. Store failures inside
    /// a batch are logged and followed by a backoff sleep; the loop itself
    /// never terminates on a bad item.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        info!("Embed worker started");

        while !*stop.borrow() {
            match self.store.pending_len().await {
                Ok(0) => self.idle(&mut stop).await,
                Ok(depth) => {
                    debug!(depth, "Draining queue");
                    match self.process_batch().await {
                        Ok(handled) if handled > 0 => {
                            info!(handled, "Processed signal batch");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "Batch failed, backing off");
                            self.idle(&mut stop).await;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to read queue depth, backing off");
                    self.idle(&mut stop).await;
                }
            }
        }

        info!("Embed worker stopped");
    }

    /// Sleep one poll interval, waking early if the stop signal flips.
    async fn idle(&self, stop: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = tokio::time::sleep(self.config.poll_interval) => {}
            _ = stop.changed() => {}
        }
    }
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(16)]
}
