//! Online nearest-centroid clustering.
//!
//! Single-pass: each embedded signal is compared against the current topic
//! centroids once and either joins the best match or founds a new topic.
//! Historical members are never re-clustered, so the ordering of the input
//! stream fully determines the resulting topic set.

use std::sync::Arc;

use chrono::Utc;
use feedloom_common::{
    cosine_similarity, CentroidUpdate, ClusterAction, ClusterOutcome, FeedloomError,
    PipelineConfig, Topic,
};
use feedloom_store::SignalStore;
use tracing::{debug, info};

pub struct Clusterer {
    store: Arc<dyn SignalStore>,
    config: PipelineConfig,
}

impl Clusterer {
    pub fn new(store: Arc<dyn SignalStore>, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Assign one embedded signal to its best-matching topic, or found a new
    /// topic when nothing clears the similarity threshold (inclusive). The
    /// topic id is then written once onto the fingerprint record; a record
    /// that already carries a topic surfaces as `TopicConflict`.
    pub async fn cluster_signal(
        &self,
        hash: &str,
        text: &str,
        embedding: &[f64],
    ) -> Result<ClusterOutcome, FeedloomError> {
        debug!(hash = %short(hash), text_len = text.len(), "Clustering signal");

        let outcome = self.place(hash, embedding).await?;
        self.store.assign_topic(hash, &outcome.topic_id).await?;

        info!(
            hash = %short(hash),
            action = %outcome.action,
            topic_id = %outcome.topic_id,
            similarity = outcome.similarity.unwrap_or(0.0),
            "Signal clustered"
        );
        Ok(outcome)
    }

    /// Decide the topic for an embedding. The centroid read-modify-write is
    /// serialized through the store's compare-and-update: on contention the
    /// whole decision is retried against a fresh topic snapshot, bounded by
    /// `max_cas_retries`.
    async fn place(&self, hash: &str, embedding: &[f64]) -> Result<ClusterOutcome, FeedloomError> {
        for _ in 0..=self.config.max_cas_retries {
            let topics = self.store.list_topics().await?;

            if let Some(first) = topics.first() {
                if first.centroid.len() != embedding.len() {
                    return Err(FeedloomError::DimensionMismatch {
                        expected: first.centroid.len(),
                        actual: embedding.len(),
                    });
                }
            }

            // Linear scan over the id-sorted set; strict `>` keeps the
            // lowest topic id on ties, so replay is deterministic.
            let mut best: Option<(&Topic, f64)> = None;
            for topic in &topics {
                let sim = cosine_similarity(&topic.centroid, embedding);
                if best.is_none_or(|(_, best_sim)| sim > best_sim) {
                    best = Some((topic, sim));
                }
            }

            match best {
                Some((topic, sim)) if sim >= self.config.similarity_threshold => {
                    let mut updated = topic.clone();
                    updated.centroid = merge_centroid(
                        &topic.centroid,
                        embedding,
                        topic.member_count,
                        self.config.centroid_update,
                    );
                    updated.member_count += 1;
                    updated.updated_at = Utc::now();

                    if self.store.compare_and_update_topic(updated).await? {
                        return Ok(ClusterOutcome {
                            action: ClusterAction::Assigned,
                            topic_id: topic.id.clone(),
                            similarity: Some(sim),
                        });
                    }
                    debug!(topic_id = %topic.id, "Centroid update contention, retrying");
                }
                _ => {
                    let topic_id = topic_id_for(hash);
                    let topic = Topic::founded(topic_id.clone(), embedding.to_vec(), Utc::now());
                    self.store.create_topic(topic).await?;
                    return Ok(ClusterOutcome {
                        action: ClusterAction::Created,
                        topic_id,
                        similarity: None,
                    });
                }
            }
        }

        Err(FeedloomError::Clustering(format!(
            "centroid update for {} still contended after {} retries",
            short(hash),
            self.config.max_cas_retries
        )))
    }
}

/// Deterministic topic identity, derived from the founding signal's
/// fingerprint so that replaying an input stream reproduces the same ids.
fn topic_id_for(hash: &str) -> String {
    format!("t-{}", short(hash))
}

fn merge_centroid(
    centroid: &[f64],
    embedding: &[f64],
    member_count: u64,
    rule: CentroidUpdate,
) -> Vec<f64> {
    match rule {
        CentroidUpdate::RunningMean => {
            let n = member_count as f64;
            centroid
                .iter()
                .zip(embedding)
                .map(|(c, e)| (c * n + e) / (n + 1.0))
                .collect()
        }
        CentroidUpdate::Ewma { alpha } => centroid
            .iter()
            .zip(embedding)
            .map(|(c, e)| c * (1.0 - alpha) + e * alpha)
            .collect(),
    }
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(16)]
}
