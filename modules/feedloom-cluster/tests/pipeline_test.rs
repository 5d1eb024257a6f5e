//! End-to-end pipeline scenarios: ingest → queue → embed worker → topics.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feedloom_cluster::testing::{FailingEmbedder, FixedEmbedder, StubEmbedder};
use feedloom_cluster::EmbedWorker;
use feedloom_common::{
    FeedloomError, FingerprintRecord, PipelineConfig, Signal, TextEmbedder, Topic,
};
use feedloom_ingest::IngestService;
use feedloom_store::{MemoryStore, SignalStore};
use tokio::sync::watch;

fn signal(id: &str, text: &str) -> Signal {
    Signal {
        id: id.to_string(),
        text: text.to_string(),
        source: "appstore".to_string(),
        url: format!("https://example.com/review/{id}"),
        title: None,
        author: None,
        product: Some("notesapp".to_string()),
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        poll_interval: Duration::from_millis(10),
        ..PipelineConfig::default()
    }
}

async fn drain(worker: &EmbedWorker) {
    while worker.process_one().await.unwrap() {}
}

#[tokio::test]
async fn similar_signal_joins_existing_topic() {
    let store = Arc::new(MemoryStore::new());
    let ingest = IngestService::new(store.clone(), config());

    let t1 = "search keeps returning stale results";
    let t2 = "search results are always out of date";
    // cos(v1, v2) = 0.91, above the 0.75 threshold.
    let v2_y = (1.0f64 - 0.91 * 0.91).sqrt();
    let embedder = Arc::new(
        FixedEmbedder::new()
            .on(t1, vec![1.0, 0.0])
            .on(t2, vec![0.91, v2_y]),
    );

    ingest.ingest_one(&signal("s1", t1)).await.unwrap();
    ingest.ingest_one(&signal("s2", t2)).await.unwrap();
    assert_eq!(store.pending_len().await.unwrap(), 2);

    let worker = EmbedWorker::new(store.clone(), embedder, config());
    drain(&worker).await;

    let topics = store.list_topics().await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].member_count, 2);
    // Centroid shifted toward the new vector: mean of [1,0] and [0.91, y].
    assert!((topics[0].centroid[0] - (1.0 + 0.91) / 2.0).abs() < 1e-9);
    assert!((topics[0].centroid[1] - v2_y / 2.0).abs() < 1e-9);

    // Both records carry the same topic.
    let hash1 = feedloom_ingest::fingerprint(t1);
    let hash2 = feedloom_ingest::fingerprint(t2);
    let r1 = store.get_fingerprint(&hash1).await.unwrap().unwrap();
    let r2 = store.get_fingerprint(&hash2).await.unwrap().unwrap();
    assert_eq!(r1.topic_id, Some(topics[0].id.clone()));
    assert_eq!(r2.topic_id, r1.topic_id);
    assert_eq!(worker.stats().processed(), 2);
}

#[tokio::test]
async fn dissimilar_signal_founds_new_topic() {
    let store = Arc::new(MemoryStore::new());
    let ingest = IngestService::new(store.clone(), config());

    let t1 = "search keeps returning stale results";
    let t2 = "please add a dark mode option";
    // cos(v1, v2) = 0.40, below the 0.75 threshold.
    let v2 = vec![0.40, (1.0f64 - 0.40 * 0.40).sqrt()];
    let embedder = Arc::new(
        FixedEmbedder::new()
            .on(t1, vec![1.0, 0.0])
            .on(t2, v2.clone()),
    );

    ingest.ingest_one(&signal("s1", t1)).await.unwrap();
    ingest.ingest_one(&signal("s2", t2)).await.unwrap();

    let worker = EmbedWorker::new(store.clone(), embedder, config());
    drain(&worker).await;

    let topics = store.list_topics().await.unwrap();
    assert_eq!(topics.len(), 2);
    let new_topic = topics
        .iter()
        .find(|t| t.centroid == v2)
        .expect("topic founded by the dissimilar signal");
    assert_eq!(new_topic.member_count, 1);
}

#[tokio::test]
async fn duplicates_are_clustered_once() {
    let store = Arc::new(MemoryStore::new());
    let ingest = IngestService::new(store.clone(), config());

    ingest
        .ingest_one(&signal("s1", "Check out https://x.io this is GREAT!!"))
        .await
        .unwrap();
    ingest
        .ingest_one(&signal("s2", "check out this is great"))
        .await
        .unwrap();
    assert_eq!(store.pending_len().await.unwrap(), 1);

    let worker = EmbedWorker::new(store.clone(), Arc::new(StubEmbedder::default()), config());
    drain(&worker).await;

    assert_eq!(store.list_topics().await.unwrap().len(), 1);
    assert_eq!(worker.stats().processed(), 1);
}

#[tokio::test]
async fn embedding_failure_drops_item_without_requeue() {
    let store = Arc::new(MemoryStore::new());
    let ingest = IngestService::new(store.clone(), config());

    let outcome = ingest
        .ingest_one(&signal("s1", "sync keeps dropping my edits"))
        .await
        .unwrap();

    let worker = EmbedWorker::new(store.clone(), Arc::new(FailingEmbedder), config());
    drain(&worker).await;

    // Dropped: queue empty, record deduplicated but un-clustered.
    assert_eq!(store.pending_len().await.unwrap(), 0);
    let record = store.get_fingerprint(&outcome.hash).await.unwrap().unwrap();
    assert_eq!(record.topic_id, None);
    assert_eq!(worker.stats().processed(), 0);
    assert_eq!(worker.stats().embed_failures(), 1);
}

/// Store whose fingerprint reads always miss, as if records expired
/// externally between enqueue and processing.
struct ForgetfulStore(MemoryStore);

#[async_trait::async_trait]
impl SignalStore for ForgetfulStore {
    async fn observe_fingerprint(
        &self,
        record: FingerprintRecord,
        now: DateTime<Utc>,
    ) -> Result<bool, FeedloomError> {
        self.0.observe_fingerprint(record, now).await
    }
    async fn get_fingerprint(
        &self,
        _hash: &str,
    ) -> Result<Option<FingerprintRecord>, FeedloomError> {
        Ok(None)
    }
    async fn assign_topic(&self, hash: &str, topic_id: &str) -> Result<(), FeedloomError> {
        self.0.assign_topic(hash, topic_id).await
    }
    async fn pop_pending(&self) -> Result<Option<String>, FeedloomError> {
        self.0.pop_pending().await
    }
    async fn pending_len(&self) -> Result<usize, FeedloomError> {
        self.0.pending_len().await
    }
    async fn list_topics(&self) -> Result<Vec<Topic>, FeedloomError> {
        self.0.list_topics().await
    }
    async fn create_topic(&self, topic: Topic) -> Result<(), FeedloomError> {
        self.0.create_topic(topic).await
    }
    async fn compare_and_update_topic(&self, topic: Topic) -> Result<bool, FeedloomError> {
        self.0.compare_and_update_topic(topic).await
    }
}

#[tokio::test]
async fn missing_record_is_tolerated() {
    let store = Arc::new(ForgetfulStore(MemoryStore::new()));
    let ingest = IngestService::new(store.clone(), config());
    ingest
        .ingest_one(&signal("s1", "sync keeps dropping my edits"))
        .await
        .unwrap();

    let worker = EmbedWorker::new(store.clone(), Arc::new(StubEmbedder::default()), config());

    // Handled (popped and skipped), then empty.
    assert!(worker.process_one().await.unwrap());
    assert!(!worker.process_one().await.unwrap());
    assert!(store.list_topics().await.unwrap().is_empty());
}

#[tokio::test]
async fn replaying_the_same_stream_reproduces_the_topic_set() {
    let texts = [
        "search keeps returning stale results",
        "search results are always out of date and wrong",
        "please add a dark mode option",
        "the export button does nothing at all",
        "dark mode at night would be wonderful",
    ];

    let mut runs = Vec::new();
    for _ in 0..2 {
        let store = Arc::new(MemoryStore::new());
        let ingest = IngestService::new(store.clone(), config());
        for (i, text) in texts.iter().enumerate() {
            ingest.ingest_one(&signal(&format!("s{i}"), text)).await.unwrap();
        }

        let worker =
            EmbedWorker::new(store.clone(), Arc::new(StubEmbedder::default()), config());
        drain(&worker).await;

        let topics = store.list_topics().await.unwrap();
        let mut assignments = Vec::new();
        for text in &texts {
            let hash = feedloom_ingest::fingerprint(text);
            let record = store.get_fingerprint(&hash).await.unwrap().unwrap();
            assignments.push(record.topic_id);
        }
        runs.push((topics, assignments));
    }

    let (topics_a, assignments_a) = &runs[0];
    let (topics_b, assignments_b) = &runs[1];
    assert_eq!(assignments_a, assignments_b);
    assert_eq!(topics_a.len(), topics_b.len());
    for (a, b) in topics_a.iter().zip(topics_b) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.member_count, b.member_count);
        assert_eq!(a.centroid, b.centroid);
    }
}

#[tokio::test]
async fn worker_loop_stops_cooperatively() {
    let store = Arc::new(MemoryStore::new());
    let ingest = IngestService::new(store.clone(), config());
    ingest
        .ingest_one(&signal("s1", "sync keeps dropping my edits"))
        .await
        .unwrap();

    let worker = Arc::new(EmbedWorker::new(
        store.clone(),
        Arc::new(StubEmbedder::default()) as Arc<dyn TextEmbedder>,
        config(),
    ));
    let stats = worker.stats();

    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move { worker.run(stop_rx).await })
    };

    // Let the loop drain the queue, then stop it.
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("worker exits after stop signal")
        .unwrap();

    assert_eq!(stats.processed(), 1);
    assert_eq!(store.pending_len().await.unwrap(), 0);
}
