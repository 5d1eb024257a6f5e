use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedloomError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Clustering error: {0}")]
    Clustering(String),

    #[error("Embedding dimension mismatch: topic set is {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Topic already assigned for fingerprint {hash}: {existing}")]
    TopicConflict { hash: String, existing: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
