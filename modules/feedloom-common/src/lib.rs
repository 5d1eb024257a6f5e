pub mod config;
pub mod embedder;
pub mod error;
pub mod types;
pub mod vector;

pub use config::{CentroidUpdate, PipelineConfig};
pub use embedder::TextEmbedder;
pub use error::FeedloomError;
pub use types::*;
pub use vector::cosine_similarity;
