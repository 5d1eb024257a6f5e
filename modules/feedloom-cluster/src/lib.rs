pub mod cluster;
pub mod testing;
pub mod worker;

pub use cluster::Clusterer;
pub use worker::{EmbedWorker, WorkerStats};
