pub mod dedupe;
pub mod normalize;
pub mod service;

pub use dedupe::check_and_store;
pub use normalize::{fingerprint, is_valid, normalize};
pub use service::IngestService;
