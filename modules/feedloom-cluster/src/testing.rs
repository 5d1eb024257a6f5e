//! Test embedders for the worker and clustering pipeline.
//!
//! Deterministic, no model, no network. `StubEmbedder` derives a stable
//! vector from the text's digest; `FixedEmbedder` returns canned vectors per
//! text; `FailingEmbedder` always errors.

use std::collections::HashMap;

use anyhow::{bail, Result};
use feedloom_common::TextEmbedder;
use sha2::{Digest, Sha256};

/// Standard embedding dimension for test vectors.
pub const TEST_EMBEDDING_DIM: usize = 8;

/// Deterministic hash-based embedder: same text, same unit vector.
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(TEST_EMBEDDING_DIM)
    }
}

#[async_trait::async_trait]
impl TextEmbedder for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let digest = Sha256::digest(text.as_bytes());
        let mut vector: Vec<f64> = (0..self.dimension)
            .map(|i| digest[i % digest.len()] as f64 + 1.0)
            .collect();
        let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
        for x in &mut vector {
            *x /= norm;
        }
        Ok(vector)
    }
}

/// Embedder with canned responses. Builder pattern: `.on(text, vector)`.
/// Errors for unregistered texts.
#[derive(Default)]
pub struct FixedEmbedder {
    responses: HashMap<String, Vec<f64>>,
    dimension: usize,
}

impl FixedEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, text: &str, vector: Vec<f64>) -> Self {
        self.dimension = vector.len();
        self.responses.insert(text.to_string(), vector);
        self
    }
}

#[async_trait::async_trait]
impl TextEmbedder for FixedEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        match self.responses.get(text) {
            Some(vector) => Ok(vector.clone()),
            None => bail!("no canned embedding for {text:?}"),
        }
    }
}

/// Embedder that always fails, for exercising the drop path.
pub struct FailingEmbedder;

#[async_trait::async_trait]
impl TextEmbedder for FailingEmbedder {
    fn dimension(&self) -> usize {
        TEST_EMBEDDING_DIM
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f64>> {
        bail!("embedding provider is down")
    }
}
