use anyhow::Result;

/// Text embedding capability: given text, produce a fixed-dimension vector.
/// Concrete providers (local model, remote API) are swappable implementations
/// selected by configuration; this core only consumes the trait.
#[async_trait::async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embedding vector dimension. Fixed per deployment; the clustering
    /// engine rejects vectors that disagree with the existing topic set.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f64>>;

    /// Embed multiple texts. Default implementation embeds one at a time;
    /// override for providers with a batch endpoint.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
