use std::sync::Arc;

use sopdesk_core::traits::Embedder;
use sopdesk_core::types::SearchHit;
use sopdesk_core::Result;
use sopdesk_vector::VectorIndex;

/// Embeds a query with the same embedder the index was built with and
/// returns the `top_k` closest chunks.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self { embedder, top_k: top_k.max(1) }
    }

    pub async fn retrieve(&self, index: &VectorIndex, query: &str) -> Result<Vec<SearchHit>> {
        if index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query).await?;
        index.query(&vector, self.top_k)
    }
}
