//! Document → chunks → embeddings → `VectorIndex`.
//!
//! Chunks are embedded in batches of `batch_size`, with at most
//! `max_in_flight` provider calls outstanding. Batches are reassembled in
//! chunk order, and any provider failure fails the whole build: a partial
//! index would under-report coverage.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, TryStreamExt};

use sopdesk_core::chunker::TextChunker;
use sopdesk_core::config::Settings;
use sopdesk_core::traits::{DocumentStore, Embedder};
use sopdesk_core::types::{DistanceMetric, Document};
use sopdesk_core::{Error, Result};

use crate::cache::{content_hash, CacheEntry, EmbeddingCache};
use crate::index::VectorIndex;

pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
    metric: DistanceMetric,
    batch_size: usize,
    max_in_flight: usize,
    cache: Option<Arc<dyn EmbeddingCache>>,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, chunker: TextChunker) -> Self {
        Self { embedder, chunker, metric: DistanceMetric::L2, batch_size: 64, max_in_flight: 4, cache: None }
    }

    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let chunker = TextChunker::new(settings.chunking.clone())?;
        Ok(Self::new(embedder, chunker)
            .with_metric(settings.embedding.metric)
            .with_batching(settings.embedding.batch_size, settings.embedding.max_in_flight))
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_batching(mut self, batch_size: usize, max_in_flight: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn EmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Fetch a stored document and index it. `Error::NotFound` if it is missing.
    pub async fn build_index(&self, documents: &dyn DocumentStore, document_id: &str) -> Result<VectorIndex> {
        let content = documents.get_content(document_id).await?;
        let document = Document::new(document_id, content);
        self.build_from_text(document_id, &document.text()?).await
    }

    pub async fn build_from_text(&self, document_id: &str, text: &str) -> Result<VectorIndex> {
        let started = Instant::now();
        let chunks = self.chunker.chunk_document(document_id, text);
        if chunks.is_empty() {
            tracing::info!(document_id, "document has no text; index is empty");
            return Ok(VectorIndex::empty(self.metric));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_chunks(&texts).await?;
        let index = VectorIndex::from_chunks(self.metric, chunks, vectors)?;
        tracing::info!(
            document_id,
            chunks = index.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "vector index built"
        );
        Ok(index)
    }

    /// One vector per input text, in input order, or an error.
    pub async fn embed_chunks(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let dim = self.embedder.dim();
        let embedder_id = self.embedder.embedder_id().to_string();
        let hashes: Vec<String> = texts.iter().map(|t| content_hash(t)).collect();

        let cached = self.cache_lookup(&embedder_id, &hashes, dim).await;
        let miss_indices: Vec<usize> = (0..texts.len()).filter(|i| !cached.contains_key(&hashes[*i])).collect();
        tracing::debug!(total = texts.len(), cached = texts.len() - miss_indices.len(), "embedding chunks");

        let miss_texts: Vec<String> = miss_indices.iter().map(|&i| texts[i].clone()).collect();
        let batches: Vec<Vec<String>> = miss_texts.chunks(self.batch_size).map(|b| b.to_vec()).collect();
        let embedded: Vec<Vec<Vec<f32>>> = futures::stream::iter(batches)
            .map(|batch| {
                let embedder = Arc::clone(&self.embedder);
                async move {
                    let vectors = embedder.embed_batch(&batch).await?;
                    check_batch(&batch, &vectors, dim)?;
                    Ok::<_, Error>(vectors)
                }
            })
            .buffered(self.max_in_flight)
            .try_collect()
            .await?;
        let fresh: Vec<Vec<f32>> = embedded.into_iter().flatten().collect();

        let mut vectors: Vec<Option<Vec<f32>>> = hashes.iter().map(|h| cached.get(h).cloned()).collect();
        let mut new_entries = Vec::with_capacity(fresh.len());
        for (&i, vector) in miss_indices.iter().zip(fresh) {
            new_entries.push(CacheEntry {
                content_hash: hashes[i].clone(),
                embedder_id: embedder_id.clone(),
                vector: vector.clone(),
            });
            vectors[i] = Some(vector);
        }
        self.cache_store(&new_entries).await;

        vectors
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.ok_or_else(|| Error::Provider(format!("no embedding produced for chunk {i}"))))
            .collect()
    }

    async fn cache_lookup(&self, embedder_id: &str, hashes: &[String], dim: usize) -> HashMap<String, Vec<f32>> {
        let Some(cache) = &self.cache else { return HashMap::new() };
        match cache.get_many(embedder_id, hashes).await {
            Ok(mut found) => {
                found.retain(|_, v| v.len() == dim);
                found
            }
            Err(e) => {
                tracing::warn!(error = %e, "embedding cache lookup failed; embedding every chunk");
                HashMap::new()
            }
        }
    }

    async fn cache_store(&self, entries: &[CacheEntry]) {
        let Some(cache) = &self.cache else { return };
        if entries.is_empty() {
            return;
        }
        if let Err(e) = cache.put_many(entries).await {
            tracing::warn!(error = %e, entries = entries.len(), "embedding cache write failed");
        }
    }
}

fn check_batch(batch: &[String], vectors: &[Vec<f32>], dim: usize) -> Result<()> {
    if vectors.len() != batch.len() {
        return Err(Error::Provider(format!(
            "embedder returned {} vectors for {} inputs",
            vectors.len(),
            batch.len()
        )));
    }
    if let Some(v) = vectors.iter().find(|v| v.len() != dim) {
        return Err(Error::Provider(format!("dim mismatch: got {} expected {}", v.len(), dim)));
    }
    Ok(())
}
