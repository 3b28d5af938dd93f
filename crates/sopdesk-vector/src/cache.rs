//! Embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! Consulted before calling a provider and written through on misses, so a
//! re-run over an unchanged document costs no provider calls. The index is
//! still rebuilt every run; only the vectors are reused.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use sopdesk_core::{Error, Result};

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub content_hash: String,
    pub embedder_id: String,
    pub vector: Vec<f32>,
}

#[async_trait]
pub trait EmbeddingCache: Send + Sync {
    /// Cached vectors for the given hashes; absent hashes are simply missing.
    async fn get_many(&self, embedder_id: &str, hashes: &[String]) -> Result<HashMap<String, Vec<f32>>>;
    async fn put_many(&self, entries: &[CacheEntry]) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryEmbeddingCache {
    entries: RwLock<HashMap<(String, String), Vec<f32>>>,
}

impl MemoryEmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EmbeddingCache for MemoryEmbeddingCache {
    async fn get_many(&self, embedder_id: &str, hashes: &[String]) -> Result<HashMap<String, Vec<f32>>> {
        let entries = self.entries.read().map_err(|_| Error::Storage("embedding cache lock poisoned".into()))?;
        Ok(hashes
            .iter()
            .filter_map(|h| {
                entries
                    .get(&(h.clone(), embedder_id.to_string()))
                    .map(|v| (h.clone(), v.clone()))
            })
            .collect())
    }

    async fn put_many(&self, new_entries: &[CacheEntry]) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| Error::Storage("embedding cache lock poisoned".into()))?;
        for e in new_entries {
            entries.insert((e.content_hash.clone(), e.embedder_id.clone()), e.vector.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_are_scoped_by_embedder() {
        let cache = MemoryEmbeddingCache::new();
        let hash = content_hash("Refunds take 5-7 business days.");
        cache
            .put_many(&[CacheEntry { content_hash: hash.clone(), embedder_id: "a".into(), vector: vec![1.0] }])
            .await
            .unwrap();

        assert_eq!(cache.get_many("a", &[hash.clone()]).await.unwrap().get(&hash), Some(&vec![1.0]));
        assert!(cache.get_many("b", &[hash]).await.unwrap().is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn content_hash_is_stable_hex() {
        let h = content_hash("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, content_hash("abc"));
        assert_ne!(h, content_hash("abd"));
    }
}
