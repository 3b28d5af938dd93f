//! In-memory nearest-neighbour index over document chunks, the pipeline that
//! builds it from a stored document, and an optional content-hash embedding
//! cache.
//!
//! The index is rebuilt from scratch on every run and only becomes visible
//! once every chunk has been embedded.

pub mod cache;
pub mod index;
pub mod index_build;
#[cfg(feature = "lance-cache")]
pub mod lance_cache;

pub use cache::{content_hash, CacheEntry, EmbeddingCache, MemoryEmbeddingCache};
pub use index::VectorIndex;
pub use index_build::IndexBuilder;
#[cfg(feature = "lance-cache")]
pub use lance_cache::LanceEmbeddingCache;
