//! Embedding and text-generation providers.
//!
//! `OpenAiEmbedder`/`OpenAiGenerator` talk to any OpenAI-compatible HTTP API.
//! `HashEmbedder` is a deterministic offline stand-in for development and
//! tests; select it with `embedding.provider = "hash"` or
//! `APP_EMBEDDING__PROVIDER=hash`.

pub mod hash;
pub mod openai;

use std::sync::Arc;

use sopdesk_core::config::{EmbeddingProviderKind, EmbeddingSettings, GenerationSettings};
use sopdesk_core::traits::{Embedder, Generator};
use sopdesk_core::Result;

pub use hash::HashEmbedder;
pub use openai::{OpenAiEmbedder, OpenAiGenerator};

/// Build the embedder selected by configuration.
pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider {
        EmbeddingProviderKind::Hash => {
            tracing::info!(dim = settings.dim, "using hashing embedder");
            Ok(Arc::new(HashEmbedder::new(settings.dim)))
        }
        EmbeddingProviderKind::Openai => Ok(Arc::new(OpenAiEmbedder::from_settings(settings)?)),
    }
}

pub fn build_generator(settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
    Ok(Arc::new(OpenAiGenerator::from_settings(settings)?))
}
