use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{CoverageVerdict, EmailThread, Faq, SentimentRecord};

/// Maps text to fixed-length vectors.
///
/// Implementations must return exactly one vector per input, in input order,
/// all of length `dim()`. Any failure is reported as `Error::Provider`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-ada-002`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        match (vectors.pop(), vectors.is_empty()) {
            (Some(v), true) => Ok(v),
            _ => Err(Error::Provider("expected exactly one embedding".to_string())),
        }
    }
}

/// Free-text generation. Sampling parameters belong to the implementation's config.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Raw document bytes, or `Error::NotFound`.
    async fn get_content(&self, document_id: &str) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait FaqStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Faq>>;
}

#[async_trait]
pub trait VerdictStore: Send + Sync {
    /// Upsert: replaces any earlier verdict for the same (faq, document) pair.
    async fn save(&self, verdict: &CoverageVerdict) -> Result<()>;
}

/// Read-only access to support threads.
#[async_trait]
pub trait EmailThreadStore: Send + Sync {
    async fn get_thread(&self, thread_id: &str) -> Result<EmailThread>;
    async fn list_threads(&self) -> Result<Vec<EmailThread>>;
}

#[async_trait]
pub trait SentimentStore: Send + Sync {
    async fn latest(&self, thread_id: &str) -> Result<Option<SentimentRecord>>;
    /// Upsert keyed by thread.
    async fn record(&self, record: &SentimentRecord) -> Result<()>;
}
