//! Thread sentiment/urgency classification. One prompt per thread, no retrieval.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use sopdesk_core::config::SentimentSettings;
use sopdesk_core::parser::parse_sentiment_label;
use sopdesk_core::traits::{EmailThreadStore, Generator, SentimentStore};
use sopdesk_core::types::{EmailThread, Sentiment, SentimentRecord, ThreadId};
use sopdesk_core::{Error, Result};

use crate::prompts;

#[derive(Debug)]
pub enum ThreadSentimentOutcome {
    Updated { thread_id: ThreadId, sentiment: Sentiment },
    /// Classified recently enough, or nothing to classify.
    Skipped { thread_id: ThreadId },
    Failed { thread_id: ThreadId, error: Error },
}

pub struct SentimentClassifier {
    generator: Arc<dyn Generator>,
    fallback: Option<Sentiment>,
    refresh_after: Duration,
}

impl SentimentClassifier {
    pub fn new(generator: Arc<dyn Generator>, settings: &SentimentSettings) -> Result<Self> {
        let refresh_after = Duration::try_minutes(settings.refresh_after_mins)
            .filter(|d| *d >= Duration::zero())
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "sentiment.refresh_after_mins out of range: {}",
                    settings.refresh_after_mins
                ))
            })?;
        Ok(Self { generator, fallback: settings.fallback, refresh_after })
    }

    /// An unrecognised label resolves to the configured fallback, or fails
    /// with `ParseError::UnknownSentiment` when there is none.
    pub async fn classify(&self, thread: &EmailThread) -> Result<Sentiment> {
        let prompt = prompts::sentiment_prompt(&prompts::format_discussion(thread));
        let raw = self.generator.generate(&prompt).await?;
        match parse_sentiment_label(&raw) {
            Ok(sentiment) => Ok(sentiment),
            Err(e) => match self.fallback {
                Some(fallback) => {
                    tracing::warn!(thread_id = %thread.id, label = raw.trim(), %fallback, "unrecognised sentiment label");
                    Ok(fallback)
                }
                None => Err(Error::Parse(e)),
            },
        }
    }

    /// Reclassify unless the stored sentiment is younger than the refresh
    /// window. `None` means the thread was skipped.
    pub async fn refresh_thread_sentiment(
        &self,
        thread: &EmailThread,
        store: &dyn SentimentStore,
        now: DateTime<Utc>,
    ) -> Result<Option<SentimentRecord>> {
        if thread.messages.is_empty() {
            return Ok(None);
        }
        if let Some(existing) = store.latest(&thread.id).await? {
            if now - existing.updated_at < self.refresh_after {
                tracing::debug!(thread_id = %thread.id, "sentiment is recent; skipping");
                return Ok(None);
            }
        }
        let sentiment = self.classify(thread).await?;
        let record = SentimentRecord { thread_id: thread.id.clone(), sentiment, updated_at: now };
        store.record(&record).await?;
        tracing::info!(thread_id = %thread.id, %sentiment, "sentiment updated");
        Ok(Some(record))
    }

    /// Refresh every thread; one thread's failure does not stop the others.
    pub async fn refresh_all(
        &self,
        threads: &dyn EmailThreadStore,
        store: &dyn SentimentStore,
    ) -> Result<Vec<ThreadSentimentOutcome>> {
        let now = Utc::now();
        let mut outcomes = Vec::new();
        for thread in threads.list_threads().await? {
            let thread_id = thread.id.clone();
            let outcome = match self.refresh_thread_sentiment(&thread, store, now).await {
                Ok(Some(record)) => ThreadSentimentOutcome::Updated { thread_id, sentiment: record.sentiment },
                Ok(None) => ThreadSentimentOutcome::Skipped { thread_id },
                Err(error) => {
                    tracing::warn!(thread_id = %thread_id, %error, "sentiment refresh failed");
                    ThreadSentimentOutcome::Failed { thread_id, error }
                }
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
