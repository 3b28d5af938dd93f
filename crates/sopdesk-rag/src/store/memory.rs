use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use sopdesk_core::traits::{DocumentStore, EmailThreadStore, FaqStore, SentimentStore, VerdictStore};
use sopdesk_core::types::{CoverageVerdict, EmailThread, Faq, SentimentRecord};
use sopdesk_core::{Error, Result};

#[derive(Default)]
struct State {
    documents: HashMap<String, Vec<u8>>,
    faqs: Vec<Faq>,
    verdicts: Vec<CoverageVerdict>,
    threads: Vec<EmailThread>,
    sentiments: HashMap<String, SentimentRecord>,
}

/// Everything held in memory; used by tests and one-off runs.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }

    pub fn with_document(self, id: &str, content: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut state) = self.write() {
            state.documents.insert(id.to_string(), content.into());
        }
        self
    }

    pub fn with_faq(self, id: &str, question: &str) -> Self {
        if let Ok(mut state) = self.write() {
            state.faqs.push(Faq { id: id.to_string(), question: question.to_string() });
        }
        self
    }

    pub fn with_thread(self, thread: EmailThread) -> Self {
        if let Ok(mut state) = self.write() {
            state.threads.push(thread);
        }
        self
    }

    /// Saved verdicts in first-save order.
    pub fn verdicts(&self) -> Vec<CoverageVerdict> {
        self.read().map(|s| s.verdicts.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_content(&self, document_id: &str) -> Result<Vec<u8>> {
        self.read()?
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("document {document_id}")))
    }
}

#[async_trait]
impl FaqStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Faq>> {
        Ok(self.read()?.faqs.clone())
    }
}

#[async_trait]
impl VerdictStore for MemoryStore {
    async fn save(&self, verdict: &CoverageVerdict) -> Result<()> {
        let mut state = self.write()?;
        upsert_verdict(&mut state.verdicts, verdict.clone());
        Ok(())
    }
}

#[async_trait]
impl EmailThreadStore for MemoryStore {
    async fn get_thread(&self, thread_id: &str) -> Result<EmailThread> {
        self.read()?
            .threads
            .iter()
            .find(|t| t.id == thread_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("thread {thread_id}")))
    }

    async fn list_threads(&self) -> Result<Vec<EmailThread>> {
        Ok(self.read()?.threads.clone())
    }
}

#[async_trait]
impl SentimentStore for MemoryStore {
    async fn latest(&self, thread_id: &str) -> Result<Option<SentimentRecord>> {
        Ok(self.read()?.sentiments.get(thread_id).cloned())
    }

    async fn record(&self, record: &SentimentRecord) -> Result<()> {
        self.write()?.sentiments.insert(record.thread_id.clone(), record.clone());
        Ok(())
    }
}

/// Replace the verdict for the same (faq, document) pair, or append.
pub(crate) fn upsert_verdict(verdicts: &mut Vec<CoverageVerdict>, verdict: CoverageVerdict) {
    match verdicts
        .iter_mut()
        .find(|v| v.faq_id == verdict.faq_id && v.document_id == verdict.document_id)
    {
        Some(existing) => *existing = verdict,
        None => verdicts.push(verdict),
    }
}

#[cfg(test)]
mod tests {
    use sopdesk_core::types::CoverageType;

    use super::*;

    fn verdict(faq: &str, coverage_type: CoverageType) -> CoverageVerdict {
        CoverageVerdict { faq_id: faq.into(), document_id: "sop".into(), coverage_type, reason: String::new() }
    }

    #[tokio::test]
    async fn saving_twice_supersedes() {
        let store = MemoryStore::new();
        store.save(&verdict("f1", CoverageType::NotCovered)).await.unwrap();
        store.save(&verdict("f2", CoverageType::NotCovered)).await.unwrap();
        store.save(&verdict("f1", CoverageType::FullyCovered)).await.unwrap();

        let saved = store.verdicts();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].coverage_type, CoverageType::FullyCovered);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get_content("nope").await, Err(Error::NotFound(_))));
        assert!(matches!(store.get_thread("nope").await, Err(Error::NotFound(_))));
    }
}
