use std::sync::Arc;

use sopdesk_core::traits::{EmailThreadStore, Generator};
use sopdesk_core::types::{EmailThread, SearchHit};
use sopdesk_core::{Error, Result};
use sopdesk_vector::VectorIndex;

use crate::prompts;
use crate::retriever::Retriever;

/// An inbound support email to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub subject: String,
    pub body: String,
    pub sender_name: String,
}

impl EmailRequest {
    /// Topic as subject, full discussion as body, latest customer as sender.
    pub fn from_thread(thread: &EmailThread) -> Result<Self> {
        let sender = thread
            .messages
            .iter()
            .filter(|m| !m.from_support)
            .max_by_key(|m| m.received_at)
            .or_else(|| thread.messages.first())
            .ok_or_else(|| Error::NotFound(format!("thread {} has no messages", thread.id)))?;
        Ok(Self {
            subject: thread.topic.clone(),
            body: prompts::format_discussion(thread),
            sender_name: sender.sender_name.clone(),
        })
    }
}

/// Retrieval plus generation. Owns the prompt templates' runtime inputs.
pub struct AnswerGenerator {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    sign_off: String,
}

impl AnswerGenerator {
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>, sign_off: impl Into<String>) -> Self {
        Self { retriever, generator, sign_off: sign_off.into() }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Raw generator output; failures come back as `Error::Generation`.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        self.generator.generate(prompt).await
    }

    pub async fn coverage_answer(&self, question: &str, hits: &[SearchHit]) -> Result<String> {
        self.generate(&prompts::coverage_prompt(question, hits)).await
    }

    pub async fn answer_email(&self, request: &EmailRequest, index: &VectorIndex) -> Result<String> {
        let query = format!("{}\n{}", request.subject, request.body);
        let hits = self.retriever.retrieve(index, &query).await?;
        tracing::debug!(hits = hits.len(), subject = %request.subject, "answering support email");
        let prompt =
            prompts::support_reply_prompt(&request.subject, &request.body, &request.sender_name, &hits, &self.sign_off);
        let reply = self.generate(&prompt).await?;
        Ok(reply.trim().to_string())
    }

    pub async fn answer_thread(
        &self,
        threads: &dyn EmailThreadStore,
        thread_id: &str,
        index: &VectorIndex,
    ) -> Result<String> {
        let thread = threads.get_thread(thread_id).await?;
        let request = EmailRequest::from_thread(&thread)?;
        self.answer_email(&request, index).await
    }
}
