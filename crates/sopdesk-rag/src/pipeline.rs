use std::sync::Arc;
use std::time::Duration;

use sopdesk_core::config::Settings;
use sopdesk_core::traits::{DocumentStore, EmailThreadStore, Embedder, FaqStore, Generator, VerdictStore};
use sopdesk_core::Result;
use sopdesk_vector::{EmbeddingCache, IndexBuilder, VectorIndex};

use crate::answer::{AnswerGenerator, EmailRequest};
use crate::coverage::{CoverageRun, GapCoverageEvaluator};
use crate::retriever::Retriever;

/// The operations exposed to callers, with every collaborator passed in.
pub struct SopPipeline {
    builder: IndexBuilder,
    documents: Arc<dyn DocumentStore>,
    answers: Arc<AnswerGenerator>,
    evaluator: GapCoverageEvaluator,
}

impl SopPipeline {
    pub fn new(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        documents: Arc<dyn DocumentStore>,
        faqs: Arc<dyn FaqStore>,
        verdicts: Arc<dyn VerdictStore>,
    ) -> Result<Self> {
        settings.validate()?;
        let builder = IndexBuilder::from_settings(settings, Arc::clone(&embedder))?;
        let retriever = Retriever::new(embedder, settings.retrieval.top_k);
        let answers = Arc::new(AnswerGenerator::new(retriever, generator, settings.reply.sign_off.clone()));
        let evaluator = GapCoverageEvaluator::new(Arc::clone(&answers), faqs, verdicts)
            .with_max_in_flight(settings.evaluation.max_in_flight)
            .with_run_timeout(settings.evaluation.run_timeout_secs.map(Duration::from_secs));
        Ok(Self { builder, documents, answers, evaluator })
    }

    pub fn with_cache(mut self, cache: Arc<dyn EmbeddingCache>) -> Self {
        self.builder = self.builder.with_cache(cache);
        self
    }

    /// `Error::NotFound` for an unknown document, `Error::Provider` if any
    /// chunk fails to embed.
    pub async fn build_index(&self, document_id: &str) -> Result<VectorIndex> {
        self.builder.build_index(self.documents.as_ref(), document_id).await
    }

    pub async fn answer_email(&self, subject: &str, body: &str, sender_name: &str, index: &VectorIndex) -> Result<String> {
        let request = EmailRequest {
            subject: subject.to_string(),
            body: body.to_string(),
            sender_name: sender_name.to_string(),
        };
        self.answers.answer_email(&request, index).await
    }

    pub async fn answer_thread(
        &self,
        threads: &dyn EmailThreadStore,
        thread_id: &str,
        index: &VectorIndex,
    ) -> Result<String> {
        self.answers.answer_thread(threads, thread_id, index).await
    }

    /// Rebuild the document's index, then evaluate every FAQ against it.
    pub async fn evaluate_coverage(&self, document_id: &str) -> Result<CoverageRun> {
        let index = self.build_index(document_id).await?;
        self.evaluator.evaluate(document_id, &index).await
    }
}
