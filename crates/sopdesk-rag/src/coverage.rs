//! Gap coverage evaluation: one verdict per FAQ against one document.
//!
//! Each (FAQ, document) pair runs `Retrieve -> Generate -> Parse -> Persist`.
//! A failing step ends that pair only; the run reports it and moves on. Pairs
//! may run concurrently (`max_in_flight`), results are always in FAQ order.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};

use futures::StreamExt;
use tokio::time::Instant;

use sopdesk_core::parser::parse_coverage;
use sopdesk_core::traits::{FaqStore, VerdictStore};
use sopdesk_core::types::{CoverageVerdict, DocumentId, Faq, FaqId};
use sopdesk_core::{Error, Result};
use sopdesk_vector::VectorIndex;

use crate::answer::AnswerGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairStage {
    Retrieve,
    Generate,
    Parse,
    Persist,
}

impl fmt::Display for PairStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PairStage::Retrieve => "retrieve",
            PairStage::Generate => "generate",
            PairStage::Parse => "parse",
            PairStage::Persist => "persist",
        })
    }
}

/// Why a pair produced no verdict.
#[derive(Debug)]
pub struct PairFailure {
    pub faq_id: FaqId,
    pub stage: PairStage,
    pub error: Error,
}

#[derive(Debug)]
pub enum PairOutcome {
    Done(CoverageVerdict),
    Failed(PairFailure),
}

impl PairOutcome {
    pub fn faq_id(&self) -> &str {
        match self {
            PairOutcome::Done(v) => &v.faq_id,
            PairOutcome::Failed(f) => &f.faq_id,
        }
    }

    pub fn verdict(&self) -> Option<&CoverageVerdict> {
        match self {
            PairOutcome::Done(v) => Some(v),
            PairOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&PairFailure> {
        match self {
            PairOutcome::Done(_) => None,
            PairOutcome::Failed(f) => Some(f),
        }
    }
}

/// Outcome of one evaluation run, one entry per FAQ in FAQ order.
#[derive(Debug)]
pub struct CoverageRun {
    pub document_id: DocumentId,
    pub outcomes: Vec<PairOutcome>,
}

impl CoverageRun {
    pub fn verdicts(&self) -> impl Iterator<Item = &CoverageVerdict> {
        self.outcomes.iter().filter_map(PairOutcome::verdict)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PairFailure> {
        self.outcomes.iter().filter_map(PairOutcome::failure)
    }

    pub fn done_count(&self) -> usize {
        self.verdicts().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }
}

pub struct GapCoverageEvaluator {
    answers: Arc<AnswerGenerator>,
    faqs: Arc<dyn FaqStore>,
    verdicts: Arc<dyn VerdictStore>,
    max_in_flight: usize,
    run_timeout: Option<Duration>,
}

impl GapCoverageEvaluator {
    pub fn new(answers: Arc<AnswerGenerator>, faqs: Arc<dyn FaqStore>, verdicts: Arc<dyn VerdictStore>) -> Self {
        Self { answers, faqs, verdicts, max_in_flight: 1, run_timeout: None }
    }

    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n.max(1);
        self
    }

    /// Pairs still running when the timeout elapses fail with `Error::Cancelled`.
    /// Verdicts already persisted stay as they are.
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Evaluate every FAQ against an already built index. Only a failure to
    /// list FAQs fails the call; per-pair errors are in the returned run.
    pub async fn evaluate(&self, document_id: &str, index: &VectorIndex) -> Result<CoverageRun> {
        let started = StdInstant::now();
        let faqs = self.faqs.list().await?;
        let deadline = self.run_timeout.map(|t| Instant::now() + t);
        tracing::info!(document_id, faqs = faqs.len(), chunks = index.len(), "coverage evaluation started");

        let outcomes: Vec<PairOutcome> = futures::stream::iter(faqs.iter())
            .map(|faq| self.evaluate_pair(faq, document_id, index, deadline))
            .buffered(self.max_in_flight)
            .collect()
            .await;

        let run = CoverageRun { document_id: document_id.to_string(), outcomes };
        tracing::info!(
            document_id,
            done = run.done_count(),
            failed = run.failed_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "coverage evaluation finished"
        );
        Ok(run)
    }

    async fn evaluate_pair(
        &self,
        faq: &Faq,
        document_id: &str,
        index: &VectorIndex,
        deadline: Option<Instant>,
    ) -> PairOutcome {
        match self.run_pair(faq, document_id, index, deadline).await {
            Ok(verdict) => {
                tracing::debug!(faq_id = %faq.id, document_id, coverage = %verdict.coverage_type, "pair done");
                PairOutcome::Done(verdict)
            }
            Err((stage, error)) => {
                if matches!(error, Error::Storage(_)) {
                    tracing::error!(faq_id = %faq.id, document_id, %error, "verdict not persisted");
                } else {
                    tracing::warn!(faq_id = %faq.id, document_id, %stage, kind = error.kind(), %error, "pair failed");
                }
                PairOutcome::Failed(PairFailure { faq_id: faq.id.clone(), stage, error })
            }
        }
    }

    async fn run_pair(
        &self,
        faq: &Faq,
        document_id: &str,
        index: &VectorIndex,
        deadline: Option<Instant>,
    ) -> std::result::Result<CoverageVerdict, (PairStage, Error)> {
        let hits = within(deadline, self.answers.retriever().retrieve(index, &faq.question))
            .await
            .map_err(|e| (PairStage::Retrieve, e))?;
        tracing::debug!(faq_id = %faq.id, hits = hits.len(), "retrieved");

        let raw = within(deadline, self.answers.coverage_answer(&faq.question, &hits))
            .await
            .map_err(|e| (PairStage::Generate, e))?;

        let assessment = parse_coverage(&raw).map_err(|e| (PairStage::Parse, Error::Parse(e)))?;

        let verdict = CoverageVerdict {
            faq_id: faq.id.clone(),
            document_id: document_id.to_string(),
            coverage_type: assessment.coverage_type,
            reason: assessment.reason,
        };
        // a save is one atomic unit and is never interrupted by the deadline
        self.verdicts.save(&verdict).await.map_err(|e| (PairStage::Persist, e))?;
        Ok(verdict)
    }
}

async fn within<T>(deadline: Option<Instant>, fut: impl Future<Output = Result<T>>) -> Result<T> {
    let Some(deadline) = deadline else { return fut.await };
    if Instant::now() >= deadline {
        return Err(Error::Cancelled("run timeout elapsed".to_string()));
    }
    tokio::time::timeout_at(deadline, fut)
        .await
        .unwrap_or_else(|_| Err(Error::Cancelled("run timeout elapsed".to_string())))
}
