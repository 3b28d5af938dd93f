//! Retrieval-augmented answering and SOP gap analysis.
//!
//! `SopPipeline` ties the pieces together: it builds a `VectorIndex` for a
//! stored document, answers support emails against it, and scores how well
//! the document covers every FAQ.

pub mod answer;
pub mod coverage;
pub mod pipeline;
pub mod prompts;
pub mod retriever;
pub mod sentiment;
pub mod store;

pub use answer::{AnswerGenerator, EmailRequest};
pub use coverage::{CoverageRun, GapCoverageEvaluator, PairFailure, PairOutcome, PairStage};
pub use pipeline::SopPipeline;
pub use retriever::Retriever;
pub use sentiment::{SentimentClassifier, ThreadSentimentOutcome};
