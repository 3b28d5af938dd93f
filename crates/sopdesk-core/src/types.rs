//! Domain types shared by the chunker, the vector index and the evaluator.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};
use crate::extract;

pub type DocumentId = String;
pub type FaqId = String;
pub type ThreadId = String;

/// A stored SOP document. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub content: Vec<u8>,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, content: impl Into<Vec<u8>>) -> Self {
        Self { id: id.into(), content: content.into() }
    }

    /// Document text: page text for a PDF, otherwise the bytes as UTF-8
    /// with invalid sequences replaced.
    pub fn text(&self) -> Result<Cow<'_, str>> {
        extract::document_text(&self.content)
    }
}

/// A contiguous segment of a document, kept only for the lifetime of a run.
///
/// - `document_id`: the document this chunk was cut from
/// - `ordinal`: position within the document, starting at 0
/// - `text`: chunk payload, including the overlap carried from the previous chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: DocumentId,
    pub ordinal: usize,
    pub text: String,
}

/// A frequently asked question. Reference data, never mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faq {
    pub id: FaqId,
    pub question: String,
}

/// How well a document answers a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageType {
    #[serde(rename = "Fully Covered")]
    FullyCovered,
    #[serde(rename = "Partially Covered")]
    PartiallyCovered,
    #[serde(rename = "Ambiguously Covered")]
    AmbiguouslyCovered,
    #[serde(rename = "Not Covered")]
    NotCovered,
}

impl CoverageType {
    pub const ALL: [CoverageType; 4] = [
        CoverageType::FullyCovered,
        CoverageType::PartiallyCovered,
        CoverageType::AmbiguouslyCovered,
        CoverageType::NotCovered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageType::FullyCovered => "Fully Covered",
            CoverageType::PartiallyCovered => "Partially Covered",
            CoverageType::AmbiguouslyCovered => "Ambiguously Covered",
            CoverageType::NotCovered => "Not Covered",
        }
    }
}

impl fmt::Display for CoverageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoverageType {
    type Err = ParseError;

    /// Case-insensitive; runs of whitespace compare equal to a single space.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        CoverageType::ALL
            .into_iter()
            .find(|c| c.as_str().to_lowercase() == wanted)
            .ok_or_else(|| ParseError::UnknownCoverageType(s.to_string()))
    }
}

/// The persisted judgement for one (FAQ, document) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageVerdict {
    pub faq_id: FaqId,
    pub document_id: DocumentId,
    pub coverage_type: CoverageType,
    pub reason: String,
}

/// One nearest-neighbour result. Lower `distance` is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub ordinal: usize,
    pub text: String,
    pub distance: f32,
}

/// Distance used both when building an index and when querying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance. Identical vectors are at distance 0.
    #[default]
    L2,
    /// `1 - cosine similarity`. Zero vectors are at distance 1 from everything.
    Cosine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub sender_name: String,
    pub sender_email: String,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subject: String,
    pub content: String,
    /// Messages written by the support side rather than the customer.
    #[serde(default)]
    pub from_support: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailThread {
    pub id: ThreadId,
    pub topic: String,
    #[serde(default)]
    pub messages: Vec<EmailMessage>,
}

/// Urgency/sentiment category for a support thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Critical,
    #[serde(rename = "Needs attention")]
    NeedsAttention,
    Neutral,
    /// Never produced by the classifier prompt; only usable as a configured fallback.
    Positive,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Critical => "Critical",
            Sentiment::NeedsAttention => "Needs attention",
            Sentiment::Neutral => "Neutral",
            Sentiment::Positive => "Positive",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub thread_id: ThreadId,
    pub sentiment: Sentiment,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn normalize_label(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
