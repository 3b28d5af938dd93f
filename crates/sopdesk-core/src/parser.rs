//! Structured output extraction from free-form generator replies.
//!
//! Generators are asked to reply with a single JSON object, but routinely wrap
//! it in prose or code fences. `extract_json_object` finds the first `{` and
//! its matching `}` by depth counting (braces inside JSON strings are ignored)
//! and parses only that span.

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::types::{normalize_label, CoverageType, Sentiment};

/// A validated coverage reply.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageAssessment {
    pub coverage_type: CoverageType,
    /// Empty when the generator omitted it.
    pub reason: String,
    /// Any other fields, passed through unvalidated.
    pub extra: Map<String, Value>,
}

pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, ParseError> {
    let span = object_span(raw)?;
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ParseError::Json(format!("expected an object, got {other}"))),
        Err(e) => Err(ParseError::Json(e.to_string())),
    }
}

/// Extracts the JSON object and checks `coverage_type` against the fixed set.
pub fn parse_coverage(raw: &str) -> Result<CoverageAssessment, ParseError> {
    let mut object = extract_json_object(raw)?;

    let coverage_type = match object.remove("coverage_type") {
        None | Some(Value::Null) => return Err(ParseError::MissingField("coverage_type")),
        Some(Value::String(label)) => label.parse::<CoverageType>()?,
        Some(other) => return Err(ParseError::UnknownCoverageType(other.to_string())),
    };
    let reason = match object.remove("reason") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(reason)) => reason,
        Some(other) => other.to_string(),
    };

    Ok(CoverageAssessment { coverage_type, reason, extra: object })
}

/// Reads a bare category label such as `Critical` or `**Needs Attention.**`.
pub fn parse_sentiment_label(raw: &str) -> Result<Sentiment, ParseError> {
    let cleaned = raw.trim().trim_matches(|c: char| matches!(c, '*' | '"' | '\'' | '`' | '.') || c.is_whitespace());
    match normalize_label(cleaned).as_str() {
        "critical" => Ok(Sentiment::Critical),
        "needs attention" => Ok(Sentiment::NeedsAttention),
        "neutral" => Ok(Sentiment::Neutral),
        _ => Err(ParseError::UnknownSentiment(raw.trim().to_string())),
    }
}

fn object_span(raw: &str) -> Result<&str, ParseError> {
    let start = raw.find('{').ok_or(ParseError::NoObject)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    Err(ParseError::Unbalanced)
}
