//! Prompt templates sent to the text generator.

use std::fmt::Write as _;

use sopdesk_core::types::{CoverageType, EmailThread, SearchHit};

const NO_EXCERPTS: &str = "(no relevant SOP excerpts were found)";

fn excerpts(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_EXCERPTS.to_string();
    }
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let _ = writeln!(out, "[{}] {}\n", i + 1, hit.text.trim());
    }
    out.trim_end().to_string()
}

/// Asks for exactly one JSON object `{coverage_type, reason}` judging how much
/// of `question` the excerpts answer.
pub fn coverage_prompt(question: &str, hits: &[SearchHit]) -> String {
    let labels = CoverageType::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ");
    format!(
        r#"You are an assistant checking SOP compliance.
Using only the SOP excerpts below, evaluate how much of the following question is covered by the SOP and give a detailed reason for your assessment.

SOP excerpts:
{excerpts}

Inquiry: "{question}"

Pick exactly one coverage type from: {labels}.
- If it's Fully Covered, explain why.
- If it's Partially Covered, mention what's missing.
- If it's Ambiguously Covered, explain the gaps.
- If it's Not Covered, mention why the question is out of context.

Respond with exactly one JSON object in this format and nothing else:
{{"coverage_type": "<coverage type>", "reason": "<reason for the coverage type>"}}"#,
        excerpts = excerpts(hits),
        question = question.trim(),
    )
}

/// Formal support reply grounded in the excerpts, signed as `sign_off`.
pub fn support_reply_prompt(subject: &str, body: &str, sender_name: &str, hits: &[SearchHit], sign_off: &str) -> String {
    format!(
        r#"You are a helpful assistant that writes responses based on company SOP guidelines.
The query is an email with the subject: "{subject}".
Below is the email discussion asking about a specific process related to the company SOP.
Write a formal and professional response to this email, addressing each point appropriately.

Relevant SOP excerpts:
{excerpts}

Email sender name: {sender_name}
Email discussion: {body}

Refer to the procedures in the SOP excerpts above and give a comprehensive response, including step-by-step guidelines, documentation and any relevant timelines.
Refer to yourself as {sign_off} at the end of the mail. Don't add a subject line to the response."#,
        subject = subject.trim(),
        excerpts = excerpts(hits),
        sender_name = sender_name.trim(),
        body = body.trim(),
        sign_off = sign_off,
    )
}

pub fn sentiment_prompt(discussion: &str) -> String {
    format!(
        r#"I will provide an email discussion thread between a customer and a customer support team for a supply chain company.
Based on the conversation, categorize the sentiment and urgency of the thread using the following categories:
1. Critical: high urgency, negative sentiment or frustration. These emails require immediate action or resolution.
2. Needs attention: moderate urgency or concern, such as complaints, requests for clarification or unresolved issues. They may require follow-up but are not as pressing as critical emails.
3. Neutral: purely informational, with no immediate request or concern, or expressing satisfaction, appreciation or positive feedback.
The customer might write sarcastically; make sure to understand them.

Return only the category (Critical, Needs attention, Neutral) and nothing else.

Discussion:
{discussion}"#
    )
}

/// `From:`/`Date:`/`Content:` blocks, oldest message first.
pub fn format_discussion(thread: &EmailThread) -> String {
    let mut messages: Vec<_> = thread.messages.iter().collect();
    // messages without a timestamp keep their stored position at the front
    messages.sort_by_key(|m| m.received_at);
    let mut out = String::new();
    for m in messages {
        let date = m
            .received_at
            .map(|d| d.format("%B %d, %Y %I:%M %p").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let _ = write!(out, "From: {}\nDate: {}\nContent: {}\n\n", m.sender_email, date, m.content.trim());
    }
    out
}
