//! Recursive separator-based text chunking with character overlap.
//!
//! A document is first cut into pieces no longer than `chunk_size`
//! characters, trying separators in priority order and falling back to a
//! raw character cut. Pieces are then merged greedily, trimmed of
//! surrounding whitespace, and every chunk after the first is extended
//! backwards to start `chunk_overlap` characters before the end of its
//! predecessor.
//!
//! Every chunk is a contiguous substring of the document, at most
//! `chunk_size` characters long with its overlap included, and the last
//! `chunk_overlap` characters of chunk `i - 1` are a prefix of chunk `i`.
//! A piece too long to follow the overlap is cut finer rather than
//! dropping the overlap.

use std::collections::VecDeque;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Chunk;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Boundary strings, highest priority first.
    pub separators: Vec<String>,
    /// Maximum characters per chunk, overlap included.
    pub chunk_size: usize,
    /// Characters carried over from the previous chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            separators: ["\n\n", "\n", ".", ","].iter().map(|s| s.to_string()).collect(),
            chunk_size: 750,
            chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be greater than 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Split `text` into ordered chunks. Pure: same input, same output.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.chunk_spans(text).into_iter().map(|span| text[span].to_string()).collect()
    }

    pub fn chunk_document(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| Chunk { document_id: document_id.to_string(), ordinal, text })
            .collect()
    }

    /// Byte ranges of the final chunks, overlap included.
    fn chunk_spans(&self, text: &str) -> Vec<Range<usize>> {
        let size = self.config.chunk_size;
        let mut pieces = Vec::new();
        self.split_range(text, 0..text.len(), &self.config.separators, size, &mut pieces);
        let mut queue: VecDeque<Range<usize>> = pieces.into();

        let mut spans: Vec<Range<usize>> = Vec::new();
        while let Some(piece) = queue.pop_front() {
            let Some(content) = trim_span(text, piece.clone()) else { continue };
            let mut start = match spans.last() {
                Some(prev) if self.config.chunk_overlap > 0 => {
                    back_chars(text, prev.end, self.config.chunk_overlap).max(prev.start)
                }
                _ => content.start,
            };

            if char_len(&text[start..content.end]) > size {
                let budget = size.saturating_sub(char_len(&text[start..content.start]));
                if budget > 0 {
                    let mut finer = Vec::new();
                    self.split_range(text, content.start..piece.end, &self.config.separators, budget, &mut finer);
                    for p in finer.into_iter().rev() {
                        queue.push_front(p);
                    }
                    continue;
                }
                // whitespace between the chunks leaves no room for any overlap
                start = content.start;
            }

            let mut end = content.end;
            while let Some(next) = queue.front() {
                let candidate = start + text[start..next.end].trim_end().len();
                if char_len(&text[start..candidate]) > size {
                    break;
                }
                end = candidate;
                queue.pop_front();
            }
            spans.push(start..end);
        }
        spans
    }

    /// Cuts `range` into pieces of at most `limit` characters.
    fn split_range(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[String],
        limit: usize,
        out: &mut Vec<Range<usize>>,
    ) {
        let slice = &text[range.clone()];
        if char_len(slice) <= limit {
            out.push(range);
            return;
        }
        let Some((separator, rest)) = separators.split_first() else {
            hard_cut(text, range, limit, out);
            return;
        };
        if separator.is_empty() || !slice.contains(separator.as_str()) {
            self.split_range(text, range, rest, limit, out);
            return;
        }

        // The separator stays attached to the end of the part it closes.
        let mut start = range.start;
        for (offset, _) in slice.match_indices(separator.as_str()) {
            let at = range.start + offset + separator.len();
            if at == range.end {
                break;
            }
            self.split_range(text, start..at, rest, limit, out);
            start = at;
        }
        self.split_range(text, start..range.end, rest, limit, out);
    }
}

fn hard_cut(text: &str, range: Range<usize>, limit: usize, out: &mut Vec<Range<usize>>) {
    let mut start = range.start;
    let mut count = 0usize;
    for (offset, _) in text[range.clone()].char_indices() {
        if count == limit {
            let at = range.start + offset;
            out.push(start..at);
            start = at;
            count = 0;
        }
        count += 1;
    }
    if start < range.end {
        out.push(start..range.end);
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn trim_span(text: &str, span: Range<usize>) -> Option<Range<usize>> {
    let slice = &text[span.clone()];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = span.start + (slice.len() - slice.trim_start().len());
    Some(start..start + trimmed.len())
}

/// Byte offset `n` characters before `end`.
fn back_chars(text: &str, end: usize, n: usize) -> usize {
    text[..end].char_indices().rev().take(n).last().map_or(end, |(i, _)| i)
}
