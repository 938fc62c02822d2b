//! Semantic chunking with a sliding overlap for the retrieval summarizer.
//!
//! Segments are produced by `semchunk-rs` under a character budget (the unit the retrieval
//! prompt is sized in), then each chunk after the first is prefixed with the tail of its
//! predecessor so spans around boundaries stay visible to retrieval. Every emitted chunk still
//! respects the budget; when the overlap would push it over, text is trimmed from the start.

use semchunk_rs::Chunker;
use std::sync::Arc;
use thiserror::Error;

/// Target chunk length in characters.
pub const CHUNK_CHARS: usize = 1_000;
/// Characters carried over from the end of the previous chunk.
pub const CHUNK_OVERLAP_CHARS: usize = 200;

type SizeCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Caller configured an impossible budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Chunk text into semantic segments of at most `chunk_size` characters.
///
/// Returns an empty vector when the input text is all whitespace.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(chunk_text_with_counter(
        text,
        chunk_size,
        overlap,
        char_counter(),
    ))
}

fn char_counter() -> SizeCounter {
    Arc::new(|segment: &str| segment.chars().count())
}

fn chunk_text_with_counter(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    counter: SizeCounter,
) -> Vec<String> {
    // Leave room for the overlap so the carried-over tail survives the final budget trim.
    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    let counter_for_chunker = counter.clone();
    let chunker = Chunker::new(
        chunk_size - effective_overlap,
        Box::new(move |segment: &str| counter_for_chunker.as_ref()(segment)),
    );
    let base_chunks = chunker.chunk(text);
    apply_overlap(base_chunks, chunk_size, effective_overlap, &counter)
}

/// Prefix every chunk after the first with up to `overlap` units from its predecessor's tail.
fn apply_overlap(
    chunks: Vec<String>,
    chunk_size: usize,
    overlap: usize,
    counter: &SizeCounter,
) -> Vec<String> {
    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    if chunks.len() < 2 || effective_overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut iter = chunks.into_iter();
    let Some(mut previous) = iter.next() else {
        return overlapped;
    };
    overlapped.push(previous.clone());

    for current in iter {
        overlapped.push(build_overlapped_chunk(
            &previous,
            &current,
            effective_overlap,
            chunk_size,
            counter,
        ));
        previous = current;
    }

    overlapped
}

fn build_overlapped_chunk(
    previous: &str,
    current: &str,
    overlap: usize,
    chunk_size: usize,
    counter: &SizeCounter,
) -> String {
    let tail = tail_within(previous, overlap, counter);
    let mut combined = String::with_capacity(tail.len() + current.len() + 1);

    if !tail.is_empty() {
        combined.push_str(tail);
        if !ends_with_whitespace(tail) && !starts_with_whitespace(current) {
            combined.push(' ');
        }
    }

    combined.push_str(current);
    trim_start_within(&combined, chunk_size, counter).to_string()
}

/// Longest whitespace-trimmed suffix of `text` whose size is at most `limit`.
fn tail_within<'a>(text: &'a str, limit: usize, counter: &SizeCounter) -> &'a str {
    if limit == 0 {
        return "";
    }
    trim_start_within(text, limit, counter)
}

/// Drop characters from the start of `text` until it fits `budget`.
fn trim_start_within<'a>(text: &'a str, budget: usize, counter: &SizeCounter) -> &'a str {
    if budget == 0 {
        return "";
    }

    let trimmed_text = text.trim_start();
    if counter.as_ref()(trimmed_text) <= budget {
        return trimmed_text;
    }

    for (offset, _) in text.char_indices().skip(1) {
        let trimmed = text[offset..].trim_start();
        if counter.as_ref()(trimmed) <= budget {
            return trimmed;
        }
    }

    ""
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_whitespace)
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars().next_back().is_some_and(char::is_whitespace)
}
