//! Retrieval-augmented summarization: chunk, embed, pick the chunks nearest to the question,
//! then prompt Gemini with them as context.

use super::chunking::{CHUNK_CHARS, CHUNK_OVERLAP_CHARS, chunk_text};
use super::extractive::extractive_summary;
use super::gemini::GeminiClient;
use super::index::FlatL2Index;
use super::{DEFAULT_QUESTION, SummarizationError, Summarizer};
use crate::embedding::EmbeddingClient;
use async_trait::async_trait;

/// Chunks retrieved per request unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// Summarizer that works on the most question-relevant slice of a long document.
///
/// Without a completion client the retrieved context is summarized extractively.
pub struct RetrievalSummarizer {
    embedder: Box<dyn EmbeddingClient>,
    completion: Option<GeminiClient>,
    top_k: usize,
}

impl RetrievalSummarizer {
    /// Assemble the pipeline from an embedder and an optional Gemini client.
    pub fn new(
        embedder: Box<dyn EmbeddingClient>,
        completion: Option<GeminiClient>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            completion,
            top_k: top_k.max(1),
        }
    }

    /// Join the `top_k` chunks nearest to `question`, nearest first, separated by blank lines.
    pub async fn retrieve_context(
        &self,
        text: &str,
        question: &str,
    ) -> Result<String, SummarizationError> {
        let chunks = chunk_text(text, CHUNK_CHARS, CHUNK_OVERLAP_CHARS)?;
        if chunks.is_empty() {
            return Ok(String::new());
        }

        let embeddings = self.embedder.generate_embeddings(chunks.clone()).await?;
        let query = self
            .embedder
            .generate_embeddings(vec![question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                SummarizationError::InvalidResponse("no embedding returned for question".into())
            })?;

        let mut index = FlatL2Index::new(query.len());
        for embedding in embeddings {
            index.add(embedding)?;
        }
        let hits = index.search(&query, self.top_k)?;

        tracing::debug!(
            chunks = chunks.len(),
            retrieved = hits.len(),
            "Retrieved context chunks"
        );

        Ok(hits
            .iter()
            .map(|hit| chunks[hit.position].as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

fn retrieval_prompt(context: &str) -> String {
    format!(
        "Based on the following document content, please provide a comprehensive summary:\n\n\
         Document Content:\n{context}\n\n\
         Please provide a clear, well-structured summary that covers the main points, key \
         concepts, and important details from the document."
    )
}

#[async_trait]
impl Summarizer for RetrievalSummarizer {
    async fn summarize(
        &self,
        text: &str,
        question: Option<&str>,
    ) -> Result<String, SummarizationError> {
        let question = question.unwrap_or(DEFAULT_QUESTION);
        let context = self.retrieve_context(text, question).await?;

        match &self.completion {
            Some(client) => client.generate(&retrieval_prompt(&context)).await,
            None => Ok(extractive_summary(&context)),
        }
    }

    fn name(&self) -> &str {
        "retrieval"
    }
}
