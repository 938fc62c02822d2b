//! Document summarization behind a single [`Summarizer`] capability.
//!
//! The backend is picked once at startup from `SUMMARIZATION_PROVIDER`. Remote backends send
//! the document to an LLM in one request (Gemini, OpenAI, Hugging Face) or retrieve the most
//! relevant chunks first (retrieval). When a remote backend's credential is missing the service
//! either degrades to the extractive summarizer or, with `SUMMARIZATION_FALLBACK=false`, reports
//! the missing credential on every call.

pub mod chunking;
mod extractive;
mod gemini;
mod huggingface;
pub mod index;
mod openai;
mod retrieval;

use crate::config::{Config, SummarizationProvider};
use crate::embedding::{EmbeddingClientError, embedding_client_from_config};
use async_trait::async_trait;
use thiserror::Error;

pub use chunking::ChunkingError;
pub use extractive::{ExtractiveSummarizer, extractive_summary};
pub use gemini::{DEFAULT_GEMINI_MODEL, GeminiClient, GeminiSummarizer};
pub use huggingface::{DEFAULT_HUGGINGFACE_MODEL, HuggingFaceSummarizer};
pub use index::IndexError;
pub use openai::{DEFAULT_OPENAI_MODEL, OpenAiSummarizer};
pub use retrieval::RetrievalSummarizer;

/// Question used by the retrieval backend when the caller supplies none.
pub const DEFAULT_QUESTION: &str = "Summarize this document";

const DIRECT_INSTRUCTION: &str = "Please provide a comprehensive summary of the following text:";

/// Errors surfaced while producing a summary.
#[derive(Debug, Error)]
pub enum SummarizationError {
    /// The selected backend needs a credential that is not configured.
    #[error("Summarization requires {0} to be set")]
    MissingCredential(&'static str),
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The provider could not be reached.
    #[error("Summarization request failed: {0}")]
    RequestFailed(String),
    /// The provider answered with an error status.
    #[error("Summarization service error: {0}")]
    RemoteService(String),
    /// The provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// The hosted model is still loading.
    #[error("Summarization model is warming up: {0}")]
    ModelWarmingUp(String),
    /// Chunking the document failed.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding chunks or the question failed.
    #[error("Failed to embed document: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Chunk vectors could not be indexed or searched.
    #[error("Vector index error: {0}")]
    Index(#[from] IndexError),
}

/// Interface implemented by every summarization backend.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text`, optionally steered by a question.
    async fn summarize(
        &self,
        text: &str,
        question: Option<&str>,
    ) -> Result<String, SummarizationError>;

    /// Backend name reported by the health endpoint.
    fn name(&self) -> &str;
}

/// Stand-in for a backend whose credential is missing while fallback is disabled.
struct UnavailableSummarizer {
    backend: &'static str,
    credential: &'static str,
}

#[async_trait]
impl Summarizer for UnavailableSummarizer {
    async fn summarize(
        &self,
        _text: &str,
        _question: Option<&str>,
    ) -> Result<String, SummarizationError> {
        Err(SummarizationError::MissingCredential(self.credential))
    }

    fn name(&self) -> &str {
        self.backend
    }
}

/// Build the summarizer selected by configuration.
pub fn summarizer_from_config(config: &Config) -> Result<Box<dyn Summarizer>, SummarizationError> {
    let provider = config.summarization_provider;
    let model = |default: &str| {
        config
            .summarization_model
            .clone()
            .unwrap_or_else(|| default.to_string())
    };

    let summarizer: Box<dyn Summarizer> = match provider {
        SummarizationProvider::Extractive => Box::new(ExtractiveSummarizer),
        SummarizationProvider::Gemini => match &config.google_api_key {
            Some(key) => Box::new(GeminiSummarizer::new(GeminiClient::new(
                config.gemini_api_url.clone(),
                model(DEFAULT_GEMINI_MODEL),
                key.clone(),
            )?)),
            None => without_credential(config, "gemini", "GOOGLE_API_KEY"),
        },
        SummarizationProvider::HuggingFace => match &config.huggingface_api_key {
            Some(key) => Box::new(HuggingFaceSummarizer::new(
                config.huggingface_api_url.clone(),
                model(DEFAULT_HUGGINGFACE_MODEL),
                key.clone(),
            )?),
            None => without_credential(config, "huggingface", "HUGGINGFACE_API_KEY"),
        },
        SummarizationProvider::OpenAI => match &config.openai_api_key {
            Some(key) => Box::new(OpenAiSummarizer::new(
                config.openai_api_url.clone(),
                model(DEFAULT_OPENAI_MODEL),
                key.clone(),
            )?),
            None => without_credential(config, "openai", "OPENAI_API_KEY"),
        },
        SummarizationProvider::Retrieval => {
            let completion = match &config.google_api_key {
                Some(key) => Some(GeminiClient::new(
                    config.gemini_api_url.clone(),
                    model(DEFAULT_GEMINI_MODEL),
                    key.clone(),
                )?),
                None if config.summarization_fallback => {
                    tracing::warn!(
                        "GOOGLE_API_KEY not set; retrieved context will be summarized extractively"
                    );
                    None
                }
                None => {
                    return Ok(Box::new(UnavailableSummarizer {
                        backend: "retrieval",
                        credential: "GOOGLE_API_KEY",
                    }));
                }
            };
            Box::new(RetrievalSummarizer::new(
                embedding_client_from_config(config)?,
                completion,
                config.retrieval_top_k,
            ))
        }
    };

    tracing::info!(
        provider = ?provider,
        backend = summarizer.name(),
        "Summarizer initialized"
    );
    Ok(summarizer)
}

fn without_credential(
    config: &Config,
    backend: &'static str,
    credential: &'static str,
) -> Box<dyn Summarizer> {
    if config.summarization_fallback {
        tracing::warn!(
            backend,
            credential,
            "Credential not set; falling back to extractive summaries"
        );
        Box::new(ExtractiveSummarizer)
    } else {
        Box::new(UnavailableSummarizer {
            backend,
            credential,
        })
    }
}

/// Instruction used by direct backends; a caller question is appended as guidance.
fn direct_prompt(text: &str, question: Option<&str>) -> String {
    match question.map(str::trim).filter(|question| !question.is_empty()) {
        Some(question) => format!("{DIRECT_INSTRUCTION}\n\n{text}\n\nFocus on: {question}"),
        None => format!("{DIRECT_INSTRUCTION}\n\n{text}"),
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}
