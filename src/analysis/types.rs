//! Result and error types shared by the analysis service and its callers.

use crate::{
    classifier::ClassifierError, extraction::ExtractionError,
    summarization::SummarizationError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors emitted by the analysis pipelines.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A text request carried no text.
    #[error("No text provided")]
    EmptyInput,
    /// An uploaded document yielded no text to summarize.
    #[error("No text could be extracted from the document")]
    EmptyDocument,
    /// The upload could not be staged or parsed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// The emotion classifier failed.
    #[error(transparent)]
    Classification(#[from] ClassifierError),
    /// The summarization backend failed.
    #[error(transparent)]
    Summarization(#[from] SummarizationError),
}

/// Summary produced for an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryResult {
    /// Summary text returned by the backend.
    pub summary: String,
    /// Backend that produced the summary.
    pub backend: String,
    /// Question supplied by the caller, if any.
    pub question: Option<String>,
}

/// Readiness information reported by `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    /// Always `"healthy"` once the service is constructed.
    pub status: &'static str,
    /// Emotion model identifier.
    pub model: String,
    /// Active summarization backend.
    pub summarizer: String,
    /// Human-readable status line.
    pub message: String,
}
