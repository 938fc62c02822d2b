//! Analysis service coordinating extraction, classification, ranking and summarization.

use crate::{
    analysis::types::{AnalysisError, HealthSnapshot, SummaryResult},
    classifier::EmotionClassifier,
    config::Config,
    extraction::{DocumentUpload, ExtractedDocument, extract_upload},
    metrics::{MetricsSnapshot, ServiceMetrics},
    ranking::{RankedResult, rank},
    summarization::{Summarizer, summarizer_from_config},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Owns the classifier, the summarization backend and request metrics.
///
/// Build it once at startup and share it through an `Arc`; every handle it holds is read-only
/// after construction and the metrics are atomics.
pub struct AnalysisService {
    classifier: EmotionClassifier,
    summarizer: Box<dyn Summarizer>,
    metrics: Arc<ServiceMetrics>,
}

/// Abstraction over the analysis pipelines used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Classify free text and rank the resulting distribution.
    async fn analyze_text(&self, text: &str) -> Result<RankedResult, AnalysisError>;

    /// Extract an uploaded document and classify its text.
    async fn analyze_document(&self, upload: DocumentUpload)
    -> Result<RankedResult, AnalysisError>;

    /// Extract an uploaded document and summarize it.
    async fn summarize_document(
        &self,
        upload: DocumentUpload,
        question: Option<String>,
    ) -> Result<SummaryResult, AnalysisError>;

    /// Describe the loaded models.
    fn health(&self) -> HealthSnapshot;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl AnalysisService {
    /// Assemble a service from already-built parts.
    pub fn new(classifier: EmotionClassifier, summarizer: Box<dyn Summarizer>) -> Self {
        Self {
            classifier,
            summarizer,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }

    /// Build the classifier and summarizer selected by configuration.
    pub fn from_config(config: &Config) -> Result<Self, AnalysisError> {
        tracing::info!("Initializing emotion classifier");
        let classifier = EmotionClassifier::from_config(config)?;
        tracing::info!("Initializing summarizer");
        let summarizer = summarizer_from_config(config)?;
        Ok(Self::new(classifier, summarizer))
    }

    /// Classify free text. Blank text is rejected.
    pub async fn analyze_text(&self, text: &str) -> Result<RankedResult, AnalysisError> {
        let result = self.classify_ranked(text).await;
        match &result {
            Ok(ranked) => {
                self.metrics.record_text();
                tracing::info!(
                    chars = text.chars().count(),
                    primary = %ranked.primary,
                    score = ranked.primary_score,
                    "Text analyzed"
                );
            }
            Err(error) => self.record_failure("analyze_text", error),
        }
        result
    }

    async fn classify_ranked(&self, text: &str) -> Result<RankedResult, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        let distribution = self.classifier.classify(text).await?;
        Ok(rank(&distribution))
    }

    /// Extract and classify an uploaded document.
    ///
    /// Documents without text (including unrecognized formats) classify as Neutral.
    pub async fn analyze_document(
        &self,
        upload: DocumentUpload,
    ) -> Result<RankedResult, AnalysisError> {
        let file_name = upload.file_name.clone();
        let result = async {
            let document = extract(upload).await?;
            let distribution = self.classifier.classify(&document.text).await?;
            Ok::<_, AnalysisError>((document, rank(&distribution)))
        }
        .await;

        match result {
            Ok((document, ranked)) => {
                self.metrics.record_document();
                tracing::info!(
                    file_name = %file_name,
                    format = %document.format,
                    chars = document.text.chars().count(),
                    primary = %ranked.primary,
                    score = ranked.primary_score,
                    "Document analyzed"
                );
                Ok(ranked)
            }
            Err(error) => {
                self.record_failure("analyze_document", &error);
                Err(error)
            }
        }
    }

    /// Extract and summarize an uploaded document.
    pub async fn summarize_document(
        &self,
        upload: DocumentUpload,
        question: Option<String>,
    ) -> Result<SummaryResult, AnalysisError> {
        let file_name = upload.file_name.clone();
        let question = question
            .map(|question| question.trim().to_string())
            .filter(|question| !question.is_empty());

        let result = async {
            let document = extract(upload).await?;
            if document.is_blank() {
                return Err(AnalysisError::EmptyDocument);
            }
            let summary = self
                .summarizer
                .summarize(&document.text, question.as_deref())
                .await?;
            Ok::<_, AnalysisError>(summary)
        }
        .await;

        match result {
            Ok(summary) => {
                self.metrics.record_summary();
                tracing::info!(
                    file_name = %file_name,
                    backend = self.summarizer.name(),
                    summary_chars = summary.chars().count(),
                    "Document summarized"
                );
                Ok(SummaryResult {
                    summary,
                    backend: self.summarizer.name().to_string(),
                    question,
                })
            }
            Err(error) => {
                self.record_failure("summarize_document", &error);
                Err(error)
            }
        }
    }

    /// Describe the loaded classifier and summarizer.
    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "healthy",
            model: self.classifier.model_name().to_string(),
            summarizer: self.summarizer.name().to_string(),
            message: "Verdict AI Backend is running".to_string(),
        }
    }

    /// Return the current request metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn record_failure(&self, operation: &'static str, error: &AnalysisError) {
        self.metrics.record_failure();
        tracing::warn!(operation, error = %error, "Analysis request failed");
    }
}

async fn extract(upload: DocumentUpload) -> Result<ExtractedDocument, AnalysisError> {
    tracing::debug!(
        file_name = %upload.file_name,
        bytes = upload.bytes.len(),
        "Extracting upload"
    );
    Ok(extract_upload(upload).await?)
}

#[async_trait]
impl AnalysisApi for AnalysisService {
    async fn analyze_text(&self, text: &str) -> Result<RankedResult, AnalysisError> {
        AnalysisService::analyze_text(self, text).await
    }

    async fn analyze_document(
        &self,
        upload: DocumentUpload,
    ) -> Result<RankedResult, AnalysisError> {
        AnalysisService::analyze_document(self, upload).await
    }

    async fn summarize_document(
        &self,
        upload: DocumentUpload,
        question: Option<String>,
    ) -> Result<SummaryResult, AnalysisError> {
        AnalysisService::summarize_document(self, upload, question).await
    }

    fn health(&self) -> HealthSnapshot {
        AnalysisService::health(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        AnalysisService::metrics_snapshot(self)
    }
}
