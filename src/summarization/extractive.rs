use super::{SummarizationError, Summarizer};
use async_trait::async_trait;

const SENTENCE_SEPARATOR: &str = ". ";
const SUMMARY_SENTENCES: usize = 3;

/// First three `". "`-separated sentences followed by `"..."`; shorter texts are returned as-is.
pub fn extractive_summary(text: &str) -> String {
    let sentences: Vec<&str> = text.split(SENTENCE_SEPARATOR).collect();
    if sentences.len() <= SUMMARY_SENTENCES {
        return text.to_string();
    }
    format!(
        "{}...",
        sentences[..SUMMARY_SENTENCES].join(SENTENCE_SEPARATOR)
    )
}

/// Offline summarizer used directly or when a remote backend lacks its credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveSummarizer;

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(
        &self,
        text: &str,
        _question: Option<&str>,
    ) -> Result<String, SummarizationError> {
        Ok(extractive_summary(text))
    }

    fn name(&self) -> &str {
        "extractive"
    }
}
