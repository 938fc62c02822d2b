//! Hugging Face summarization pipeline (BART by default).

use super::{SummarizationError, Summarizer, truncate_chars};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Model used when `SUMMARIZATION_MODEL` is unset.
pub const DEFAULT_HUGGINGFACE_MODEL: &str = "facebook/bart-large-cnn";
/// Characters of document text sent in a request.
pub const HUGGINGFACE_CHAR_BUDGET: usize = 5_000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_LENGTH: u32 = 150;
const MIN_LENGTH: u32 = 30;

/// Summarizer calling `{base}/models/{model}` with the document as `inputs`.
pub struct HuggingFaceSummarizer {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SummaryEntry {
    summary_text: String,
}

impl HuggingFaceSummarizer {
    /// Build a summarizer for `model`; requests time out after 60 seconds.
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
    ) -> Result<Self, SummarizationError> {
        let http = Client::builder()
            .user_agent("verdict/summary")
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            model,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url.trim_end_matches('/'), self.model)
    }
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    async fn summarize(
        &self,
        text: &str,
        _question: Option<&str>,
    ) -> Result<String, SummarizationError> {
        let payload = json!({
            "inputs": truncate_chars(text, HUGGINGFACE_CHAR_BUDGET),
            "parameters": {
                "max_length": MAX_LENGTH,
                "min_length": MIN_LENGTH,
                "do_sample": false,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationError::RequestFailed(format!(
                    "failed to reach {}: {error}",
                    self.endpoint()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::SERVICE_UNAVAILABLE || body.contains("loading") {
                return Err(SummarizationError::ModelWarmingUp(body));
            }
            return Err(SummarizationError::RemoteService(format!(
                "{} returned {status}: {}",
                self.model,
                truncate_chars(&body, 200)
            )));
        }

        let entries: Vec<SummaryEntry> = response.json().await.map_err(|error| {
            SummarizationError::InvalidResponse(format!("failed to decode summary: {error}"))
        })?;

        entries
            .into_iter()
            .next()
            .map(|entry| entry.summary_text.trim().to_string())
            .ok_or_else(|| SummarizationError::InvalidResponse("empty summary list".into()))
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}
