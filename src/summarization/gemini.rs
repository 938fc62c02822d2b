//! Google Gemini `generateContent` client and the direct Gemini summarizer.

use super::{SummarizationError, Summarizer, direct_prompt, truncate_chars};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

/// Model used when `SUMMARIZATION_MODEL` is unset.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Characters of document text sent in a direct request.
pub const GEMINI_CHAR_BUDGET: usize = 5_000;

const TEMPERATURE: f32 = 0.3;
const MAX_OUTPUT_TOKENS: u32 = 1_024;

/// Thin wrapper around `v1beta/models/{model}:generateContent`.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

impl GeminiClient {
    /// Build a client for `model` under `base_url`, authenticated with `api_key`.
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
    ) -> Result<Self, SummarizationError> {
        let http = Client::builder().user_agent("verdict/summary").build()?;
        Ok(Self {
            http,
            base_url,
            model,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(prompt: &str) -> Value {
        json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            }
        })
    }

    /// Run one completion and return the concatenated text parts of the first candidate.
    pub async fn generate(&self, prompt: &str) -> Result<String, SummarizationError> {
        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "Gemini request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(prompt))
            .send()
            .await
            .map_err(|error| {
                SummarizationError::RequestFailed(format!("failed to reach Gemini: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationError::RemoteService(format!(
                "Gemini returned {status}: {}",
                truncate_chars(&body, 200)
            )));
        }

        let body: GeminiResponse = response.json().await.map_err(|error| {
            SummarizationError::InvalidResponse(format!(
                "failed to decode Gemini response: {error}"
            ))
        })?;

        extract_text(body)
    }
}

fn extract_text(response: GeminiResponse) -> Result<String, SummarizationError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SummarizationError::InvalidResponse(
            "Gemini response contained no text".into(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Sends the first [`GEMINI_CHAR_BUDGET`] characters of the document in one prompt.
pub struct GeminiSummarizer {
    client: GeminiClient,
}

impl GeminiSummarizer {
    /// Wrap a configured client.
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(
        &self,
        text: &str,
        question: Option<&str>,
    ) -> Result<String, SummarizationError> {
        let prompt = direct_prompt(truncate_chars(text, GEMINI_CHAR_BUDGET), question);
        self.client.generate(&prompt).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
