//! OpenAI chat-completions summarizer.

use super::{SummarizationError, Summarizer, direct_prompt, truncate_chars};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

/// Model used when `SUMMARIZATION_MODEL` is unset.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
/// Characters of document text sent in a request.
pub const OPENAI_CHAR_BUDGET: usize = 12_000;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that writes clear, well-structured summaries of documents.";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1_024;

/// Direct summarizer posting to `/v1/chat/completions`.
pub struct OpenAiSummarizer {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiSummarizer {
    /// Build a summarizer for `model` under `base_url`.
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
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        })
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(
        &self,
        text: &str,
        question: Option<&str>,
    ) -> Result<String, SummarizationError> {
        let prompt = direct_prompt(truncate_chars(text, OPENAI_CHAR_BUDGET), question);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&prompt))
            .send()
            .await
            .map_err(|error| {
                SummarizationError::RequestFailed(format!("failed to reach OpenAI: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationError::RemoteService(format!(
                "OpenAI returned {status}: {}",
                truncate_chars(&body, 200)
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|error| {
            SummarizationError::InvalidResponse(format!(
                "failed to decode OpenAI response: {error}"
            ))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                SummarizationError::InvalidResponse("OpenAI response contained no message".into())
            })
    }

    fn name(&self) -> &str {
        "openai"
    }
}
