//! Hugging Face inference endpoint returning raw logits for the emotion checkpoint.

use super::{ClassifierError, Emotion, EmotionModel};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Classifier backed by the hosted text-classification pipeline.
///
/// Requests `function_to_apply: "none"` so the endpoint returns logits rather than
/// probabilities; the softmax is applied locally.
pub struct HuggingFaceEmotionModel {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl ClassificationResponse {
    fn into_scores(self) -> Vec<LabelScore> {
        match self {
            Self::Nested(mut batches) => {
                if batches.is_empty() {
                    Vec::new()
                } else {
                    batches.swap_remove(0)
                }
            }
            Self::Flat(scores) => scores,
        }
    }
}

impl HuggingFaceEmotionModel {
    /// Build a client for `model` hosted under `base_url`.
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
    ) -> Result<Self, ClassifierError> {
        let http = Client::builder().user_agent("verdict/classifier").build()?;
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
impl EmotionModel for HuggingFaceEmotionModel {
    async fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        let payload = json!({
            "inputs": text,
            "parameters": {
                "function_to_apply": "none",
                "top_k": Emotion::COUNT,
            }
        });

        let mut request = self.http.post(self.endpoint()).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|error| {
            ClassifierError::RequestFailed(format!(
                "failed to reach {}: {error}",
                self.endpoint()
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::SERVICE_UNAVAILABLE || body.contains("loading") {
                return Err(ClassifierError::ModelWarmingUp(body));
            }
            return Err(ClassifierError::RemoteService(format!(
                "{} returned {status}: {body}",
                self.model
            )));
        }

        let body: ClassificationResponse = response.json().await.map_err(|error| {
            ClassifierError::InvalidResponse(format!("failed to decode response: {error}"))
        })?;

        order_logits(body.into_scores())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Place labelled scores into schema order, requiring every label exactly once.
fn order_logits(scores: Vec<LabelScore>) -> Result<Vec<f32>, ClassifierError> {
    let mut logits: Vec<Option<f32>> = vec![None; Emotion::COUNT];
    for LabelScore { label, score } in scores {
        let emotion = Emotion::from_model_label(&label).ok_or_else(|| {
            ClassifierError::InvalidResponse(format!("unknown label '{label}'"))
        })?;
        if logits[emotion.index()].replace(score).is_some() {
            return Err(ClassifierError::InvalidResponse(format!(
                "duplicate label '{label}'"
            )));
        }
    }

    logits
        .into_iter()
        .zip(Emotion::ALL)
        .map(|(value, emotion)| {
            value.ok_or_else(|| {
                ClassifierError::InvalidResponse(format!("missing label '{emotion}'"))
            })
        })
        .collect()
}
