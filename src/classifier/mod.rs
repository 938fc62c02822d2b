//! Emotion classification over the fixed 28-label GoEmotions schema.
//!
//! The classifier owns a logits backend ([`EmotionModel`]) and a byte-level BPE truncator. A
//! request flows through three steps:
//!
//! 1. Blank input short-circuits to Neutral at 100% without touching the model.
//! 2. The text is cut to the longest prefix that fits the model's 512-token window.
//! 3. The backend returns 28 logits which are softmaxed into percentages rounded to 2 decimals.
//!
//! Both the backend and the tokenizer are built once at startup and shared read-only.

mod huggingface;
mod lexicon;
mod truncate;

use crate::config::{ClassifierProvider, Config};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use huggingface::HuggingFaceEmotionModel;
pub use lexicon::LexiconEmotionModel;
pub use truncate::TokenTruncator;

/// Maximum sequence length of the classification model, special tokens included.
pub const MAX_MODEL_TOKENS: usize = 512;

/// Errors surfaced by the emotion classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The BPE vocabulary could not be loaded.
    #[error("Failed to load tokenizer: {source}")]
    Tokenizer {
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: anyhow::Error,
    },
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The model endpoint could not be reached.
    #[error("Classification request failed: {0}")]
    RequestFailed(String),
    /// The model endpoint answered with an error status.
    #[error("Classification service error: {0}")]
    RemoteService(String),
    /// The model endpoint answered with something other than 28 labelled scores.
    #[error("Malformed classification response: {0}")]
    InvalidResponse(String),
    /// The hosted model is still loading.
    #[error("Classification model is warming up: {0}")]
    ModelWarmingUp(String),
    /// The blocking tokenization task was cancelled or panicked.
    #[error("Tokenization task failed: {0}")]
    Task(String),
}

/// The 28 GoEmotions labels in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(missing_docs)]
pub enum Emotion {
    Admiration,
    Amusement,
    Anger,
    Annoyance,
    Approval,
    Caring,
    Confusion,
    Curiosity,
    Desire,
    Disappointment,
    Disapproval,
    Disgust,
    Embarrassment,
    Excitement,
    Fear,
    Gratitude,
    Grief,
    Joy,
    Love,
    Nervousness,
    Optimism,
    Pride,
    Realization,
    Relief,
    Remorse,
    Sadness,
    Surprise,
    Neutral,
}

impl Emotion {
    /// Every label, in the fixed schema order.
    pub const ALL: [Emotion; 28] = [
        Emotion::Admiration,
        Emotion::Amusement,
        Emotion::Anger,
        Emotion::Annoyance,
        Emotion::Approval,
        Emotion::Caring,
        Emotion::Confusion,
        Emotion::Curiosity,
        Emotion::Desire,
        Emotion::Disappointment,
        Emotion::Disapproval,
        Emotion::Disgust,
        Emotion::Embarrassment,
        Emotion::Excitement,
        Emotion::Fear,
        Emotion::Gratitude,
        Emotion::Grief,
        Emotion::Joy,
        Emotion::Love,
        Emotion::Nervousness,
        Emotion::Optimism,
        Emotion::Pride,
        Emotion::Realization,
        Emotion::Relief,
        Emotion::Remorse,
        Emotion::Sadness,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    /// Number of labels in the schema.
    pub const COUNT: usize = Self::ALL.len();

    /// Display label, e.g. `"Gratitude"`.
    pub fn label(self) -> &'static str {
        match self {
            Emotion::Admiration => "Admiration",
            Emotion::Amusement => "Amusement",
            Emotion::Anger => "Anger",
            Emotion::Annoyance => "Annoyance",
            Emotion::Approval => "Approval",
            Emotion::Caring => "Caring",
            Emotion::Confusion => "Confusion",
            Emotion::Curiosity => "Curiosity",
            Emotion::Desire => "Desire",
            Emotion::Disappointment => "Disappointment",
            Emotion::Disapproval => "Disapproval",
            Emotion::Disgust => "Disgust",
            Emotion::Embarrassment => "Embarrassment",
            Emotion::Excitement => "Excitement",
            Emotion::Fear => "Fear",
            Emotion::Gratitude => "Gratitude",
            Emotion::Grief => "Grief",
            Emotion::Joy => "Joy",
            Emotion::Love => "Love",
            Emotion::Nervousness => "Nervousness",
            Emotion::Optimism => "Optimism",
            Emotion::Pride => "Pride",
            Emotion::Realization => "Realization",
            Emotion::Relief => "Relief",
            Emotion::Remorse => "Remorse",
            Emotion::Sadness => "Sadness",
            Emotion::Surprise => "Surprise",
            Emotion::Neutral => "Neutral",
        }
    }

    /// Position in the schema order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolve a label emitted by a model: a name in any case, or a `LABEL_<n>` id.
    pub fn from_model_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        if let Some(id) = trimmed.strip_prefix("LABEL_") {
            return id.parse::<usize>().ok().and_then(|index| Self::ALL.get(index).copied());
        }
        Self::ALL
            .iter()
            .copied()
            .find(|emotion| emotion.label().eq_ignore_ascii_case(trimmed))
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single label with its share of the distribution, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmotionScore {
    /// Emotion label.
    pub emotion: Emotion,
    /// Percentage in `[0, 100]`, rounded to two decimals.
    pub percentage: f64,
}

/// Percentages for all 28 labels, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionDistribution {
    scores: Vec<EmotionScore>,
}

impl EmotionDistribution {
    /// Convert raw logits (schema order) into a rounded percentage distribution.
    pub fn from_logits(logits: &[f32]) -> Result<Self, ClassifierError> {
        if logits.len() != Emotion::COUNT {
            return Err(ClassifierError::InvalidResponse(format!(
                "expected {} logits, got {}",
                Emotion::COUNT,
                logits.len()
            )));
        }
        if logits.iter().any(|value| !value.is_finite()) {
            return Err(ClassifierError::InvalidResponse(
                "logits contain non-finite values".into(),
            ));
        }

        let scores = softmax(logits)
            .into_iter()
            .zip(Emotion::ALL)
            .map(|(probability, emotion)| EmotionScore {
                emotion,
                percentage: round_percentage(probability * 100.0),
            })
            .collect();
        Ok(Self { scores })
    }

    /// Distribution assigned to blank input: Neutral at 100%, everything else at 0%.
    pub fn neutral() -> Self {
        let scores = Emotion::ALL
            .into_iter()
            .map(|emotion| EmotionScore {
                emotion,
                percentage: if emotion == Emotion::Neutral { 100.0 } else { 0.0 },
            })
            .collect();
        Self { scores }
    }

    /// Scores in schema order.
    pub fn scores(&self) -> &[EmotionScore] {
        &self.scores
    }

    /// Percentage assigned to a single label.
    pub fn percentage(&self, emotion: Emotion) -> f64 {
        self.scores[emotion.index()].percentage
    }

    /// Sum of all percentages; ~100 up to rounding.
    pub fn total(&self) -> f64 {
        self.scores.iter().map(|score| score.percentage).sum()
    }
}

fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits
        .iter()
        .map(|value| (*value as f64 - max).exp())
        .collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|value| value / sum).collect()
}

fn round_percentage(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Backend that turns (already truncated) text into 28 logits in schema order.
#[async_trait]
pub trait EmotionModel: Send + Sync {
    /// Produce one logit per label, in [`Emotion::ALL`] order.
    async fn logits(&self, text: &str) -> Result<Vec<f32>, ClassifierError>;

    /// Identifier reported by the health endpoint.
    fn name(&self) -> &str;
}

/// Emotion classifier combining a logits backend with input truncation.
pub struct EmotionClassifier {
    model: Box<dyn EmotionModel>,
    truncator: TokenTruncator,
}

impl EmotionClassifier {
    /// Assemble a classifier from its parts.
    pub fn new(model: Box<dyn EmotionModel>, truncator: TokenTruncator) -> Self {
        Self { model, truncator }
    }

    /// Build the classifier selected by `CLASSIFIER_PROVIDER`.
    pub fn from_config(config: &Config) -> Result<Self, ClassifierError> {
        let model: Box<dyn EmotionModel> = match config.classifier_provider {
            ClassifierProvider::HuggingFace => Box::new(HuggingFaceEmotionModel::new(
                config.huggingface_api_url.clone(),
                config.classifier_model.clone(),
                config.huggingface_api_key.clone(),
            )?),
            ClassifierProvider::Lexicon => Box::new(LexiconEmotionModel::new()),
        };
        tracing::info!(
            provider = ?config.classifier_provider,
            model = model.name(),
            "Emotion classifier initialized"
        );
        Ok(Self::new(model, TokenTruncator::for_model(MAX_MODEL_TOKENS)?))
    }

    /// Name of the underlying model.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Classify text into a full emotion distribution.
    pub async fn classify(&self, text: &str) -> Result<EmotionDistribution, ClassifierError> {
        if text.trim().is_empty() {
            tracing::debug!("Blank input; returning neutral distribution");
            return Ok(EmotionDistribution::neutral());
        }

        let truncated = self.truncator.truncate_blocking(text).await?;
        if truncated.len() < text.len() {
            tracing::debug!(
                original_bytes = text.len(),
                kept_bytes = truncated.len(),
                "Truncated input to model window"
            );
        }

        let logits = self.model.logits(&truncated).await?;
        EmotionDistribution::from_logits(&logits)
    }
}
