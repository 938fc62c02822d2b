use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Classifier checkpoint used when `CLASSIFIER_MODEL` is not set.
pub const DEFAULT_CLASSIFIER_MODEL: &str = "sangkm/go-emotions-fine-tuned-distilroberta";
/// Sentence embedding model used by the retrieval summarizer by default.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-mpnet-base-v2";
/// Embedding model used when `EMBEDDING_PROVIDER=openai` and no model is set.
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
const DEFAULT_HUGGINGFACE_API_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Verdict backend.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP listening port.
    pub server_port: u16,
    /// Origins allowed to issue cross-origin requests; empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Maximum accepted request body size for uploads.
    pub max_upload_bytes: usize,
    /// Backend that produces emotion logits.
    pub classifier_provider: ClassifierProvider,
    /// Model identifier of the emotion classifier.
    pub classifier_model: String,
    /// Optional Hugging Face access token.
    pub huggingface_api_key: Option<String>,
    /// Base URL of the Hugging Face inference API.
    pub huggingface_api_url: String,
    /// Backend used by `POST /api/summarize_document`.
    pub summarization_provider: SummarizationProvider,
    /// Optional model override for the active summarization backend.
    pub summarization_model: Option<String>,
    /// Use the extractive summarizer when the backend credential is missing.
    pub summarization_fallback: bool,
    /// Google AI Studio key for Gemini.
    pub google_api_key: Option<String>,
    /// Base URL of the Gemini API.
    pub gemini_api_url: String,
    /// OpenAI API key.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI API.
    pub openai_api_url: String,
    /// Embedding backend used by the retrieval summarizer.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Number of chunks retrieved as summarization context.
    pub retrieval_top_k: usize,
}

/// Supported emotion classification backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierProvider {
    /// Hosted Hugging Face inference endpoint.
    HuggingFace,
    /// Offline keyword model.
    Lexicon,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Google Gemini `generateContent`.
    Gemini,
    /// Hugging Face summarization pipeline.
    HuggingFace,
    /// OpenAI chat completions.
    OpenAI,
    /// Chunk, embed, retrieve, then prompt Gemini.
    Retrieval,
    /// First-sentences heuristic; never leaves the process.
    Extractive,
}

/// Supported embedding backends for the retrieval summarizer.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Deterministic local hashing vectors.
    Hashing,
    /// Hugging Face feature-extraction pipeline.
    HuggingFace,
    /// Hosted OpenAI embeddings API.
    OpenAI,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let embedding_provider = parse_optional(&optional, "EMBEDDING_PROVIDER")?
            .unwrap_or(EmbeddingProvider::Hashing);

        Ok(Self {
            server_port: parse_optional(&optional, "PORT")?.unwrap_or(DEFAULT_PORT),
            cors_allowed_origins: optional("CORS_ALLOWED_ORIGINS")
                .map(|value| parse_origins(&value))
                .unwrap_or_default(),
            max_upload_bytes: parse_optional(&optional, "MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            classifier_provider: parse_optional(&optional, "CLASSIFIER_PROVIDER")?
                .unwrap_or(ClassifierProvider::HuggingFace),
            classifier_model: optional("CLASSIFIER_MODEL")
                .unwrap_or_else(|| DEFAULT_CLASSIFIER_MODEL.to_string()),
            huggingface_api_key: optional("HUGGINGFACE_API_KEY"),
            huggingface_api_url: optional("HUGGINGFACE_API_URL")
                .unwrap_or_else(|| DEFAULT_HUGGINGFACE_API_URL.to_string()),
            summarization_provider: parse_optional(&optional, "SUMMARIZATION_PROVIDER")?
                .unwrap_or(SummarizationProvider::Gemini),
            summarization_model: optional("SUMMARIZATION_MODEL"),
            summarization_fallback: optional("SUMMARIZATION_FALLBACK")
                .map(|value| parse_bool("SUMMARIZATION_FALLBACK", &value))
                .transpose()?
                .unwrap_or(true),
            google_api_key: optional("GOOGLE_API_KEY"),
            gemini_api_url: optional("GEMINI_API_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_api_url: optional("OPENAI_API_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string()),
            embedding_provider,
            embedding_model: optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| embedding_provider.default_model().to_string()),
            embedding_dimension: parse_optional(&optional, "EMBEDDING_DIMENSION")?
                .unwrap_or_else(|| embedding_provider.default_dimension()),
            retrieval_top_k: parse_optional(&optional, "RETRIEVAL_TOP_K")?.unwrap_or(5),
        })
    }
}

fn parse_optional<T, F>(optional: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    let origins: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(ToString::to_string)
        .collect();
    if origins.iter().any(|origin| origin == "*") {
        return Vec::new();
    }
    origins
}

impl std::str::FromStr for ClassifierProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "lexicon" => Ok(Self::Lexicon),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai" => Ok(Self::OpenAI),
            "retrieval" | "rag" => Ok(Self::Retrieval),
            "extractive" | "none" => Ok(Self::Extractive),
            _ => Err(()),
        }
    }
}

impl EmbeddingProvider {
    fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => DEFAULT_OPENAI_EMBEDDING_MODEL,
            Self::Hashing | Self::HuggingFace => DEFAULT_EMBEDDING_MODEL,
        }
    }

    fn default_dimension(self) -> usize {
        match self {
            Self::OpenAI => 1536,
            Self::Hashing | Self::HuggingFace => 768,
        }
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment (and `.env`) and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        server_port = config.server_port,
        classifier_provider = ?config.classifier_provider,
        classifier_model = %config.classifier_model,
        summarization_provider = ?config.summarization_provider,
        embedding_provider = ?config.embedding_provider,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
