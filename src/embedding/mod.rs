use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The configured provider requires a credential that is not set.
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
    /// The provider endpoint could not be reached.
    #[error("Embedding request failed: {0}")]
    RequestFailed(String),
    /// The provider answered with an error status.
    #[error("Embedding service error: {0}")]
    RemoteService(String),
    /// The provider response could not be decoded.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured through `EMBEDDING_DIMENSION`.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Deterministic offline embedding client that hashes bytes into vector slots.
pub struct HashingEmbeddingClient {
    dimension: usize,
}

impl HashingEmbeddingClient {
    /// Construct a client producing vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        Ok(texts
            .iter()
            .map(|text| Self::encode(text, self.dimension))
            .collect())
    }
}

/// Sentence embeddings from the Hugging Face feature-extraction pipeline.
pub struct HuggingFaceEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

impl HuggingFaceEmbeddingClient {
    /// Build a client for `model` hosted under `base_url`.
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        dimension: usize,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder().user_agent("verdict/embedding").build()?;
        Ok(Self {
            http,
            base_url,
            model,
            api_key,
            dimension,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/pipeline/feature-extraction/{}",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl EmbeddingClient for HuggingFaceEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }
        let expected = texts.len();
        tracing::debug!(model = %self.model, inputs = expected, "Requesting embeddings");

        let payload = json!({
            "inputs": texts,
            "options": { "wait_for_model": true }
        });
        let mut request = self.http.post(self.endpoint()).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|error| {
            EmbeddingClientError::RequestFailed(format!(
                "failed to reach {}: {error}",
                self.endpoint()
            ))
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::RemoteService(format!(
                "{} returned {status}: {body}",
                self.model
            )));
        }

        let vectors: Vec<Vec<f32>> = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!("failed to decode vectors: {error}"))
        })?;
        validate_vectors(vectors, expected, self.dimension)
    }
}

/// Hosted OpenAI embeddings.
pub struct OpenAiEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    /// Build a client for `model` under `base_url`.
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        dimension: usize,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder().user_agent("verdict/embedding").build()?;
        Ok(Self {
            http,
            base_url,
            model,
            api_key,
            dimension,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }
        let expected = texts.len();

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::RequestFailed(format!(
                    "failed to reach {}: {error}",
                    self.endpoint()
                ))
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::RemoteService(format!(
                "OpenAI returned {status}: {body}"
            )));
        }

        let mut body: OpenAiEmbeddingResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!("failed to decode embeddings: {error}"))
        })?;
        body.data.sort_by_key(|entry| entry.index);
        let vectors = body.data.into_iter().map(|entry| entry.embedding).collect();
        validate_vectors(vectors, expected, self.dimension)
    }
}

fn validate_vectors(
    vectors: Vec<Vec<f32>>,
    expected_count: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingClientError::InvalidResponse(format!(
            "expected {expected_count} vectors, got {}",
            vectors.len()
        )));
    }
    if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimension) {
        return Err(EmbeddingClientError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    Ok(vectors)
}

/// Build an embedding client suitable for the given configuration.
pub fn embedding_client_from_config(
    config: &Config,
) -> Result<Box<dyn EmbeddingClient>, EmbeddingClientError> {
    tracing::debug!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        dimension = config.embedding_dimension,
        "Building embedding client"
    );
    let client: Box<dyn EmbeddingClient> = match config.embedding_provider {
        EmbeddingProvider::Hashing => {
            Box::new(HashingEmbeddingClient::new(config.embedding_dimension))
        }
        EmbeddingProvider::HuggingFace => Box::new(HuggingFaceEmbeddingClient::new(
            config.huggingface_api_url.clone(),
            config.embedding_model.clone(),
            config.huggingface_api_key.clone(),
            config.embedding_dimension,
        )?),
        EmbeddingProvider::OpenAI => {
            let key = config
                .openai_api_key
                .clone()
                .ok_or(EmbeddingClientError::MissingCredential("OPENAI_API_KEY"))?;
            Box::new(OpenAiEmbeddingClient::new(
                config.openai_api_url.clone(),
                config.embedding_model.clone(),
                key,
                config.embedding_dimension,
            )?)
        }
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn hashing_vectors_are_normalized_and_deterministic() {
        let client = HashingEmbeddingClient::new(16);
        let first = client
            .generate_embeddings(vec!["hello world".into(), String::new()])
            .await
            .expect("embeddings");
        let second = client
            .generate_embeddings(vec!["hello world".into()])
            .await
            .expect("embeddings");

        assert_eq!(first[0], second[0]);
        let norm: f32 = first[0].iter().map(|value| value * value).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(first[1].iter().all(|value| *value == 0.0));
    }

    #[tokio::test]
    async fn hashing_rejects_empty_batches_and_zero_dimension() {
        let error = HashingEmbeddingClient::new(8)
            .generate_embeddings(Vec::new())
            .await
            .expect_err("empty batch");
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));

        let error = HashingEmbeddingClient::new(0)
            .generate_embeddings(vec!["text".into()])
            .await
            .expect_err("zero dimension");
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn huggingface_client_returns_vectors() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/pipeline/feature-extraction/sentence-transformers/all-mpnet-base-v2")
                    .json_body_partial(r#"{"inputs":["a","b"]}"#);
                then.status(200)
                    .json_body(json!([[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]));
            })
            .await;

        let client = HuggingFaceEmbeddingClient::new(
            server.base_url(),
            "sentence-transformers/all-mpnet-base-v2".into(),
            None,
            3,
        )
        .expect("client");
        let vectors = client
            .generate_embeddings(vec!["a".into(), "b".into()])
            .await
            .expect("vectors");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]]);
    }

    #[tokio::test]
    async fn huggingface_dimension_mismatch_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!([[0.1, 0.2]]));
            })
            .await;

        let client = HuggingFaceEmbeddingClient::new(server.base_url(), "m".into(), None, 3)
            .expect("client");
        let error = client
            .generate_embeddings(vec!["a".into()])
            .await
            .expect_err("mismatch");
        assert!(matches!(
            error,
            EmbeddingClientError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn openai_client_orders_by_index() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/embeddings")
                    .header("authorization", "Bearer sk-test");
                then.status(200).json_body(json!({
                    "data": [
                        { "index": 1, "embedding": [0.0, 1.0] },
                        { "index": 0, "embedding": [1.0, 0.0] }
                    ]
                }));
            })
            .await;

        let client = OpenAiEmbeddingClient::new(
            server.base_url(),
            "text-embedding-3-small".into(),
            "sk-test".into(),
            2,
        )
        .expect("client");
        let vectors = client
            .generate_embeddings(vec!["first".into(), "second".into()])
            .await
            .expect("vectors");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn empty_provider_output_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let client = OpenAiEmbeddingClient::new(server.base_url(), "m".into(), "k".into(), 2)
            .expect("client");
        let error = client
            .generate_embeddings(vec!["a".into()])
            .await
            .expect_err("empty");
        assert!(matches!(error, EmbeddingClientError::InvalidResponse(_)));
    }

    #[test]
    fn openai_provider_requires_a_key() {
        let config = Config::from_lookup(|key| match key {
            "EMBEDDING_PROVIDER" => Some("openai".into()),
            _ => None,
        })
        .expect("config");
        let error = embedding_client_from_config(&config)
            .err()
            .expect("missing key");
        assert!(matches!(
            error,
            EmbeddingClientError::MissingCredential("OPENAI_API_KEY")
        ));
    }
}
