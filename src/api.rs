//! HTTP surface for the Verdict backend.
//!
//! - `GET /` – liveness banner.
//! - `GET /api/health` – classifier model and summarization backend in use.
//! - `POST /api/analyze_sms` – classify `{ "text": ... }` into the ranked emotion list.
//! - `POST /api/analyze_document` – classify the text of a multipart `file` upload.
//! - `POST /api/summarize_document` – summarize a multipart `file`, optionally steered by a
//!   `question` form field.
//! - `GET /api/metrics` – request counters.
//!
//! Failures are never reported with a 200: every error is `{ "error": ..., "status": "error" }`
//! with a status code derived from the failing stage.

use crate::analysis::{AnalysisApi, AnalysisError, HealthSnapshot};
use crate::classifier::ClassifierError;
use crate::config::Config;
use crate::embedding::EmbeddingClientError;
use crate::extraction::{DocumentUpload, ExtractionError};
use crate::metrics::MetricsSnapshot;
use crate::ranking::RankedResult;
use crate::summarization::SummarizationError;
use axum::{
    Json, Router,
    body::Body,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

/// Build the HTTP router exposing the analysis API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AnalysisApi + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health::<S>))
        .route("/api/analyze_sms", post(analyze_sms::<S>))
        .route("/api/analyze_document", post(analyze_document::<S>))
        .route("/api/summarize_document", post(summarize_document::<S>))
        .route("/api/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Wrap a router with the upload limit, CORS policy and request tracing.
pub fn apply_layers(router: Router, config: &Config) -> Router {
    router
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %Uuid::new_v4(),
                )
            }),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(origin, error = %error, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Response body for `GET /`.
#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    status: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Verdict AI Backend is running",
        status: "ok",
    })
}

async fn health<S>(State(service): State<Arc<S>>) -> Json<HealthSnapshot>
where
    S: AnalysisApi,
{
    Json(service.health())
}

/// Request body for `POST /api/analyze_sms`.
#[derive(Deserialize)]
struct TextRequest {
    #[serde(default)]
    text: Option<String>,
}

/// Emotion analysis payload shared by the text and document endpoints.
#[derive(Debug, Serialize)]
struct AnalysisResponse {
    #[serde(rename = "Predicted_Sentiment")]
    predicted_sentiment: String,
    /// Percentage of the predicted label.
    cd: f64,
    emotions: Vec<EmotionProbability>,
}

#[derive(Debug, Serialize)]
struct EmotionProbability {
    emotion: String,
    prob: f64,
}

impl From<RankedResult> for AnalysisResponse {
    fn from(ranked: RankedResult) -> Self {
        Self {
            predicted_sentiment: ranked.primary.label().to_string(),
            cd: ranked.primary_score,
            emotions: ranked
                .filtered
                .into_iter()
                .map(|score| EmotionProbability {
                    emotion: score.emotion.label().to_string(),
                    prob: score.percentage,
                })
                .collect(),
        }
    }
}

async fn analyze_sms<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, AppError>
where
    S: AnalysisApi,
{
    let text = match payload {
        Ok(Json(TextRequest { text: Some(text) })) if !text.trim().is_empty() => text,
        Ok(_) => return Err(AppError::bad_request("No text provided")),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(AppError::Request {
                status: rejection.status(),
                message: rejection.body_text(),
            });
        }
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected analyze_sms body");
            return Err(AppError::bad_request("No text provided"));
        }
    };

    let ranked = service.analyze_text(&text).await?;
    Ok(Json(ranked.into()))
}

async fn analyze_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, AppError>
where
    S: AnalysisApi,
{
    let form = read_upload_form(multipart).await?;
    let ranked = service.analyze_document(form.upload).await?;
    Ok(Json(ranked.into()))
}

/// Response body for `POST /api/summarize_document`.
#[derive(Debug, Serialize)]
struct SummaryResponse {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<String>,
    status: &'static str,
}

async fn summarize_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: AnalysisApi,
{
    let form = read_upload_form(multipart).await?;
    let result = service
        .summarize_document(form.upload, form.question)
        .await?;
    Ok(Json(SummaryResponse {
        summary: result.summary,
        question: result.question,
        status: "success",
    }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: AnalysisApi,
{
    Json(service.metrics_snapshot())
}

/// Fields accepted by the document endpoints.
struct UploadForm {
    upload: DocumentUpload,
    question: Option<String>,
}

async fn read_upload_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadForm, AppError> {
    let mut multipart = multipart.map_err(|rejection| AppError::Request {
        status: StatusCode::BAD_REQUEST,
        message: rejection.body_text(),
    })?;

    let mut upload = None;
    let mut question = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some(DocumentUpload::new(file_name, bytes.to_vec()));
            }
            Some("question") => {
                question = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| AppError::bad_request("No file provided"))?;
    if upload.file_name.trim().is_empty() {
        return Err(AppError::bad_request("No file selected"));
    }
    tracing::debug!(
        file_name = %upload.file_name,
        bytes = upload.bytes.len(),
        has_question = question.is_some(),
        "Received upload"
    );
    Ok(UploadForm { upload, question })
}

fn multipart_error(error: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Request {
        status: error.status(),
        message: error.body_text(),
    }
}

/// Error returned by handlers; always rendered as `{ "error", "status": "error" }`.
enum AppError {
    Request { status: StatusCode, message: String },
    Analysis(AnalysisError),
}

impl AppError {
    fn bad_request(message: &str) -> Self {
        Self::Request {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Request { status, message } => (status, message),
            Self::Analysis(error) => (status_for(&error), error.to_string()),
        };
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        }
        (status, Json(json!({ "error": message, "status": "error" }))).into_response()
    }
}

impl From<AnalysisError> for AppError {
    fn from(inner: AnalysisError) -> Self {
        Self::Analysis(inner)
    }
}

fn status_for(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::EmptyInput => StatusCode::BAD_REQUEST,
        AnalysisError::EmptyDocument => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Extraction(error) => match error {
            ExtractionError::Decode(_) | ExtractionError::Parse { .. } => StatusCode::BAD_REQUEST,
            ExtractionError::Io(_) | ExtractionError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        AnalysisError::Classification(error) => match error {
            ClassifierError::ModelWarmingUp(_) => StatusCode::SERVICE_UNAVAILABLE,
            ClassifierError::RequestFailed(_)
            | ClassifierError::RemoteService(_)
            | ClassifierError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            ClassifierError::Tokenizer { .. }
            | ClassifierError::Client(_)
            | ClassifierError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        AnalysisError::Summarization(error) => match error {
            SummarizationError::ModelWarmingUp(_) => StatusCode::SERVICE_UNAVAILABLE,
            SummarizationError::RequestFailed(_)
            | SummarizationError::RemoteService(_)
            | SummarizationError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            SummarizationError::Embedding(
                EmbeddingClientError::RequestFailed(_)
                | EmbeddingClientError::RemoteService(_)
                | EmbeddingClientError::InvalidResponse(_)
                | EmbeddingClientError::DimensionMismatch { .. },
            ) => StatusCode::BAD_GATEWAY,
            SummarizationError::MissingCredential(_)
            | SummarizationError::Client(_)
            | SummarizationError::Chunking(_)
            | SummarizationError::Embedding(_)
            | SummarizationError::Index(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SummaryResult;
    use crate::classifier::{Emotion, EmotionScore};
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use serde_json::Value;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "verdict-test-boundary";

    #[derive(Debug, Clone)]
    enum Call {
        Text(String),
        Document(String, Vec<u8>),
        Summary(String, Option<String>),
    }

    #[derive(Default)]
    struct StubAnalysisService {
        calls: Mutex<Vec<Call>>,
        summary_error: Option<fn() -> AnalysisError>,
    }

    impl StubAnalysisService {
        fn failing_summaries(error: fn() -> AnalysisError) -> Self {
            Self {
                summary_error: Some(error),
                ..Self::default()
            }
        }

        async fn recorded_calls(&self) -> Vec<Call> {
            self.calls.lock().await.clone()
        }

        fn ranked() -> RankedResult {
            RankedResult {
                primary: Emotion::Gratitude,
                primary_score: 72.5,
                filtered: vec![
                    EmotionScore {
                        emotion: Emotion::Gratitude,
                        percentage: 72.5,
                    },
                    EmotionScore {
                        emotion: Emotion::Joy,
                        percentage: 20.25,
                    },
                ],
            }
        }
    }

    #[async_trait]
    impl AnalysisApi for StubAnalysisService {
        async fn analyze_text(&self, text: &str) -> Result<RankedResult, AnalysisError> {
            self.calls.lock().await.push(Call::Text(text.to_string()));
            Ok(Self::ranked())
        }

        async fn analyze_document(
            &self,
            upload: DocumentUpload,
        ) -> Result<RankedResult, AnalysisError> {
            self.calls
                .lock()
                .await
                .push(Call::Document(upload.file_name, upload.bytes));
            Ok(Self::ranked())
        }

        async fn summarize_document(
            &self,
            upload: DocumentUpload,
            question: Option<String>,
        ) -> Result<SummaryResult, AnalysisError> {
            self.calls
                .lock()
                .await
                .push(Call::Summary(upload.file_name, question.clone()));
            if let Some(error) = self.summary_error {
                return Err(error());
            }
            Ok(SummaryResult {
                summary: "A concise summary.".into(),
                backend: "stub".into(),
                question,
            })
        }

        fn health(&self) -> HealthSnapshot {
            HealthSnapshot {
                status: "healthy",
                model: "stub-model".into(),
                summarizer: "stub".into(),
                message: "Verdict AI Backend is running".into(),
            }
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                texts_analyzed: 3,
                ..MetricsSnapshot::default()
            }
        }
    }

    fn multipart_body(file: Option<(&str, &[u8])>, question: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(question) = question {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"question\"\r\n\r\n{question}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    fn json_request(uri: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).expect("json body");
        (status, json)
    }

    #[tokio::test]
    async fn root_and_health_report_status() {
        let app = create_router(Arc::new(StubAnalysisService::default()));
        let request = Request::builder().uri("/").body(Body::empty()).expect("request");
        let (status, json) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");

        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .expect("request");
        let (status, json) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["model"], "stub-model");
        assert_eq!(json["summarizer"], "stub");
    }

    #[tokio::test]
    async fn analyze_sms_returns_ranked_emotions() {
        let service = Arc::new(StubAnalysisService::default());
        let app = create_router(service.clone());

        let (status, json) = send(
            app,
            json_request("/api/analyze_sms", json!({ "text": "thank you!" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["Predicted_Sentiment"], "Gratitude");
        assert_eq!(json["cd"], 72.5);
        assert_eq!(json["emotions"][0], json!({ "emotion": "Gratitude", "prob": 72.5 }));
        assert_eq!(json["emotions"][1]["emotion"], "Joy");
        assert!(matches!(
            service.recorded_calls().await.as_slice(),
            [Call::Text(text)] if text == "thank you!"
        ));
    }

    #[tokio::test]
    async fn analyze_sms_rejects_missing_or_blank_text() {
        let service = Arc::new(StubAnalysisService::default());
        let app = create_router(service.clone());

        for payload in [json!({}), json!({ "text": "" }), json!({ "text": "   " })] {
            let (status, json) = send(app.clone(), json_request("/api/analyze_sms", payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json, json!({ "error": "No text provided", "status": "error" }));
        }

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/analyze_sms")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .expect("request");
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn analyze_document_forwards_the_upload() {
        let service = Arc::new(StubAnalysisService::default());
        let app = create_router(service.clone());

        let body = multipart_body(Some(("notes.txt", b"hello there")), None);
        let (status, json) = send(app, multipart_request("/api/analyze_document", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["Predicted_Sentiment"], "Gratitude");
        let calls = service.recorded_calls().await;
        assert!(matches!(
            calls.as_slice(),
            [Call::Document(name, bytes)] if name == "notes.txt" && bytes == b"hello there"
        ));
    }

    #[tokio::test]
    async fn document_endpoints_require_a_file() {
        let app = create_router(Arc::new(StubAnalysisService::default()));

        let body = multipart_body(None, Some("anything"));
        let (status, json) =
            send(app.clone(), multipart_request("/api/analyze_document", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file provided");

        let body = multipart_body(Some(("", b"data")), None);
        let (status, json) =
            send(app.clone(), multipart_request("/api/summarize_document", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file selected");

        let request = json_request("/api/summarize_document", json!({ "file": "x" }));
        let (status, json) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn summarize_document_echoes_the_question() {
        let service = Arc::new(StubAnalysisService::default());
        let app = create_router(service.clone());

        let body = multipart_body(
            Some(("report.pdf", b"%PDF-1.4")),
            Some("What are the risks?"),
        );
        let (status, json) = send(app, multipart_request("/api/summarize_document", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "summary": "A concise summary.",
                "question": "What are the risks?",
                "status": "success"
            })
        );
        assert!(matches!(
            service.recorded_calls().await.as_slice(),
            [Call::Summary(name, Some(question))]
                if name == "report.pdf" && question == "What are the risks?"
        ));
    }

    #[tokio::test]
    async fn summary_without_question_omits_the_field() {
        let app = create_router(Arc::new(StubAnalysisService::default()));
        let body = multipart_body(Some(("a.txt", b"text")), None);
        let (_, json) = send(app, multipart_request("/api/summarize_document", body)).await;
        assert!(json.get("question").is_none());
    }

    #[tokio::test]
    async fn analysis_errors_map_to_status_codes() {
        let cases: [(fn() -> AnalysisError, StatusCode); 5] = [
            (|| AnalysisError::EmptyDocument, StatusCode::UNPROCESSABLE_ENTITY),
            (
                || {
                    AnalysisError::Summarization(SummarizationError::MissingCredential(
                        "GOOGLE_API_KEY",
                    ))
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                || AnalysisError::Summarization(SummarizationError::RemoteService("boom".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                || {
                    AnalysisError::Summarization(SummarizationError::ModelWarmingUp(
                        "loading".into(),
                    ))
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                || {
                    AnalysisError::Extraction(ExtractionError::Parse {
                        format: crate::extraction::DocumentFormat::Pdf,
                        detail: "bad xref".into(),
                    })
                },
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, expected) in cases {
            let app = create_router(Arc::new(StubAnalysisService::failing_summaries(error)));
            let body = multipart_body(Some(("a.pdf", b"x")), None);
            let (status, json) =
                send(app, multipart_request("/api/summarize_document", body)).await;
            assert_eq!(status, expected);
            assert_eq!(json["status"], "error");
            assert_eq!(json["error"], error().to_string());
        }
    }

    #[tokio::test]
    async fn metrics_endpoint_serializes_snapshot() {
        let app = create_router(Arc::new(StubAnalysisService::default()));
        let request = Request::builder()
            .uri("/api/metrics")
            .body(Body::empty())
            .expect("request");
        let (status, json) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["texts_analyzed"], 3);
        assert_eq!(json["failed_requests"], 0);
    }

    #[tokio::test]
    async fn oversized_uploads_are_rejected() {
        let config = Config::from_lookup(|key| match key {
            "MAX_UPLOAD_BYTES" => Some("64".into()),
            _ => None,
        })
        .expect("config");
        let app = apply_layers(
            create_router(Arc::new(StubAnalysisService::default())),
            &config,
        );

        let big = vec![b'a'; 1024];
        let body = multipart_body(Some(("big.txt", &big)), None);
        let response = app
            .oneshot(multipart_request("/api/analyze_document", body))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn oversized_text_requests_are_rejected() {
        let config = Config::from_lookup(|key| match key {
            "MAX_UPLOAD_BYTES" => Some("64".into()),
            _ => None,
        })
        .expect("config");
        let service = Arc::new(StubAnalysisService::default());
        let app = apply_layers(create_router(service.clone()), &config);

        let request = json_request("/api/analyze_sms", json!({ "text": "a".repeat(1024) }));
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["status"], "error");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let config = Config::from_lookup(|key| match key {
            "CORS_ALLOWED_ORIGINS" => Some("https://verdict.example".into()),
            _ => None,
        })
        .expect("config");
        let app = apply_layers(
            create_router(Arc::new(StubAnalysisService::default())),
            &config,
        );

        let request = Request::builder()
            .uri("/api/health")
            .header("origin", "https://verdict.example")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("router response");
        assert_eq!(
            response.headers().get("access-control-allow-origin"),
            Some(&HeaderValue::from_static("https://verdict.example"))
        );
    }
}
