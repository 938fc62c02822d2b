use std::{
    collections::HashMap,
    io::{Cursor, Write},
    sync::Arc,
};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use httpmock::{Method::POST, MockServer};
use serde_json::{Value, json};
use tower::ServiceExt;
use verdict::{
    analysis::AnalysisService,
    api,
    classifier::Emotion,
    config::Config,
};
use zip::write::SimpleFileOptions;

const BOUNDARY: &str = "verdict-integration-boundary";

fn config(pairs: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned()).expect("config")
}

fn app(config: &Config) -> Router {
    let service = AnalysisService::from_config(config).expect("service");
    api::apply_layers(api::create_router(Arc::new(service)), config)
}

/// Offline stack: keyword classifier and extractive summaries.
fn offline_app() -> Router {
    app(&config(&[
        ("CLASSIFIER_PROVIDER", "lexicon"),
        ("SUMMARIZATION_PROVIDER", "extractive"),
    ]))
}

fn upload(uri: &str, file_name: &str, bytes: &[u8], question: Option<&str>) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
    if let Some(question) = question {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"question\"\r\n\r\n{question}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

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

fn text_request(text: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/analyze_sms")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": text }).to_string()))
        .expect("request")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|text| format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", SimpleFileOptions::default())
        .expect("start document.xml");
    writer
        .write_all(document.as_bytes())
        .expect("write document.xml");
    writer.finish().expect("finish archive").into_inner()
}

fn percentages(json: &Value) -> Vec<f64> {
    json["emotions"]
        .as_array()
        .expect("emotions array")
        .iter()
        .map(|entry| entry["prob"].as_f64().expect("prob"))
        .collect()
}

#[tokio::test]
async fn hosted_classifier_ranks_an_enthusiastic_message() {
    let server = MockServer::start_async().await;
    let logits: Vec<Value> = Emotion::ALL
        .iter()
        .map(|emotion| {
            let score = match emotion {
                Emotion::Gratitude => 6.0,
                Emotion::Joy => 2.0,
                _ => -2.0,
            };
            json!({ "label": emotion.label().to_lowercase(), "score": score })
        })
        .collect();
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/sangkm/go-emotions-fine-tuned-distilroberta")
                .json_body_partial(r#"{"inputs":"I am absolutely thrilled and grateful today!"}"#);
            then.status(200).json_body(json!([logits]));
        })
        .await;

    let app = app(&config(&[
        ("HUGGINGFACE_API_URL", server.base_url().as_str()),
        ("SUMMARIZATION_PROVIDER", "extractive"),
    ]));
    let (status, json) = send(
        app,
        text_request("I am absolutely thrilled and grateful today!"),
    )
    .await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    let primary = json["Predicted_Sentiment"].as_str().expect("label");
    assert!(["Joy", "Gratitude", "Excitement", "Admiration"].contains(&primary));
    assert!(json["cd"].as_f64().expect("cd") > 50.0);

    let probs = percentages(&json);
    assert!(probs.iter().all(|prob| *prob > 1.0));
    assert!(probs.windows(2).all(|pair| pair[0] >= pair[1]));
    assert_eq!(json["emotions"][0]["emotion"], json["Predicted_Sentiment"]);
}

#[tokio::test]
async fn hosted_classifier_warming_up_maps_to_503() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(503).json_body(
                json!({ "error": "Model is currently loading", "estimated_time": 12.0 }),
            );
        })
        .await;

    let app = app(&config(&[
        ("HUGGINGFACE_API_URL", server.base_url().as_str()),
        ("SUMMARIZATION_PROVIDER", "extractive"),
    ]));
    let (status, json) = send(app, text_request("hello")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn lexicon_classifier_serves_text_requests() {
    let (status, json) = send(
        offline_app(),
        text_request("I am absolutely thrilled and grateful today!"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let primary = json["Predicted_Sentiment"].as_str().expect("label");
    assert!(["Gratitude", "Excitement"].contains(&primary));
    let cd = json["cd"].as_f64().expect("cd");
    assert!(cd > 0.0 && cd <= 100.0);
}

#[tokio::test]
async fn text_documents_are_classified() {
    let request = upload(
        "/api/analyze_document",
        "note.txt",
        "Thank you so much, I really appreciate your help.".as_bytes(),
        None,
    );
    let (status, json) = send(offline_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["Predicted_Sentiment"], "Gratitude");
}

#[tokio::test]
async fn docx_documents_are_classified() {
    let bytes = docx(&["I am so angry about this.", "It is outrageous."]);
    let request = upload("/api/analyze_document", "letter.docx", &bytes, None);
    let (status, json) = send(offline_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["Predicted_Sentiment"], "Anger");
}

#[tokio::test]
async fn unknown_extensions_classify_as_neutral() {
    let request = upload("/api/analyze_document", "data.xyz", b"\x00\x01\x02", None);
    let (status, json) = send(offline_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["Predicted_Sentiment"], "Neutral");
}

#[tokio::test]
async fn unknown_extensions_cannot_be_summarized() {
    let request = upload("/api/summarize_document", "data.xyz", b"anything", None);
    let (status, json) = send(offline_app(), request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn corrupt_documents_are_rejected() {
    let request = upload("/api/analyze_document", "broken.pdf", b"not a pdf at all", None);
    let (status, json) = send(offline_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().expect("message").contains("Error reading file"));

    let request = upload("/api/analyze_document", "bad.txt", &[0xff, 0xfe, 0xfd], None);
    let (status, _) = send(offline_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_key_falls_back_to_extractive_summary() {
    let app = app(&config(&[
        ("CLASSIFIER_PROVIDER", "lexicon"),
        ("SUMMARIZATION_PROVIDER", "gemini"),
    ]));
    let request = upload(
        "/api/summarize_document",
        "report.txt",
        b"One. Two. Three. Four.",
        Some("What happened?"),
    );
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["summary"], "One. Two. Three...");
    assert_eq!(json["question"], "What happened?");
    assert_eq!(json["status"], "success");
}

#[tokio::test]
async fn missing_key_without_fallback_is_a_server_error() {
    let app = app(&config(&[
        ("CLASSIFIER_PROVIDER", "lexicon"),
        ("SUMMARIZATION_PROVIDER", "openai"),
        ("SUMMARIZATION_FALLBACK", "false"),
    ]));
    let request = upload("/api/summarize_document", "report.txt", b"Some text.", None);
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().expect("message").contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn retrieval_summary_prompts_gemini_with_context() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .header("x-goog-api-key", "g-test")
                .body_contains("The harvest festival starts on Friday.");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "The festival begins Friday." }] }
                }]
            }));
        })
        .await;

    let app = app(&config(&[
        ("CLASSIFIER_PROVIDER", "lexicon"),
        ("SUMMARIZATION_PROVIDER", "retrieval"),
        ("GOOGLE_API_KEY", "g-test"),
        ("GEMINI_API_URL", server.base_url().as_str()),
        ("EMBEDDING_PROVIDER", "hashing"),
        ("EMBEDDING_DIMENSION", "64"),
    ]));
    let request = upload(
        "/api/summarize_document",
        "notice.txt",
        b"The harvest festival starts on Friday.",
        None,
    );
    let (status, json) = send(app, request).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["summary"], "The festival begins Friday.");
    assert!(json.get("question").is_none());
}

#[tokio::test]
async fn health_reports_configured_backends() {
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .expect("request");
    let (status, json) = send(offline_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model"], "lexicon");
    assert_eq!(json["summarizer"], "extractive");
}

#[tokio::test]
async fn metrics_count_requests_and_failures() {
    let app = offline_app();
    send(app.clone(), text_request("thanks a lot")).await;
    send(
        app.clone(),
        upload("/api/analyze_document", "bad.txt", &[0xff], None),
    )
    .await;

    let request = Request::builder()
        .uri("/api/metrics")
        .body(Body::empty())
        .expect("request");
    let (_, json) = send(app, request).await;
    assert_eq!(json["texts_analyzed"], 1);
    assert_eq!(json["failed_requests"], 1);
}
