#![deny(missing_docs)]

//! Core library for the Verdict emotion analysis and summarization backend.

/// Text, document and summarization pipelines shared by the HTTP and CLI surfaces.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// GoEmotions classification and token truncation.
pub mod classifier;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text extraction from uploaded documents.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Request counters.
pub mod metrics;
/// Primary-label selection and percentage filtering.
pub mod ranking;
/// Summarization backends.
pub mod summarization;
