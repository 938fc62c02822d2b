//! Analysis pipelines: text classification, document classification, document summarization.

mod service;
pub mod types;

pub use service::{AnalysisApi, AnalysisService};
pub use types::{AnalysisError, HealthSnapshot, SummaryResult};
