use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing request activity.
#[derive(Default)]
pub struct ServiceMetrics {
    texts_analyzed: AtomicU64,
    documents_analyzed: AtomicU64,
    documents_summarized: AtomicU64,
    failed_requests: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a classified free-text message.
    pub fn record_text(&self) {
        self.texts_analyzed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a classified uploaded document.
    pub fn record_document(&self) {
        self.documents_analyzed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summarized uploaded document.
    pub fn record_summary(&self) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that ended in an error.
    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            texts_analyzed: self.texts_analyzed.load(Ordering::Relaxed),
            documents_analyzed: self.documents_analyzed.load(Ordering::Relaxed),
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of request counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Messages classified through `POST /api/analyze_sms`.
    pub texts_analyzed: u64,
    /// Documents classified through `POST /api/analyze_document`.
    pub documents_analyzed: u64,
    /// Documents summarized through `POST /api/summarize_document`.
    pub documents_summarized: u64,
    /// Requests that returned an error.
    pub failed_requests: u64,
}
