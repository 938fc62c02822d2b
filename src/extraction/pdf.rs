//! PDF text extraction, page by page.

use super::{DocumentFormat, ExtractionError};
use std::panic::{AssertUnwindSafe, catch_unwind};

pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let pages = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|payload| parse_error(panic_message(payload.as_ref())))?
    .map_err(|error| parse_error(error.to_string()))?;

    tracing::debug!(pages = pages.len(), "Extracted PDF pages");
    Ok(join_pages(pages))
}

fn join_pages(pages: Vec<String>) -> String {
    pages.join("\n")
}

fn parse_error(detail: String) -> ExtractionError {
    ExtractionError::Parse {
        format: DocumentFormat::Pdf,
        detail,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "PDF parser panicked".to_string()
    }
}
