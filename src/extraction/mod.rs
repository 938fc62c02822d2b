//! Text extraction for uploaded documents.
//!
//! Dispatch is driven by the declared file name's extension (case-insensitive):
//!
//! - `.txt` – strict UTF-8 decode.
//! - `.docx` – `w:t` runs from `word/document.xml`, one line per paragraph.
//! - `.pdf` – per-page text joined with `\n`; pages without text contribute `""`.
//! - anything else – the single-space placeholder [`UNSUPPORTED_PLACEHOLDER`].
//!
//! Uploads arriving over HTTP are staged to a temporary file first (see [`staging`]); the file
//! is removed when the staging guard drops, whether extraction succeeded or not.

mod docx;
mod pdf;
pub mod staging;

use serde::Serialize;
use thiserror::Error;

pub use staging::{DocumentUpload, StagedDocument};

/// Text returned for files whose extension is not recognized.
pub const UNSUPPORTED_PLACEHOLDER: &str = " ";

/// Errors raised while turning an uploaded file into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// A `.txt` upload was not valid UTF-8.
    #[error("Error reading file: invalid UTF-8 in text document: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
    /// A structured document (PDF, DOCX) could not be parsed.
    #[error("Error reading file: malformed {format} document: {detail}")]
    Parse {
        /// Format the parser expected.
        format: DocumentFormat,
        /// Parser diagnostic.
        detail: String,
    },
    /// Staging the upload on disk failed.
    #[error("Error staging upload: {0}")]
    Io(#[from] std::io::Error),
    /// The blocking extraction task was cancelled or panicked.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Document formats understood by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Plain UTF-8 text.
    Text,
    /// Office Open XML word-processing document.
    Docx,
    /// Portable Document Format.
    Pdf,
    /// Unrecognized extension; extraction yields the placeholder.
    Unsupported,
}

impl DocumentFormat {
    /// Resolve the format from a declared file name.
    pub fn from_file_name(file_name: &str) -> Self {
        let lowered = file_name.trim().to_lowercase();
        if lowered.ends_with(".txt") {
            Self::Text
        } else if lowered.ends_with(".docx") {
            Self::Docx
        } else if lowered.ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Unsupported
        }
    }

    /// File suffix used when staging an upload of this format.
    pub(crate) fn suffix(self) -> &'static str {
        match self {
            Self::Text => ".txt",
            Self::Docx => ".docx",
            Self::Pdf => ".pdf",
            Self::Unsupported => ".bin",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Text recovered from an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Extracted raw text.
    pub text: String,
    /// Format the text was extracted from.
    pub format: DocumentFormat,
}

impl ExtractedDocument {
    /// Whether the document carried no usable text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Extract text from an in-memory file according to its declared name.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
    let format = DocumentFormat::from_file_name(file_name);
    let text = match format {
        DocumentFormat::Text => String::from_utf8(bytes.to_vec())?,
        DocumentFormat::Docx => docx::extract(bytes)?,
        DocumentFormat::Pdf => pdf::extract(bytes)?,
        DocumentFormat::Unsupported => {
            tracing::warn!(
                file_name,
                "Unrecognized document extension; substituting placeholder text"
            );
            UNSUPPORTED_PLACEHOLDER.to_string()
        }
    };
    tracing::debug!(file_name, %format, chars = text.chars().count(), "Extracted document text");
    Ok(ExtractedDocument { text, format })
}

/// Stage an upload to a temporary file, extract its text, and remove the file.
///
/// Runs on the blocking pool; the temporary file is gone by the time this returns.
pub async fn extract_upload(upload: DocumentUpload) -> Result<ExtractedDocument, ExtractionError> {
    tokio::task::spawn_blocking(move || {
        let staged = StagedDocument::stage(&upload)?;
        let bytes = staged.read()?;
        extract_text(&upload.file_name, &bytes)
    })
    .await
    .map_err(|error| ExtractionError::Task(error.to_string()))?
}
