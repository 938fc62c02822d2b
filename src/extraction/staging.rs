//! Scoped temporary files for uploaded documents.

use super::DocumentFormat;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// A file received through a multipart upload.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// Name declared by the client; drives format dispatch.
    pub file_name: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    /// Bundle a declared file name with its content.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// An upload written to a temporary file that is deleted when the guard drops.
pub struct StagedDocument {
    file: NamedTempFile,
}

impl StagedDocument {
    /// Write the upload to a fresh temporary file carrying its extension.
    pub fn stage(upload: &DocumentUpload) -> std::io::Result<Self> {
        let format = DocumentFormat::from_file_name(&upload.file_name);
        let mut file = tempfile::Builder::new()
            .prefix("verdict-upload-")
            .suffix(format.suffix())
            .tempfile()?;
        file.write_all(&upload.bytes)?;
        file.flush()?;
        tracing::debug!(
            path = %file.path().display(),
            bytes = upload.bytes.len(),
            "Staged upload"
        );
        Ok(Self { file })
    }

    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the staged content back from the start of the file.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        let mut handle = self.file.reopen()?;
        handle.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        handle.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}
