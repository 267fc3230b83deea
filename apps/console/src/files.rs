use std::path::Path;

use bytes::Bytes;

use crate::errors::ValidationError;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const ACCEPTED_MIME_TYPES: &[&str] = &[PDF_MIME, DOCX_MIME];

/// Size ceiling of the upload page.
pub const UPLOAD_PAGE_MAX_BYTES: u64 = 5 * 1024 * 1024;

const OCTET_STREAM: &str = "application/octet-stream";

/// A file picked by the user, held in memory until the upload is confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct FileCandidate {
    filename: String,
    mime: String,
    bytes: Bytes,
}

impl FileCandidate {
    /// Builds a candidate; the MIME type is guessed from the extension when not given.
    pub fn new(filename: impl Into<String>, mime: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        let filename = filename.into();
        let mime = mime
            .map(str::to_string)
            .or_else(|| mime_for_filename(&filename).map(str::to_string))
            .unwrap_or_else(|| OCTET_STREAM.to_string());
        Self {
            filename,
            mime,
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ValidationError::Unreadable(path.display().to_string()))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ValidationError::Unreadable(format!("{}: {e}", path.display())))?;
        Ok(Self::new(filename, None, bytes))
    }

    /// Drop-target gate: accepted MIME type and at most `max_bytes`.
    pub fn validate(&self, max_bytes: u64) -> Result<(), ValidationError> {
        if !ACCEPTED_MIME_TYPES.contains(&self.mime.as_str()) {
            return Err(ValidationError::UnsupportedFileType(self.mime.clone()));
        }
        if self.size() > max_bytes {
            return Err(ValidationError::FileTooLarge {
                size: self.size(),
                max: max_bytes,
            });
        }
        Ok(())
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Registered MIME type for the file's extension. Anything outside
/// `ACCEPTED_MIME_TYPES` is still reported so `validate` can name it.
pub fn mime_for_filename(filename: &str) -> Option<&'static str> {
    mime_guess::from_path(filename).first_raw()
}

/// Human-readable size, e.g. `1.50 MB`.
pub fn format_bytes(size: u64) -> String {
    const KB: f64 = 1024.0;
    let size = size as f64;
    if size < KB {
        format!("{size} B")
    } else if size < KB * KB {
        format!("{:.1} KB", size / KB)
    } else {
        format!("{:.2} MB", size / (KB * KB))
    }
}
