//! Format-aware text extraction for uploaded documents.
//!
//! The declared content type selects the strategy:
//!
//! - PDF: per-page text, concatenated in page order without a separator. The upload is staged in
//!   a uniquely named temporary file that is removed before extraction returns.
//! - Plain text: strict UTF-8 decoding.
//! - Word (`.docx`, and the legacy `application/msword` label): top-level paragraphs joined by
//!   newlines.

mod pdf;
mod transient;
mod word;

use std::path::PathBuf;
use thiserror::Error;

pub use transient::TransientFile;

/// Errors produced while turning an upload into plain text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The declared content type is not one of the recognized formats.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),
    /// Plain-text upload was not valid UTF-8.
    #[error("Failed to decode text as UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
    /// PDF could not be parsed.
    #[error("Failed to read PDF: {0}")]
    Pdf(String),
    /// Word document could not be parsed.
    #[error("Failed to read Word document: {0}")]
    Document(String),
    /// Transient storage could not be created or written.
    #[error("Failed to stage upload in temporary storage: {0}")]
    Staging(#[from] std::io::Error),
}

/// Document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// `application/pdf`
    Pdf,
    /// `text/plain`
    PlainText,
    /// `application/vnd.openxmlformats-officedocument.wordprocessingml.document`
    WordXml,
    /// `application/msword`
    WordLegacy,
}

impl ContentType {
    /// Parse a declared MIME label. Parameters (`; charset=...`) and case are ignored.
    pub fn from_mime(label: &str) -> Option<Self> {
        let essence = label
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "text/plain" => Some(Self::PlainText),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::WordXml)
            }
            "application/msword" => Some(Self::WordLegacy),
            _ => None,
        }
    }

    /// Guess the content type from a file extension (without the dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" => Some(Self::PlainText),
            "docx" => Some(Self::WordXml),
            "doc" => Some(Self::WordLegacy),
            _ => None,
        }
    }

    /// Canonical MIME label for this format.
    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::PlainText => "text/plain",
            Self::WordXml => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::WordLegacy => "application/msword",
        }
    }
}

/// Raw upload handed to the pipeline.
#[derive(Debug, Clone)]
pub struct DocumentPayload {
    /// Client-supplied filename; only used for naming transient storage and for logs.
    pub filename: String,
    /// Declared content type, exactly as received.
    pub content_type: String,
    /// Uploaded bytes.
    pub bytes: Vec<u8>,
}

impl DocumentPayload {
    /// Build a payload from its parts.
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Converts uploads into plain text.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    scratch_dir: PathBuf,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor {
    /// Extractor staging transient files in the system temporary directory.
    pub fn new() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Extractor staging transient files in `dir`.
    pub fn with_scratch_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: dir.into(),
        }
    }

    /// Map the declared label onto a recognized format.
    pub fn resolve(&self, content_type: &str) -> Result<ContentType, ExtractionError> {
        ContentType::from_mime(content_type)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(content_type.to_string()))
    }

    /// Extract the text of `payload`.
    ///
    /// `scope` is a per-invocation identifier folded into transient file names so concurrent
    /// uploads sharing a filename never touch the same path.
    pub fn extract(
        &self,
        payload: &DocumentPayload,
        scope: &str,
    ) -> Result<String, ExtractionError> {
        let kind = self.resolve(&payload.content_type)?;
        let text = match kind {
            ContentType::PlainText => std::str::from_utf8(&payload.bytes)?.to_owned(),
            ContentType::Pdf => {
                let staged = TransientFile::stage(
                    &self.scratch_dir,
                    scope,
                    &payload.filename,
                    &payload.bytes,
                )?;
                let result = pdf::extract_pdf(staged.path());
                staged.release();
                result?
            }
            ContentType::WordXml | ContentType::WordLegacy => word::extract_word(&payload.bytes)?,
        };
        tracing::debug!(
            filename = %payload.filename,
            content_type = kind.as_mime(),
            bytes = payload.bytes.len(),
            chars = text.len(),
            "Extracted document text"
        );
        Ok(text)
    }
}
