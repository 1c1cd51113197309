//! Error types for the pdf-face-redact library.
//!
//! A single error type, [`RedactError`], covers every failure. The page
//! sweep never retries: the first failing page aborts the sweep and its
//! error is returned as-is, so callers can match on the variant
//! (`RenderFailure`, `ModelNotReady`, `DetectionFailure`, …) and use
//! [`RedactError::page`] to find where the sweep stopped.
//!
//! Markers committed before the failing page are not rolled back. The
//! file-level entry points save the partially annotated document before
//! returning the error.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-face-redact library.
#[derive(Debug, Error)]
pub enum RedactError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The page could not be rasterised (e.g. a corrupt content stream).
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailure { page: usize, detail: String },

    /// The detector was invoked before the face model finished loading.
    #[error("Face detection model is not loaded.\nLoad it (--model <PATH>) before processing pages.")]
    ModelNotReady,

    /// The face model could not be read or parsed.
    #[error("Failed to load face model '{path}': {detail}")]
    ModelLoadFailed { path: PathBuf, detail: String },

    /// The detection backend returned an error for a page.
    #[error("Face detection failed for page {page}: {detail}")]
    DetectionFailure { page: usize, detail: String },

    /// The annotation store rejected a redaction marker.
    #[error("Could not add redaction marker to page {page}: {detail}")]
    AnnotationFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or containing directory).\n\
  • Pass --pdfium-lib /path/to/libpdfium.\n\
  • Install libpdfium system-wide from https://github.com/bblanchon/pdfium-binaries.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RedactError {
    /// The 1-based page a pipeline failure belongs to, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            RedactError::RenderFailure { page, .. }
            | RedactError::DetectionFailure { page, .. }
            | RedactError::AnnotationFailed { page, .. } => Some(*page),
            RedactError::PageOutOfRange { page, .. } if *page > 0 => Some(*page),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_failure_display() {
        let e = RedactError::RenderFailure {
            page: 2,
            detail: "bad content stream".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 2"), "got: {msg}");
        assert!(msg.contains("bad content stream"));
    }

    #[test]
    fn model_not_ready_mentions_flag() {
        assert!(RedactError::ModelNotReady.to_string().contains("--model"));
    }

    #[test]
    fn page_of_pipeline_errors() {
        let e = RedactError::DetectionFailure {
            page: 7,
            detail: "boom".into(),
        };
        assert_eq!(e.page(), Some(7));
        assert_eq!(RedactError::ModelNotReady.page(), None);
        assert_eq!(
            RedactError::PageOutOfRange { page: 0, total: 3 }.page(),
            None
        );
    }

    #[test]
    fn model_load_failed_display() {
        let e = RedactError::ModelLoadFailed {
            path: PathBuf::from("/models/seeta.bin"),
            detail: "unexpected eof".into(),
        };
        assert!(e.to_string().contains("seeta.bin"));
        assert!(e.to_string().contains("unexpected eof"));
    }
}
