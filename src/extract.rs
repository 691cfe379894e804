//! PDF text extraction boundary.
//!
//! Extraction is treated as an external collaborator behind [`PageExtractor`]:
//! bytes in, ordered page texts out. The production implementation is backed
//! by `pdf-extract`; tests substitute a stub.

use crate::error::{Error, Result};

/// Leading bytes every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Signature check used to reject non-PDF uploads before anything is stored.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Converts one document's bytes into an ordered sequence of page texts.
pub trait PageExtractor: Send + Sync {
    /// Returns one string per page, in page order. Fails with
    /// [`Error::InvalidInput`] on malformed input.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Production extractor backed by `pdf-extract`.
pub struct PdfExtractor;

impl PageExtractor for PdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        pdf_extract::extract_text_by_pages_from_mem(bytes)
            .map_err(|e| Error::InvalidInput(format!("unreadable PDF: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_detects_pdf() {
        assert!(is_pdf(b"%PDF-1.4\nrest"));
        assert!(!is_pdf(b"PK\x03\x04zip"));
        assert!(!is_pdf(b""));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = PdfExtractor.extract_pages(b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
