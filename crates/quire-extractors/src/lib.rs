//! quire-extractors - PDF validation and text extraction.
//!
//! Uploaded documents are untrusted input. Everything here is synchronous
//! parsing wrapped so that hostile bytes produce an error instead of a
//! crash, plus an async [`Extractor`] facade that moves the work onto the
//! blocking pool.
//!
//! # Example
//!
//! ```ignore
//! use quire_extractors::{ParsedPdf, Validation};
//!
//! let parsed = ParsedPdf::parse(&bytes);
//! if let Validation::Valid { page_count } = Validation::of(&parsed) {
//!     let pdf = parsed?.extract()?;
//!     assert_eq!(pdf.page_count, page_count);
//! }
//! ```

mod content;
mod error;
mod pdf;
mod types;
mod validate;

pub use error::{ExtractError, ExtractResult};
pub use pdf::{extract_pages, PdfExtractor, PDF_MIME_TYPE};
pub use types::{DocumentStructure, ExtractedContent, ExtractedPdf};
pub use validate::{has_pdf_magic, validate_pdf, ParsedPdf, Validation, PDF_MAGIC};

use async_trait::async_trait;

/// Core Extractor trait - all content extractors implement this.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract text content from bytes.
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedContent>;

    /// Supported MIME types for this extractor.
    fn supported_types(&self) -> &[&str];

    /// Check if this extractor handles the given MIME type.
    ///
    /// Parameters such as `; charset=binary` are ignored and the
    /// comparison is case-insensitive.
    fn supports(&self, mime_type: &str) -> bool {
        let essence = mime_essence(mime_type);
        self.supported_types()
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(essence))
    }

    /// Human-readable name for this extractor.
    fn name(&self) -> &str;
}

/// The `type/subtype` part of a MIME type, without parameters or padding.
pub fn mime_essence(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or_default().trim()
}
