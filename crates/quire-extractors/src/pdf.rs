//! PDF text extraction using lopdf.

use async_trait::async_trait;
use tracing::debug;

use crate::content::page_text;
use crate::error::{ExtractError, ExtractResult};
use crate::types::{DocumentStructure, ExtractedContent, ExtractedPdf};
use crate::validate::{guarded, ParsedPdf};
use crate::Extractor;

/// MIME type handled by [`PdfExtractor`].
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Extract the text of every page of a PDF, in document order.
///
/// Shorthand for [`ParsedPdf::parse`] followed by [`ParsedPdf::extract`].
pub fn extract_pages(bytes: &[u8]) -> ExtractResult<ExtractedPdf> {
    ParsedPdf::parse(bytes)?.extract()
}

impl ParsedPdf {
    /// Extract the text of every page.
    ///
    /// Each page contributes its text followed by a single `\n`, so a page
    /// without text still adds one line break. A document with an empty page
    /// tree is [`ExtractError::NoPages`]; the first page that fails aborts
    /// the whole extraction.
    pub fn extract(&self) -> ExtractResult<ExtractedPdf> {
        if self.pages.is_empty() {
            return Err(ExtractError::NoPages);
        }
        guarded(|| {
            let pages = self
                .pages
                .iter()
                .enumerate()
                .map(|(index, &page_id)| {
                    page_text(&self.doc, page_id)
                        .map_err(|err| ExtractError::content(index + 1, err))
                })
                .collect::<ExtractResult<Vec<_>>>()?;
            Ok(ExtractedPdf::from_pages(pages))
        })
    }
}

/// PDF content extractor.
///
/// [`Extractor::extract`] wraps the synchronous [`extract_pages`] in
/// `spawn_blocking` to avoid blocking the async runtime.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    /// Minimum text length to consider extraction successful
    /// (below it the PDF is probably scanned images).
    min_text_length: usize,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor {
    /// Create new PDF extractor with default settings.
    pub fn new() -> Self {
        Self {
            min_text_length: 10,
        }
    }

    /// Create PDF extractor with custom minimum text threshold.
    pub fn with_min_text_length(min_text_length: usize) -> Self {
        Self { min_text_length }
    }

    /// Whether the extracted text is too short to be a text PDF.
    pub fn looks_scanned(&self, pdf: &ExtractedPdf) -> bool {
        pdf.text.trim().chars().count() < self.min_text_length
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, content: &[u8]) -> ExtractResult<ExtractedContent> {
        let content = content.to_vec();
        let size = content.len();
        let pdf = tokio::task::spawn_blocking(move || extract_pages(&content)).await??;
        debug!(
            bytes = size,
            pages = pdf.page_count,
            chars = pdf.char_count,
            "Extracted PDF text"
        );
        let likely_scanned = self.looks_scanned(&pdf);

        Ok(ExtractedContent::new(pdf.text)
            .with_structure(DocumentStructure {
                page_count: pdf.page_count,
                pages: pdf.pages,
            })
            .with_metadata("page_count", pdf.page_count)
            .with_metadata("char_count", pdf.char_count)
            .with_metadata("likely_scanned", likely_scanned))
    }

    fn supported_types(&self) -> &[&str] {
        &[PDF_MIME_TYPE]
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    fn single_page(operations: Vec<Operation>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn hello() -> Vec<u8> {
        single_page(vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal("Hello World")]),
            Operation::new("ET", vec![]),
        ])
    }

    #[test]
    fn test_extract_pages_hello() {
        let pdf = extract_pages(&hello()).unwrap();
        assert_eq!(pdf.text, "Hello World\n");
        assert_eq!(pdf.page_count, 1);
        assert_eq!(pdf.char_count, 12);
    }

    #[test]
    fn test_extract_pages_rejects_garbage() {
        assert!(matches!(
            extract_pages(b"not a pdf"),
            Err(ExtractError::MissingHeader)
        ));
    }

    #[tokio::test]
    async fn test_pdf_extractor_creation() {
        let extractor = PdfExtractor::new();
        assert_eq!(extractor.name(), "lopdf");
        assert!(extractor.supports("application/pdf"));
        assert!(extractor.supports("Application/PDF; charset=binary"));
        assert!(!extractor.supports("image/png"));
    }

    #[tokio::test]
    async fn test_pdf_extractor_metadata() {
        let extractor = PdfExtractor::new();
        let content = extractor.extract(&hello()).await.unwrap();
        assert_eq!(content.text, "Hello World\n");
        assert_eq!(content.metadata["page_count"], serde_json::json!(1));
        assert_eq!(content.metadata["likely_scanned"], serde_json::json!(false));
        assert_eq!(content.structure.unwrap().pages, vec!["Hello World"]);
    }

    #[tokio::test]
    async fn test_pdf_extractor_flags_short_text() {
        let extractor = PdfExtractor::with_min_text_length(100);
        let content = extractor.extract(&hello()).await.unwrap();
        assert_eq!(content.metadata["likely_scanned"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_pdf_extractor_empty_content() {
        let extractor = PdfExtractor::new();
        let result = extractor.extract(&[]).await;
        assert!(matches!(result, Err(ExtractError::MissingHeader)));
    }
}
