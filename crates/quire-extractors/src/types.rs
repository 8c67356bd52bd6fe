//! Core types for content extraction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Document structure metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// Total page count.
    pub page_count: usize,

    /// Per-page text, in document order, without page terminators.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub pages: Vec<String>,
}

/// Extracted content with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Extracted text.
    pub text: String,

    /// Document structure (if preserved).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<DocumentStructure>,

    /// Additional metadata (format-specific).
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ExtractedContent {
    /// Create new extracted content.
    pub fn new(text: String) -> Self {
        Self {
            text,
            structure: None,
            metadata: HashMap::new(),
        }
    }

    /// Add structure information.
    pub fn with_structure(mut self, structure: DocumentStructure) -> Self {
        self.structure = Some(structure);
        self
    }

    /// Add metadata entry.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check if extraction produced meaningful content.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Content length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Per-page text of a PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPdf {
    /// Text of each page, without terminators.
    pub pages: Vec<String>,
    /// Every page's text followed by a single `\n`, in document order.
    pub text: String,
    /// Number of pages, including pages without text.
    pub page_count: usize,
    /// Number of characters in `text`.
    pub char_count: usize,
}

impl ExtractedPdf {
    pub(crate) fn from_pages(pages: Vec<String>) -> Self {
        let mut text = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
        for page in &pages {
            text.push_str(page);
            text.push('\n');
        }
        Self {
            page_count: pages.len(),
            char_count: text.chars().count(),
            pages,
            text,
        }
    }
}
