//! Result record of the document ingestion tool.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Tool context state key under which the extraction result is stored.
pub const DOCUMENT_EXTRACTION_KEY: &str = "document_extraction";

/// Terminal status of one document check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExtractionStatus {
    /// Text was extracted from every page.
    Ok,
    /// The PDF parsed but has no pages.
    Empty,
    /// The PDF failed to parse or is structurally corrupt.
    Malformed,
    /// The artifact is not a PDF.
    UnsupportedType,
    /// No artifact in the session, or it vanished before loading.
    NotFound,
}

/// Machine-readable outcome of a document check.
///
/// Constructors keep `char_count` in step with `text`, and non-ok results
/// never carry text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub file_name: String,
    pub page_count: usize,
    pub char_count: usize,
    pub text: String,
    pub status: ExtractionStatus,
    /// Underlying cause for non-ok statuses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ExtractionResult {
    /// Successful extraction.
    pub fn ok(file_name: impl Into<String>, page_count: usize, text: String) -> Self {
        Self {
            file_name: file_name.into(),
            page_count,
            char_count: text.chars().count(),
            text,
            status: ExtractionStatus::Ok,
            reason: None,
        }
    }

    /// Failed check with the given status.
    pub fn failure(
        status: ExtractionStatus,
        file_name: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            page_count: 0,
            char_count: 0,
            text: String::new(),
            status,
            reason,
        }
    }

    /// No artifact could be located or loaded.
    pub fn not_found(reason: Option<String>) -> Self {
        Self::failure(ExtractionStatus::NotFound, String::new(), reason)
    }

    /// Whether the check succeeded.
    pub fn is_ok(&self) -> bool {
        self.status == ExtractionStatus::Ok
    }

    /// One-line message shown to the user.
    pub fn message(&self) -> String {
        match self.status {
            ExtractionStatus::Ok => "Document uploaded successfully".to_string(),
            ExtractionStatus::NotFound => "No document found in this session.".to_string(),
            ExtractionStatus::UnsupportedType => "Uploaded file is not a PDF.".to_string(),
            ExtractionStatus::Empty => "PDF contains no pages.".to_string(),
            ExtractionStatus::Malformed => format!(
                "Failed to parse PDF securely: {}.",
                self.reason.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
