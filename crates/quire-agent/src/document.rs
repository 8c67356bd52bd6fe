//! The `check_uploaded_document` tool.
//!
//! Locates the document uploaded to the session, checks that it is a PDF,
//! validates it and extracts its text. Every failure becomes an
//! [`ExtractionStatus`]; nothing escapes the tool as an error.

use std::collections::HashMap;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use strum::Display;
use tracing::{debug, info, warn};

use quire_core::error::QuireResult;
use quire_core::types::{Artifact, ExtractionResult, ExtractionStatus, DOCUMENT_EXTRACTION_KEY};
use quire_extractors::{has_pdf_magic, Extractor, ParsedPdf, PdfExtractor, Validation};

use crate::tool::{FunctionTool, ToolContext};

/// Name the model calls the tool by.
pub const CHECK_UPLOADED_DOCUMENT: &str = "check_uploaded_document";

const DESCRIPTION: &str = "Check the document the user uploaded to this session. \
Validates that it is a readable PDF and extracts its text. Returns a short status message.";

/// Arguments of `check_uploaded_document`. The tool takes none.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CheckDocumentArgs {}

/// Progress of one invocation, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
enum Stage {
    Init,
    Located,
    Loaded,
    TypeOk,
    Validated,
    Extracted,
}

/// Validates and extracts the first uploaded document of a session.
#[derive(Debug, Clone, Default)]
pub struct DocumentTool {
    extractor: PdfExtractor,
}

impl DocumentTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a differently configured extractor.
    pub fn with_extractor(extractor: PdfExtractor) -> Self {
        Self { extractor }
    }

    /// Check the session's document and record the result in the context.
    ///
    /// The result is stored under [`DOCUMENT_EXTRACTION_KEY`] only once a
    /// terminal status is reached, so a cancelled call leaves no entry.
    pub async fn check(&self, ctx: &mut ToolContext) -> ExtractionResult {
        let result = self.inspect(ctx).await;

        if result.is_ok() {
            info!(
                session = %ctx.scope(),
                file = %result.file_name,
                pages = result.page_count,
                chars = result.char_count,
                "Document extracted"
            );
        } else {
            warn!(
                session = %ctx.scope(),
                file = %result.file_name,
                status = %result.status,
                reason = result.reason.as_deref().unwrap_or(""),
                "Document check failed"
            );
        }

        match serde_json::to_value(&result) {
            Ok(value) => ctx.set_state(DOCUMENT_EXTRACTION_KEY, value),
            Err(e) => warn!(error = %e, "Failed to serialize extraction result"),
        }
        result
    }

    async fn inspect(&self, ctx: &ToolContext) -> ExtractionResult {
        debug!(stage = %Stage::Init, session = %ctx.scope(), "Checking uploaded document");

        let ids = match ctx.list_artifacts().await {
            Ok(ids) => ids,
            Err(e) => return ExtractionResult::not_found(Some(e.to_string())),
        };
        // The store lists in upload order; the first upload is the target.
        let Some(id) = ids.into_iter().next() else {
            return ExtractionResult::not_found(Some("session has no artifacts".to_string()));
        };
        debug!(stage = %Stage::Located, artifact = %id);

        let artifact = match ctx.load_artifact(&id).await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                return ExtractionResult::not_found(Some(format!(
                    "artifact '{}' is no longer available",
                    id
                )))
            }
            Err(e) => return ExtractionResult::not_found(Some(e.to_string())),
        };
        debug!(stage = %Stage::Loaded, artifact = %id, bytes = artifact.len());

        if let Some(reason) = self.unsupported_reason(&artifact) {
            return ExtractionResult::failure(
                ExtractionStatus::UnsupportedType,
                &artifact.display_name,
                Some(reason),
            );
        }
        debug!(stage = %Stage::TypeOk, artifact = %id);

        let file_name = artifact.display_name.as_str();
        // One parse serves both validation and extraction.
        let parsed = ParsedPdf::parse(&artifact.bytes);
        match Validation::of(&parsed) {
            Validation::Valid { page_count } => {
                debug!(stage = %Stage::Validated, artifact = %id, pages = page_count);
            }
            Validation::Empty => {
                return ExtractionResult::failure(
                    ExtractionStatus::Empty,
                    file_name,
                    Some("page tree has no pages".to_string()),
                )
            }
            Validation::Malformed { reason } => {
                return ExtractionResult::failure(ExtractionStatus::Malformed, file_name, Some(reason))
            }
        }

        match parsed.and_then(|pdf| pdf.extract()) {
            Ok(pdf) => {
                debug!(stage = %Stage::Extracted, artifact = %id, chars = pdf.char_count);
                if self.extractor.looks_scanned(&pdf) {
                    warn!(artifact = %id, "PDF has almost no text; it may be a scanned image");
                }
                ExtractionResult::ok(file_name, pdf.page_count, pdf.text)
            }
            Err(e) => {
                ExtractionResult::failure(ExtractionStatus::Malformed, file_name, Some(e.to_string()))
            }
        }
    }

    fn unsupported_reason(&self, artifact: &Artifact) -> Option<String> {
        if !self.extractor.supports(&artifact.mime_type) {
            return Some(format!("content type '{}' is not a PDF", artifact.mime_type));
        }
        if !has_pdf_magic(&artifact.bytes) {
            return Some("content does not start with a PDF header".to_string());
        }
        None
    }
}

#[async_trait]
impl FunctionTool for DocumentTool {
    fn name(&self) -> &str {
        CHECK_UPLOADED_DOCUMENT
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn parameters(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(CheckDocumentArgs))
            .unwrap_or_else(|_| json!({"type": "object", "properties": {}}))
    }

    async fn call(&self, ctx: &mut ToolContext, _args: &HashMap<String, Value>) -> QuireResult<String> {
        Ok(self.check(ctx).await.message())
    }
}
