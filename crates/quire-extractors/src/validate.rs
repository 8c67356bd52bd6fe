//! Structural PDF validation.
//!
//! Parses the object graph and walks the catalog and page tree, which is
//! enough to count pages. Page content streams are never decoded here.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};

/// Magic bytes every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// How far from the end of the file the `%%EOF` marker may sit.
const EOF_SEARCH_WINDOW: usize = 1024;

/// Maximum nesting of `/Pages` nodes.
const MAX_TREE_DEPTH: usize = 64;

/// Maximum chained indirect references followed when resolving an object.
const MAX_REFERENCE_HOPS: usize = 32;

/// Outcome of validating a byte blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Well-formed PDF with at least one page.
    Valid { page_count: usize },
    /// Parses, but the page tree holds no pages.
    Empty,
    /// Parse failure or structural corruption.
    Malformed { reason: String },
}

impl Validation {
    /// Whether the document can be handed to the extractor.
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid { .. })
    }
}

impl Validation {
    /// Classify the outcome of [`ParsedPdf::parse`].
    pub fn of(parsed: &ExtractResult<ParsedPdf>) -> Self {
        match parsed {
            Ok(pdf) if pdf.page_count() == 0 => Validation::Empty,
            Ok(pdf) => Validation::Valid {
                page_count: pdf.page_count(),
            },
            Err(err) => Validation::Malformed {
                reason: err.to_string(),
            },
        }
    }
}

/// A parsed PDF and its leaf pages in document order.
///
/// Validation and extraction both start from one of these, so a caller
/// that needs both parses the bytes once.
#[derive(Debug, Clone)]
pub struct ParsedPdf {
    pub(crate) doc: Document,
    pub(crate) pages: Vec<ObjectId>,
}

impl ParsedPdf {
    /// Check the framing of `bytes`, parse the object graph and walk the
    /// page tree. Page content is not decoded.
    pub fn parse(bytes: &[u8]) -> ExtractResult<Self> {
        guarded(|| {
            let doc = load_document(bytes)?;
            let pages = collect_pages(&doc)?;
            Ok(Self { doc, pages })
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Decide whether `bytes` is a structurally valid PDF with at least one page.
pub fn validate_pdf(bytes: &[u8]) -> Validation {
    let validation = Validation::of(&ParsedPdf::parse(bytes));
    debug!(bytes = bytes.len(), ?validation, "Validated PDF");
    validation
}

/// Check whether bytes begin with the PDF magic.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Run parser code, turning a panic into an error.
pub(crate) fn guarded<T>(f: impl FnOnce() -> ExtractResult<T>) -> ExtractResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ExtractError::Panicked(message))
        }
    }
}

/// Check the framing of the file and parse its object graph.
fn load_document(bytes: &[u8]) -> ExtractResult<Document> {
    if !has_pdf_magic(bytes) {
        return Err(ExtractError::MissingHeader);
    }
    let tail_start = bytes.len().saturating_sub(EOF_SEARCH_WINDOW);
    if !bytes[tail_start..].windows(5).any(|w| w == b"%%EOF") {
        return Err(ExtractError::Truncated);
    }

    let mut doc = Document::load_mem(bytes)?;
    if doc.is_encrypted() {
        // Files locked only by an owner password open with an empty user password.
        doc.decrypt("").map_err(|err| {
            debug!(error = %err, "Encrypted PDF needs a password");
            ExtractError::Encrypted
        })?;
    }
    Ok(doc)
}

/// Collect leaf page ids in document order.
fn collect_pages(doc: &Document) -> ExtractResult<Vec<ObjectId>> {
    let root_id = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(reference)
        .ok_or_else(|| ExtractError::structure("trailer has no /Root reference"))?;

    let catalog = dictionary_at(doc, root_id)
        .ok_or_else(|| ExtractError::structure("catalog is missing or not a dictionary"))?;
    if let Some(kind) = type_name(catalog) {
        if kind != b"Catalog" {
            return Err(ExtractError::structure("/Root is not a /Catalog"));
        }
    }

    let pages_id = catalog
        .get(b"Pages")
        .ok()
        .and_then(reference)
        .ok_or_else(|| ExtractError::structure("catalog has no /Pages reference"))?;
    let pages_root = dictionary_at(doc, pages_id)
        .ok_or_else(|| ExtractError::structure("page tree root is missing"))?;
    if !is_pages_node(pages_root) {
        return Err(ExtractError::structure("page tree root is not a /Pages node"));
    }

    let mut pages = Vec::new();
    let mut visited = HashSet::new();
    walk_page_tree(doc, pages_id, 0, &mut visited, &mut pages)?;
    Ok(pages)
}

fn walk_page_tree(
    doc: &Document,
    node_id: ObjectId,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    pages: &mut Vec<ObjectId>,
) -> ExtractResult<()> {
    if depth > MAX_TREE_DEPTH {
        return Err(ExtractError::structure("page tree is nested too deeply"));
    }
    if !visited.insert(node_id) {
        return Err(ExtractError::structure(format!(
            "page tree cycle at object {} {}",
            node_id.0, node_id.1
        )));
    }

    let node = dictionary_at(doc, node_id).ok_or_else(|| {
        ExtractError::structure(format!(
            "page tree node {} {} is missing",
            node_id.0, node_id.1
        ))
    })?;

    if !is_pages_node(node) {
        if type_name(node).is_some_and(|kind| kind != b"Page") {
            return Err(ExtractError::structure(format!(
                "unexpected node type in page tree at object {} {}",
                node_id.0, node_id.1
            )));
        }
        pages.push(node_id);
        return Ok(());
    }

    let kids = node
        .get(b"Kids")
        .ok()
        .and_then(|kids| resolve(doc, kids))
        .and_then(|kids| match kids {
            Object::Array(items) => Some(items),
            _ => None,
        })
        .ok_or_else(|| ExtractError::structure("/Pages node has no /Kids array"))?;

    for kid in kids {
        let kid_id = reference(kid)
            .ok_or_else(|| ExtractError::structure("/Kids entry is not a reference"))?;
        walk_page_tree(doc, kid_id, depth + 1, visited, pages)?;
    }
    Ok(())
}

fn is_pages_node(dict: &Dictionary) -> bool {
    match type_name(dict) {
        Some(kind) => kind == b"Pages",
        None => dict.has(b"Kids"),
    }
}

fn type_name(dict: &Dictionary) -> Option<&[u8]> {
    match dict.get(b"Type") {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
    }
}

pub(crate) fn reference(obj: &Object) -> Option<ObjectId> {
    match obj {
        Object::Reference(id) => Some(*id),
        _ => None,
    }
}

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_REFERENCE_HOPS {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            _ => return Some(obj),
        }
    }
    None
}

/// Resolve `obj` to a dictionary, looking through stream dictionaries.
pub(crate) fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub(crate) fn dictionary_at(doc: &Document, id: ObjectId) -> Option<&Dictionary> {
    match doc.get_object(id).ok()? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn save(mut doc: Document) -> Vec<u8> {
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn document_with_kids(kids: Vec<Object>, count: i64) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        (doc, pages_id)
    }

    fn add_page(doc: &mut Document, parent: ObjectId) -> ObjectId {
        doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => parent,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        })
    }

    #[test]
    fn test_rejects_non_pdf() {
        assert!(matches!(validate_pdf(b"hello"), Validation::Malformed { .. }));
        assert!(matches!(validate_pdf(b""), Validation::Malformed { .. }));
    }

    #[test]
    fn test_missing_eof_is_malformed() {
        let validation = validate_pdf(b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\nxref\n0 2\n");
        match validation {
            Validation::Malformed { reason } => assert!(reason.contains("truncated")),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_page_tree() {
        let (doc, _) = document_with_kids(vec![], 0);
        assert_eq!(validate_pdf(&save(doc)), Validation::Empty);
    }

    #[test]
    fn test_counts_pages() {
        let (mut doc, pages_id) = document_with_kids(vec![], 0);
        let a = add_page(&mut doc, pages_id);
        let b = add_page(&mut doc, pages_id);
        if let Ok(Object::Dictionary(pages)) = doc.get_object_mut(pages_id) {
            pages.set("Kids", vec![a.into(), b.into()]);
            pages.set("Count", 2);
        }
        assert_eq!(validate_pdf(&save(doc)), Validation::Valid { page_count: 2 });
    }

    #[test]
    fn test_nested_page_tree_order() {
        let (mut doc, root_id) = document_with_kids(vec![], 0);
        let first = add_page(&mut doc, root_id);
        let inner_id = doc.new_object_id();
        let second = add_page(&mut doc, inner_id);
        let third = add_page(&mut doc, inner_id);
        doc.objects.insert(
            inner_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Parent" => root_id,
                "Kids" => vec![second.into(), third.into()],
                "Count" => 2,
            }),
        );
        if let Ok(Object::Dictionary(pages)) = doc.get_object_mut(root_id) {
            pages.set("Kids", vec![first.into(), inner_id.into()]);
            pages.set("Count", 3);
        }

        assert_eq!(collect_pages(&doc).unwrap(), vec![first, second, third]);
    }

    #[test]
    fn test_cycle_is_malformed() {
        let (mut doc, pages_id) = document_with_kids(vec![], 1);
        if let Ok(Object::Dictionary(pages)) = doc.get_object_mut(pages_id) {
            pages.set("Kids", vec![pages_id.into()]);
        }
        let err = collect_pages(&doc).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_dangling_kid_is_malformed() {
        let (doc, _) = document_with_kids(vec![Object::Reference((999, 0))], 1);
        assert!(matches!(collect_pages(&doc), Err(ExtractError::Structure(_))));
    }

    #[test]
    fn test_missing_root_is_malformed() {
        let (mut doc, _) = document_with_kids(vec![], 0);
        doc.trailer.remove(b"Root");
        assert!(collect_pages(&doc).is_err());
    }

    #[test]
    fn test_guarded_catches_panics() {
        let result: ExtractResult<()> = guarded(|| panic!("bad xref"));
        match result {
            Err(ExtractError::Panicked(message)) => assert_eq!(message, "bad xref"),
            other => panic!("expected panic error, got {:?}", other),
        }
    }
}
