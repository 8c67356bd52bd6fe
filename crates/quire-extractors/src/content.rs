//! Page content stream interpretation.
//!
//! Walks the text operators of a page and rebuilds reading-order text. Line
//! breaks come from text positioning, not from glyph geometry.

use std::collections::HashMap;

use flate2::{Decompress, FlushDecompress, Status};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId, Stream};

use crate::error::{ExtractError, ExtractResult};
use crate::validate::{dictionary_at, reference, resolve_dict};

/// `TJ` adjustments at or below this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -250.0;

/// Vertical movement smaller than this stays on the same line.
const LINE_EPSILON: f32 = 0.5;

/// Maximum `/Parent` hops when looking for inherited resources.
const MAX_PARENT_HOPS: usize = 64;

/// Upper bound on the inflated size of one content stream.
const MAX_INFLATED_BYTES: usize = 64 * 1024 * 1024;

/// Operator appended after the page content. Parsing must reach it.
const END_OPERATOR: &str = "QuireEnd";

/// Extract the text of one page.
///
/// Every content stream must decode in full; a stream that fails to
/// inflate or parse fails the page instead of yielding partial text.
pub(crate) fn page_text(doc: &Document, page_id: ObjectId) -> ExtractResult<String> {
    let fonts = page_fonts(doc, page_id)?;
    let data = page_content(doc, page_id)?;
    let operations = decode_operations(&data)?;

    let mut interpreter = TextInterpreter::new(&fonts);
    for operation in &operations {
        interpreter.apply(&operation.operator, &operation.operands);
    }
    Ok(interpreter.finish())
}

/// Concatenated content streams of a page, filters removed.
fn page_content(doc: &Document, page_id: ObjectId) -> ExtractResult<Vec<u8>> {
    let mut data = Vec::new();
    for id in doc.get_page_contents(page_id) {
        let stream = match doc.get_object(id) {
            Ok(Object::Stream(stream)) => stream,
            Ok(_) => {
                return Err(ExtractError::structure(format!(
                    "content {} {} is not a stream",
                    id.0, id.1
                )))
            }
            Err(_) => {
                return Err(ExtractError::structure(format!(
                    "content stream {} {} is missing",
                    id.0, id.1
                )))
            }
        };
        let decoded = stream_data(stream).map_err(|message| {
            ExtractError::Parse(format!("content stream {} {}: {}", id.0, id.1, message))
        })?;
        data.extend_from_slice(&decoded);
        // Streams of one page may split between tokens.
        data.push(b'\n');
    }
    Ok(data)
}

fn stream_data(stream: &Stream) -> Result<Vec<u8>, String> {
    if !stream.dict.has(b"Filter") {
        return Ok(stream.content.clone());
    }
    let filters = stream.filters().map_err(|err| err.to_string())?;
    match filters.as_slice() {
        [] => Ok(stream.content.clone()),
        // lopdf logs and drops zlib errors, so plain Flate is inflated here.
        [flate] if flate == "FlateDecode" && !stream.dict.has(b"DecodeParms") => {
            inflate(&stream.content)
        }
        _ => stream.decompressed_content().map_err(|err| err.to_string()),
    }
}

/// Inflate a zlib stream, failing on corrupt or truncated input.
fn inflate(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut inflater = Decompress::new(true);
    let mut output = Vec::with_capacity(data.len().saturating_mul(4).clamp(64, MAX_INFLATED_BYTES));
    loop {
        let consumed = usize::try_from(inflater.total_in()).map_err(|err| err.to_string())?;
        let status = inflater
            .decompress_vec(&data[consumed..], &mut output, FlushDecompress::Finish)
            .map_err(|err| format!("invalid compressed data: {}", err))?;
        match status {
            Status::StreamEnd => return Ok(output),
            _ if output.len() == output.capacity() => {
                if output.len() >= MAX_INFLATED_BYTES {
                    return Err("inflated content is too large".to_string());
                }
                output.reserve(output.len().min(MAX_INFLATED_BYTES - output.len()));
            }
            _ => return Err("compressed data ends early".to_string()),
        }
    }
}

/// Parse content operators, rejecting data the parser stops short of.
///
/// lopdf's content parser returns whatever prefix it could read, so an end
/// operator is appended and must come back as the last operation.
fn decode_operations(data: &[u8]) -> ExtractResult<Vec<Operation>> {
    let mut framed = Vec::with_capacity(data.len() + END_OPERATOR.len() + 2);
    framed.extend_from_slice(data);
    framed.push(b'\n');
    framed.extend_from_slice(END_OPERATOR.as_bytes());
    framed.push(b'\n');

    let mut operations = Content::decode(&framed)?.operations;
    match operations.pop() {
        Some(last) if last.operator == END_OPERATOR && last.operands.is_empty() => Ok(operations),
        _ => Err(ExtractError::Parse(
            "content stream could not be parsed to the end".to_string(),
        )),
    }
}

/// Decodes string operands of one font into text.
#[derive(Debug)]
struct FontDecoder<'a> {
    /// Bytes per character code: 1 for simple fonts, 2 for `/Type0`.
    code_width: usize,
    encoding: Option<Encoding<'a>>,
}

impl<'a> FontDecoder<'a> {
    fn simple() -> Self {
        Self {
            code_width: 1,
            encoding: None,
        }
    }

    fn from_font(doc: &'a Document, font: &'a Dictionary) -> Self {
        let composite = font
            .get(b"Subtype")
            .and_then(Object::as_name)
            .is_ok_and(|name| name == b"Type0");
        let encoding = if font.type_is(b"Font") {
            font.get_font_encoding(doc).ok()
        } else {
            None
        };

        Self {
            code_width: if composite { 2 } else { 1 },
            encoding,
        }
    }

    fn decode(&self, obj: &Object) -> String {
        let Ok(bytes) = obj.as_str() else {
            return String::new();
        };
        match &self.encoding {
            // lopdf reads ToUnicode codes two bytes at a time; simple fonts
            // show one byte per code.
            Some(Encoding::UnicodeMapEncoding(cmap)) if self.code_width == 1 => {
                let mut units = Vec::with_capacity(bytes.len());
                for &b in bytes {
                    match cmap.get(u16::from(b)) {
                        Some(mapped) => units.extend(mapped),
                        None => units.push(u16::from(b)),
                    }
                }
                String::from_utf16_lossy(&units)
            }
            Some(encoding) => Document::decode_text(encoding, bytes)
                .unwrap_or_else(|_| replacement(bytes.len().div_ceil(self.code_width))),
            // CIDs without a ToUnicode map carry no recoverable text.
            None if self.code_width == 2 => replacement(bytes.len().div_ceil(2)),
            None => lopdf::decode_text_string(obj)
                .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

fn replacement(count: usize) -> String {
    std::iter::repeat(char::REPLACEMENT_CHARACTER).take(count).collect()
}

/// Font decoders keyed by resource name, including inherited resources.
fn page_fonts(
    doc: &Document,
    page_id: ObjectId,
) -> ExtractResult<HashMap<Vec<u8>, FontDecoder<'_>>> {
    let mut fonts = HashMap::new();
    let Some(resources) = inherited_resources(doc, page_id) else {
        return Ok(fonts);
    };
    let Some(font_dict) = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
    else {
        return Ok(fonts);
    };

    for (name, obj) in font_dict.iter() {
        let font = resolve_dict(doc, obj).ok_or_else(|| {
            ExtractError::structure(format!(
                "font /{} is not a dictionary",
                String::from_utf8_lossy(name)
            ))
        })?;
        fonts.insert(name.clone(), FontDecoder::from_font(doc, font));
    }
    Ok(fonts)
}

fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = dictionary_at(doc, page_id)?;
    for _ in 0..MAX_PARENT_HOPS {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        let parent = node.get(b"Parent").ok().and_then(reference)?;
        node = dictionary_at(doc, parent)?;
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Space,
    Break,
}

struct TextInterpreter<'a> {
    fonts: &'a HashMap<Vec<u8>, FontDecoder<'a>>,
    fallback: FontDecoder<'a>,
    current_font: Option<Vec<u8>>,
    last_tm_y: Option<f32>,
    pending: Pending,
    out: String,
}

impl<'a> TextInterpreter<'a> {
    fn new(fonts: &'a HashMap<Vec<u8>, FontDecoder<'a>>) -> Self {
        Self {
            fonts,
            fallback: FontDecoder::simple(),
            current_font: None,
            last_tm_y: None,
            pending: Pending::None,
            out: String::new(),
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        match operator {
            "BT" | "T*" => self.request_break(),
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.current_font = Some(name.clone());
                }
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if ty.abs() > LINE_EPSILON {
                    self.request_break();
                } else if tx > 0.0 {
                    self.request_space();
                }
            }
            "Tm" => {
                if let Some(y) = operands.get(5).and_then(number) {
                    if self
                        .last_tm_y
                        .is_some_and(|prev| (prev - y).abs() > LINE_EPSILON)
                    {
                        self.request_break();
                    }
                    self.last_tm_y = Some(y);
                }
            }
            "Tj" => {
                if let Some(obj) = operands.first() {
                    self.show(obj);
                }
            }
            "'" => {
                self.request_break();
                if let Some(obj) = operands.first() {
                    self.show(obj);
                }
            }
            "\"" => {
                self.request_break();
                if let Some(obj) = operands.get(2) {
                    self.show(obj);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(..) => self.show(item),
                            other => {
                                if number(other).is_some_and(|n| n <= TJ_SPACE_THRESHOLD) {
                                    self.request_space();
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn show(&mut self, obj: &Object) {
        let decoder = self
            .current_font
            .as_ref()
            .and_then(|name| self.fonts.get(name))
            .unwrap_or(&self.fallback);
        let text = decoder.decode(obj);
        self.push(&text);
    }

    fn push(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::Break => {
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
            }
            Pending::Space => {
                if !self.out.ends_with(char::is_whitespace)
                    && !text.starts_with(char::is_whitespace)
                {
                    self.out.push(' ');
                }
            }
            Pending::None => {}
        }
        self.out.push_str(text);
    }

    fn request_break(&mut self) {
        if !self.out.is_empty() {
            self.pending = Pending::Break;
        }
    }

    fn request_space(&mut self) {
        if !self.out.is_empty() && self.pending == Pending::None {
            self.pending = Pending::Space;
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(operations: Vec<Operation>) -> String {
        let fonts = HashMap::new();
        let mut interpreter = TextInterpreter::new(&fonts);
        for op in &operations {
            interpreter.apply(&op.operator, &op.operands);
        }
        interpreter.finish()
    }

    fn tj(text: &str) -> Operation {
        Operation::new("Tj", vec![Object::string_literal(text)])
    }

    #[test]
    fn test_single_show() {
        let text = run(vec![
            Operation::new("BT", vec![]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            tj("Hello World"),
            Operation::new("ET", vec![]),
        ]);
        assert_eq!(text, "Hello World");
    }

    #[test]
    fn test_line_moves_break_lines() {
        let text = run(vec![
            Operation::new("BT", vec![]),
            tj("one"),
            Operation::new("Td", vec![0.into(), (-14).into()]),
            tj("two"),
            Operation::new("T*", vec![]),
            tj("three"),
            Operation::new("ET", vec![]),
            Operation::new("BT", vec![]),
            tj("four"),
            Operation::new("ET", vec![]),
        ]);
        assert_eq!(text, "one\ntwo\nthree\nfour");
    }

    #[test]
    fn test_horizontal_move_inserts_space() {
        let text = run(vec![
            Operation::new("BT", vec![]),
            tj("left"),
            Operation::new("Td", vec![120.into(), 0.into()]),
            tj("right"),
            Operation::new("ET", vec![]),
        ]);
        assert_eq!(text, "left right");
    }

    #[test]
    fn test_tj_kerning_gap() {
        let text = run(vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Hel"),
                    Object::Integer(-20),
                    Object::string_literal("lo"),
                    Object::Integer(-400),
                    Object::string_literal("there"),
                ])],
            ),
            Operation::new("ET", vec![]),
        ]);
        assert_eq!(text, "Hello there");
    }

    #[test]
    fn test_quote_operators_start_new_lines() {
        let text = run(vec![
            Operation::new("BT", vec![]),
            tj("a"),
            Operation::new("'", vec![Object::string_literal("b")]),
            Operation::new(
                "\"",
                vec![0.into(), 0.into(), Object::string_literal("c")],
            ),
            Operation::new("ET", vec![]),
        ]);
        assert_eq!(text, "a\nb\nc");
    }

    #[test]
    fn test_text_matrix_lines() {
        let tm = |y: i64| {
            Operation::new(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), Object::Integer(y)],
            )
        };
        let text = run(vec![
            Operation::new("BT", vec![]),
            tm(700),
            tj("first"),
            tm(700),
            tj(" same"),
            tm(680),
            tj("second"),
            Operation::new("ET", vec![]),
        ]);
        assert_eq!(text, "first same\nsecond");
    }

    #[test]
    fn test_text_matrix_on_same_line_adds_nothing() {
        let tm = |x: i64| {
            Operation::new(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), Object::Integer(x), 700.into()],
            )
        };
        let text = run(vec![
            Operation::new("BT", vec![]),
            tm(72),
            tj("Sub"),
            tm(96),
            tj("script"),
            Operation::new("ET", vec![]),
        ]);
        assert_eq!(text, "Subscript");
    }

    #[test]
    fn test_no_text_is_empty() {
        let text = run(vec![
            Operation::new("BT", vec![]),
            Operation::new("ET", vec![]),
            Operation::new("re", vec![0.into(), 0.into(), 10.into(), 10.into()]),
        ]);
        assert_eq!(text, "");
    }

    #[test]
    fn test_decode_operations_reads_whole_stream() {
        let operations = decode_operations(b"BT (Hello) Tj ET").unwrap();
        let operators: Vec<&str> = operations.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["BT", "Tj", "ET"]);
        assert!(decode_operations(b"").unwrap().is_empty());
    }

    #[test]
    fn test_decode_operations_rejects_unparsed_tail() {
        assert!(decode_operations(b"BT (Hello) Tj ET BT (unterminated Tj ET (World) Tj").is_err());
        assert!(decode_operations(b"BT (Hello) Tj ET 12").is_err());
        assert!(decode_operations(b"BT [(a) 5 Tj").is_err());
    }

    #[test]
    fn test_inflate_is_strict() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"BT (Hello) Tj ET").unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(inflate(&compressed).unwrap(), b"BT (Hello) Tj ET");
        assert!(inflate(b"this is not zlib data").is_err());
        assert!(inflate(&compressed[..compressed.len() / 2]).is_err());
    }

    fn to_unicode(sections: &str) -> Vec<u8> {
        format!(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n\
             {}\
             endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
            sections
        )
        .into_bytes()
    }

    fn font_with(doc: &mut Document, mut font: Dictionary, cmap: Option<&str>) -> ObjectId {
        font.set("Type", "Font");
        if let Some(sections) = cmap {
            let cmap_id = doc.add_object(Stream::new(Dictionary::new(), to_unicode(sections)));
            font.set("ToUnicode", cmap_id);
        }
        doc.add_object(font)
    }

    fn decode_with(doc: &Document, font_id: ObjectId, bytes: &[u8]) -> String {
        let font = dictionary_at(doc, font_id).unwrap();
        FontDecoder::from_font(doc, font).decode(&Object::String(
            bytes.to_vec(),
            lopdf::StringFormat::Hexadecimal,
        ))
    }

    #[test]
    fn test_utf16_strings_without_font() {
        let decoder = FontDecoder::simple();
        let utf16 = Object::String(
            vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0xE9],
            lopdf::StringFormat::Hexadecimal,
        );
        assert_eq!(decoder.decode(&utf16), "Hé");
        assert_eq!(decoder.decode(&Object::string_literal("plain")), "plain");
        assert_eq!(decoder.decode(&Object::Integer(3)), "");
    }

    #[test]
    fn test_win_ansi_quotes() {
        let mut doc = Document::with_version("1.5");
        let font = lopdf::dictionary! { "Subtype" => "Type1", "Encoding" => "WinAnsiEncoding" };
        let font_id = font_with(&mut doc, font, None);
        assert_eq!(decode_with(&doc, font_id, &[0x93, b'q', 0x94]), "\u{201C}q\u{201D}");
    }

    #[test]
    fn test_composite_without_cmap_is_replacement() {
        let mut doc = Document::with_version("1.5");
        let font = lopdf::dictionary! { "Subtype" => "Type0", "Encoding" => "Identity-H" };
        let font_id = font_with(&mut doc, font, None);
        assert_eq!(decode_with(&doc, font_id, &[0x00, 0x24, 0x00, 0x25]), "\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_composite_with_cmap() {
        let mut doc = Document::with_version("1.5");
        let font = lopdf::dictionary! { "Subtype" => "Type0", "Encoding" => "Identity-H" };
        let font_id = font_with(
            &mut doc,
            font,
            Some("1 beginbfrange\n<0024> <0026> <0041>\nendbfrange\n"),
        );
        assert_eq!(
            decode_with(&doc, font_id, &[0x00, 0x24, 0x00, 0x26, 0x00, 0x99]),
            "AC\u{FFFD}"
        );
    }

    #[test]
    fn test_simple_font_reads_one_byte_codes_through_cmap() {
        let mut doc = Document::with_version("1.5");
        let font = lopdf::dictionary! { "Subtype" => "TrueType" };
        let font_id = font_with(
            &mut doc,
            font,
            Some("1 beginbfchar\n<0041> <00C5>\nendbfchar\n"),
        );
        assert_eq!(decode_with(&doc, font_id, b"AB"), "\u{C5}B");
    }
}
