//! Shared fixtures for quire-agent integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use quire_core::error::{QuireError, QuireResult};
use quire_core::traits::{GenerationOptions, Llm, LlmResponse, Tool, ToolCall, ToolChoice};
use quire_core::types::Message;

/// Build a PDF with one page per entry; an empty entry is a blank page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    pdf_with_streams(pages.iter().map(|text| text_stream(text)).collect())
}

/// A one-page PDF whose content stream holds `content` verbatim.
pub fn pdf_with_raw_content(content: &[u8]) -> Vec<u8> {
    pdf_with_streams(vec![Stream::new(dictionary! {}, content.to_vec())])
}

fn text_stream(text: &str) -> Stream {
    let operations = if text.is_empty() {
        vec![]
    } else {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]
    };
    let content = Content { operations };
    Stream::new(dictionary! {}, content.encode().unwrap())
}

fn pdf_with_streams(contents: Vec<Stream>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for content in contents {
        let content_id = doc.add_object(content);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
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

/// A PDF cut off inside its cross-reference table.
pub fn truncated_pdf() -> Vec<u8> {
    let bytes = pdf_with_pages(&["Hello World"]);
    let xref = bytes
        .windows(5)
        .position(|w| w == b"xref\n")
        .unwrap_or(bytes.len() / 2);
    bytes[..xref + 8].to_vec()
}

/// Model that replays canned responses and records what it was sent.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<LlmResponse>>,
    pub requests: Mutex<Vec<Vec<Message>>>,
    pub tool_names: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            tool_names: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Vec<Message> {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn next(&self, messages: &[Message], tools: &[Tool]) -> QuireResult<LlmResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.tool_names
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| QuireError::llm("script exhausted"))
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    async fn generate(
        &self,
        messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> QuireResult<LlmResponse> {
        self.next(messages, &[])
    }

    async fn generate_with_tools(
        &self,
        messages: &[Message],
        tools: &[Tool],
        _tool_choice: ToolChoice,
        _options: Option<GenerationOptions>,
    ) -> QuireResult<LlmResponse> {
        self.next(messages, tools)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn text(content: &str) -> LlmResponse {
    LlmResponse {
        content: Some(content.to_string()),
        ..Default::default()
    }
}

pub fn call_tool(name: &str) -> LlmResponse {
    LlmResponse {
        content: None,
        tool_calls: vec![ToolCall {
            id: Some(format!("call_{}", name)),
            name: name.to_string(),
            arguments: Default::default(),
        }],
        usage: None,
    }
}
