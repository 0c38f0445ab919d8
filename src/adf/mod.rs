pub mod inline;
pub mod segment;
/// Atlassian Document Format (ADF) conversion
///
/// Issue descriptions and comment bodies are authored as lightweight
/// markdown-ish text but Jira Cloud's v3 REST API only accepts structured
/// documents. This module builds the document tree from raw text and
/// serializes it into the wire shape the API expects:
/// `{ "type": "doc", "version": 1, "content": [ ...blocks... ] }`.
///
/// Conversion is total: any input produces a document, malformed markup is
/// passed through as plain text.
pub use self::segment::segment;

use serde_json::{Value, json};

/// Style annotation carried by an inline run. A run carries at most one mark;
/// the inline formatter never stacks them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Strong,
    Emphasis,
    Strike,
    Code,
    Link { href: String },
}

/// A contiguous span of text with zero or one style mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineRun {
    pub text: String,
    pub marks: Vec<Mark>,
}

impl InlineRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: impl Into<String>, mark: Mark) -> Self {
        Self {
            text: text.into(),
            marks: vec![mark],
        }
    }
}

/// One list entry. Only a single paragraph of inline content per item is
/// supported; nested lists are out of scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub inline: Vec<InlineRun>,
}

/// Top-level structural unit of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph {
        inline: Vec<InlineRun>,
    },
    Heading {
        level: u8,
        inline: Vec<InlineRun>,
    },
    CodeBlock {
        language: Option<String>,
        raw_text: String,
    },
    BulletList {
        items: Vec<ListItem>,
    },
    OrderedList {
        items: Vec<ListItem>,
    },
}

/// Document root. Always holds at least one block; blank input yields a
/// single empty paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: Vec<Block>,
}

impl Document {
    /// Serialize into the ADF wire format.
    pub fn to_value(&self) -> Value {
        json!({
            "type": "doc",
            "version": 1,
            "content": self.content.iter().map(block_to_value).collect::<Vec<_>>(),
        })
    }
}

/// Convert markdown-ish text straight to an ADF value, ready to embed in a
/// REST payload.
pub fn markdown_to_adf(text: &str) -> Value {
    segment(text).to_value()
}

fn block_to_value(block: &Block) -> Value {
    match block {
        Block::Paragraph { inline } => json!({
            "type": "paragraph",
            "content": inline.iter().map(inline_to_value).collect::<Vec<_>>(),
        }),
        Block::Heading { level, inline } => json!({
            "type": "heading",
            "attrs": { "level": level },
            "content": inline.iter().map(inline_to_value).collect::<Vec<_>>(),
        }),
        Block::CodeBlock { language, raw_text } => {
            // ADF rejects empty text nodes, so an empty code block has no
            // content entry at all.
            let content: Vec<Value> = if raw_text.is_empty() {
                Vec::new()
            } else {
                vec![json!({ "type": "text", "text": raw_text })]
            };
            let mut node = json!({
                "type": "codeBlock",
                "content": content,
            });
            if let Some(language) = language {
                node["attrs"] = json!({ "language": language });
            }
            node
        }
        Block::BulletList { items } => json!({
            "type": "bulletList",
            "content": items.iter().map(item_to_value).collect::<Vec<_>>(),
        }),
        Block::OrderedList { items } => json!({
            "type": "orderedList",
            "content": items.iter().map(item_to_value).collect::<Vec<_>>(),
        }),
    }
}

fn item_to_value(item: &ListItem) -> Value {
    json!({
        "type": "listItem",
        "content": [{
            "type": "paragraph",
            "content": item.inline.iter().map(inline_to_value).collect::<Vec<_>>(),
        }],
    })
}

fn inline_to_value(run: &InlineRun) -> Value {
    let mut node = json!({
        "type": "text",
        "text": run.text,
    });
    if !run.marks.is_empty() {
        node["marks"] = Value::Array(run.marks.iter().map(mark_to_value).collect());
    }
    node
}

fn mark_to_value(mark: &Mark) -> Value {
    match mark {
        Mark::Strong => json!({ "type": "strong" }),
        Mark::Emphasis => json!({ "type": "em" }),
        Mark::Strike => json!({ "type": "strike" }),
        Mark::Code => json!({ "type": "code" }),
        Mark::Link { href } => json!({ "type": "link", "attrs": { "href": href } }),
    }
}

/// Flatten an ADF document fetched from Jira into readable plain text.
///
/// Used when rendering descriptions and comment bodies back to the caller.
/// Unknown node types contribute the text of their children, so new ADF
/// constructs degrade to their textual content instead of disappearing.
pub fn adf_to_text(node: &Value) -> String {
    match node {
        // Jira still returns plain strings for legacy rendered fields.
        Value::String(text) => text.clone(),
        Value::Object(_) => {
            if node["type"] == "text" {
                return node["text"].as_str().unwrap_or_default().to_string();
            }
            let children: Vec<String> = node["content"]
                .as_array()
                .map(|nodes| nodes.iter().map(adf_to_text).collect())
                .unwrap_or_default();
            match node["type"].as_str() {
                Some("doc") | Some("bulletList") | Some("orderedList") => children.join("\n"),
                Some("listItem") => format!("- {}", children.join("")),
                Some("hardBreak") => "\n".to_string(),
                Some("codeBlock") => children.join("\n"),
                _ => children.join(""),
            }
        }
        _ => String::new(),
    }
}
