//! Reply formatting
//!
//! Turns a raw assistant reply into a small document model that a front end
//! can render: prose blocks made of classified lines, and fenced code blocks.
//! Only a fixed grammar is recognized (`## ` headings, `**bold**` lines,
//! `` `inline` `` code and ``` fences). Parsing never fails; anything that
//! doesn't match falls back to plain text.

pub mod line;
pub mod segment;

pub use line::{classify, classify_lines, split_inline};
pub use segment::{split, Segment};

/// Language shown for fences that don't name one.
pub const DEFAULT_LANGUAGE: &str = "text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentNode {
    TextBlock { lines: Vec<LineNode> },
    CodeBlock { language: String, code: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineNode {
    Heading { text: String },
    BoldStatement { text: String },
    InlineMixed { parts: Vec<InlinePart> },
    Paragraph { text: String },
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlinePart {
    Plain(String),
    Code(String),
}

/// Format a reply into document nodes, in source order.
pub fn format_message(content: &str) -> Vec<DocumentNode> {
    split(content)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(text) => DocumentNode::TextBlock {
                lines: classify_lines(text),
            },
            Segment::Fenced { language, code } => DocumentNode::CodeBlock {
                language: if language.is_empty() {
                    DEFAULT_LANGUAGE.to_string()
                } else {
                    language.to_string()
                },
                code: code.to_string(),
            },
        })
        .collect()
}

/// The code blocks of a formatted reply, in order. The position in this list
/// is the block ordinal used for copy tracking.
pub fn code_blocks(nodes: &[DocumentNode]) -> impl Iterator<Item = (&str, &str)> {
    nodes.iter().filter_map(|node| match node {
        DocumentNode::CodeBlock { language, code } => Some((language.as_str(), code.as_str())),
        DocumentNode::TextBlock { .. } => None,
    })
}
