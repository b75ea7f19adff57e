use regex::Regex;
use std::sync::OnceLock;

use super::{InlinePart, LineNode};

fn inline_code_pattern() -> &'static Regex {
    static INLINE: OnceLock<Regex> = OnceLock::new();
    INLINE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("inline code pattern is valid"))
}

/// Classify a single line of prose. First match wins: heading, bold
/// statement, inline code, blank, paragraph.
pub fn classify(line: &str) -> LineNode {
    if let Some(rest) = line.strip_prefix("## ") {
        return LineNode::Heading { text: rest.to_string() };
    }

    // Needs four chars so a lone "**" or "***" can't be both delimiters.
    if line.len() >= 4 && line.starts_with("**") && line.ends_with("**") {
        return LineNode::BoldStatement {
            text: line[2..line.len() - 2].to_string(),
        };
    }

    if !line.contains("```") && inline_code_pattern().is_match(line) {
        return LineNode::InlineMixed { parts: split_inline(line) };
    }

    if line.trim().is_empty() {
        return LineNode::Blank;
    }

    LineNode::Paragraph { text: line.to_string() }
}

/// Split a line around backtick spans, alternating plain text and code.
///
/// Plain runs are always emitted on both sides of a span, even when empty, so
/// concatenating the parts (with backticks restored) reproduces the line.
pub fn split_inline(line: &str) -> Vec<InlinePart> {
    let mut parts = Vec::new();
    let mut last = 0;

    for caps in inline_code_pattern().captures_iter(line) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        parts.push(InlinePart::Plain(line[last..whole.start()].to_string()));
        parts.push(InlinePart::Code(code.as_str().to_string()));
        last = whole.end();
    }

    parts.push(InlinePart::Plain(line[last..].to_string()));
    parts
}

/// Classify every line of a text chunk, keeping blank lines in place.
pub fn classify_lines(chunk: &str) -> Vec<LineNode> {
    chunk
        .split('\n')
        .map(|line| classify(line.strip_suffix('\r').unwrap_or(line)))
        .collect()
}
