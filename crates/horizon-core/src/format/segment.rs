use regex::Regex;
use std::sync::OnceLock;

/// A slice of a reply: either prose or the body of a fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Fenced { language: &'a str, code: &'a str },
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    // Opening marker, then an info line only when a newline ends it, lazy body, closing marker.
    // The language is the first word of the info line; the rest of that line is dropped.
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:([^\s`]*)[^\n`]*\n)?(.*?)```").expect("fence pattern is valid")
    })
}

/// Split a reply into alternating text and fenced-code segments.
///
/// A text segment precedes every fence and one follows the last, so a reply
/// with `n` complete fences yields `2n + 1` segments. Text segments may be
/// empty. A fence without a closing marker stays in the surrounding text.
pub fn split(content: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in fence_pattern().captures_iter(content) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let language = caps.get(1).map_or("", |m| m.as_str());
        segments.push(Segment::Text(&content[last..whole.start()]));
        segments.push(Segment::Fenced {
            language,
            code: code.as_str(),
        });
        last = whole.end();
    }

    segments.push(Segment::Text(&content[last..]));
    segments
}
