//! First conversion stage: splits the raw source into markdown text and spans captured by
//! extensions, then composes a markdown document where every capture is replaced by a marker.

mod scanner;

pub(crate) use scanner::split;

use crate::extensions::{Capture, Placement};

/// Opens a capture marker. Private use characters are never produced by markdown syntax.
pub(crate) const MARKER_OPEN: char = '\u{E000}';
pub(crate) const MARKER_CLOSE: char = '\u{E001}';

/// Hex digits of the input hash that every marker carries.
const KEY_LEN: usize = 16;

#[derive(Debug, PartialEq)]
pub(crate) enum Element<'a> {
    Markdown(&'a str),
    Special {
        capture: Capture,
        /// Indentation of the line a block capture started on.
        indent: &'a str,
        /// The captured source text.
        source: &'a str,
    },
}

/// Markdown source where captures are replaced by markers of the form `<open><key><idx><close>`.
/// The key is derived from the input, so input text cannot spell out a valid marker, whether
/// literally or through character references.
pub(crate) struct ComposedMarkdown {
    pub src: String,
    pub captures: Vec<Capture>,
    /// Source text of each capture, used where a marker ends up in literal content.
    pub sources: Vec<String>,
    key: String,
}

impl From<Vec<Element<'_>>> for ComposedMarkdown {
    fn from(value: Vec<Element<'_>>) -> Self {
        let mut composed = ComposedMarkdown {
            src: String::new(),
            captures: Vec::new(),
            sources: Vec::new(),
            key: input_key(&value),
        };

        for elem in value {
            match elem {
                Element::Markdown(s) => composed.src.push_str(s),
                Element::Special {
                    capture,
                    indent,
                    source,
                } => {
                    let marker = composed.marker(composed.captures.len());
                    let src = &mut composed.src;
                    match capture.placement {
                        Placement::Inline => src.push_str(&marker),
                        Placement::Block => {
                            // Blank lines around the marker make it a paragraph of its own.
                            if !src.is_empty() && !src.ends_with("\n\n") {
                                src.push_str(if src.ends_with('\n') { "\n" } else { "\n\n" });
                            }
                            src.push_str(indent);
                            src.push_str(&marker);
                            src.push_str("\n\n");
                        }
                    }
                    composed.captures.push(capture);
                    composed.sources.push(source.to_string());
                }
            }
        }

        composed
    }
}

fn input_key(elements: &[Element<'_>]) -> String {
    let mut hasher = blake3::Hasher::new();
    for elem in elements {
        match elem {
            Element::Markdown(s) => {
                hasher.update(s.as_bytes());
            }
            Element::Special { indent, source, .. } => {
                hasher.update(indent.as_bytes());
                hasher.update(source.as_bytes());
            }
        }
    }
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..KEY_LEN].to_string()
}

/// A piece of text that may contain markers.
#[derive(Debug, PartialEq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Capture(usize),
}

impl ComposedMarkdown {
    pub(crate) fn marker(&self, idx: usize) -> String {
        format!("{MARKER_OPEN}{}{idx}{MARKER_CLOSE}", self.key)
    }

    /// Splits `text` at the markers of this document. Anything else, including marker characters
    /// with a different key, stays text.
    pub(crate) fn segments<'t>(&self, text: &'t str) -> Vec<Segment<'t>> {
        let open = format!("{MARKER_OPEN}{}", self.key);
        let mut out = Vec::new();
        let mut last = 0;
        let mut from = 0;

        while let Some(found) = text[from..].find(&open) {
            let start = from + found;
            let digits_start = start + open.len();
            let rest = &text[digits_start..];
            let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
            let idx = rest[..digits]
                .parse::<usize>()
                .ok()
                .filter(|_| rest[digits..].starts_with(MARKER_CLOSE));

            match idx {
                Some(idx) => {
                    if start > last {
                        out.push(Segment::Text(&text[last..start]));
                    }
                    out.push(Segment::Capture(idx));
                    last = digits_start + digits + MARKER_CLOSE.len_utf8();
                    from = last;
                }
                None => from = digits_start,
            }
        }

        if last < text.len() {
            out.push(Segment::Text(&text[last..]));
        }
        out
    }

    /// Replaces markers in literal text by the source they were captured from.
    pub(crate) fn restore(&self, text: &str) -> String {
        self.segments(text)
            .into_iter()
            .map(|segment| match segment {
                Segment::Text(s) => s,
                Segment::Capture(idx) => self.sources.get(idx).map_or("", String::as_str),
            })
            .collect()
    }
}
