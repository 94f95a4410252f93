use crate::config::MathDelimiters;
use crate::extensions::{trailing_blank, Capture, Cursor, Extension};
use crate::node::{Node, NodeKind};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DOLLAR_INLINE: Regex =
        Regex::new(r"^\$((?:[^\s\\])|(?:\S.*?[^\s\\]))\$").expect("invalid regex expression");
    static ref DOLLAR_DOUBLE: Regex =
        Regex::new(r"^\$\$([^$]*?[^\\])\$\$").expect("invalid regex expression");
    static ref DOLLAR_EQNO: Regex = Regex::new(r"^\$\$([^$]*?[^\\])\$\$[ \t]*\(([^)\s]+?)\)")
        .expect("invalid regex expression");
    static ref BRACKET_INLINE: Regex =
        Regex::new(r"^\\\((.+?)\\\)").expect("invalid regex expression");
    static ref BRACKET_BLOCK: Regex =
        Regex::new(r"^\\\[([\s\S]+?)\\\]").expect("invalid regex expression");
    static ref BRACKET_EQNO: Regex = Regex::new(r"^\\\[([\s\S]+?)\\\][ \t]*\(([^)\s]+?)\)")
        .expect("invalid regex expression");
    static ref KRAMDOWN_INLINE: Regex =
        Regex::new(r"^\$\$(.+?)\$\$").expect("invalid regex expression");
    static ref KRAMDOWN_BLOCK: Regex =
        Regex::new(r"^\$\$([\s\S]+?)\$\$").expect("invalid regex expression");
    static ref BLANK_LINE: Regex = Regex::new(r"\n[ \t]*\n").expect("invalid regex expression");
}

/// Recognises TeX math between delimiters and emits math nodes holding the raw TeX source.
pub struct MathExtension {
    delimiters: MathDelimiters,
}

impl MathExtension {
    pub fn new(delimiters: MathDelimiters) -> Self {
        MathExtension { delimiters }
    }
}

impl Extension for MathExtension {
    fn name(&self) -> &str {
        "math"
    }

    fn scan(&self, cursor: &Cursor<'_>) -> Option<Capture> {
        match self.delimiters {
            MathDelimiters::Dollars => scan_dollars(cursor),
            MathDelimiters::Brackets => scan_brackets(cursor),
            MathDelimiters::Kramdown => scan_kramdown(cursor),
        }
    }
}

fn scan_dollars(cursor: &Cursor<'_>) -> Option<Capture> {
    let rest = cursor.rest();
    if !rest.starts_with('$') {
        return None;
    }
    // An escaped or price-like dollar never opens math.
    if matches!(cursor.prev_char(), Some(c) if c == '\\' || c.is_ascii_digit()) {
        return None;
    }

    if rest.starts_with("$$") {
        if cursor.at_line_start() {
            if let Some(capture) = display(rest, &DOLLAR_EQNO, &DOLLAR_DOUBLE, true) {
                return Some(capture);
            }
        }
        if let Some(capture) = inline(rest, &DOLLAR_DOUBLE, NodeKind::MathInlineDouble, true) {
            return Some(capture);
        }
    }

    inline(rest, &DOLLAR_INLINE, NodeKind::MathInline, true)
}

fn scan_brackets(cursor: &Cursor<'_>) -> Option<Capture> {
    let rest = cursor.rest();
    if rest.starts_with("\\[") && cursor.at_line_start() {
        display(rest, &BRACKET_EQNO, &BRACKET_BLOCK, false)
    } else if rest.starts_with("\\(") {
        inline(rest, &BRACKET_INLINE, NodeKind::MathInline, false)
    } else {
        None
    }
}

fn scan_kramdown(cursor: &Cursor<'_>) -> Option<Capture> {
    let rest = cursor.rest();
    if !rest.starts_with("$$") {
        return None;
    }
    if cursor.at_line_start() {
        let end = KRAMDOWN_BLOCK.captures(rest).and_then(|caps| {
            let end = caps.get(0)?.end();
            trailing_blank(&rest[end..])?;
            Some((end, caps.get(1)?.as_str()))
        });
        if let Some((end, source)) = end {
            return Some(Capture::block(
                end,
                Node::new(NodeKind::MathBlock).with_content(source),
            ));
        }
    }
    inline(rest, &KRAMDOWN_INLINE, NodeKind::MathInline, false)
}

fn inline(rest: &str, pattern: &Regex, kind: NodeKind, digit_guard: bool) -> Option<Capture> {
    let caps = pattern.captures(rest)?;
    let end = caps.get(0)?.end();
    let source = caps.get(1)?.as_str();

    if BLANK_LINE.is_match(source) || (digit_guard && followed_by_digit(rest, end)) {
        return None;
    }

    Some(Capture::inline(end, Node::new(kind).with_content(source)))
}

/// Display math standing alone on its line(s), optionally followed by an equation number.
fn display(rest: &str, eqno: &Regex, plain: &Regex, digit_guard: bool) -> Option<Capture> {
    if let Some(caps) = eqno.captures(rest) {
        if let (Some(whole), Some(source), Some(label)) = (caps.get(0), caps.get(1), caps.get(2)) {
            if trailing_blank(&rest[whole.end()..]).is_some() {
                return Some(Capture::block(
                    whole.end(),
                    Node::new(NodeKind::MathBlockEqno)
                        .with_attr("eqno", label.as_str())
                        .with_content(source.as_str()),
                ));
            }
        }
    }

    let caps = plain.captures(rest)?;
    let end = caps.get(0)?.end();
    if digit_guard && followed_by_digit(rest, end) {
        return None;
    }
    trailing_blank(&rest[end..])?;

    Some(Capture::block(
        end,
        Node::new(NodeKind::MathBlock).with_content(caps.get(1)?.as_str()),
    ))
}

fn followed_by_digit(rest: &str, end: usize) -> bool {
    rest[end..].chars().next().map_or(false, |c| c.is_ascii_digit())
}
