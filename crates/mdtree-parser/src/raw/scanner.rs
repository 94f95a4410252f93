use crate::extensions::{trailing_blank, Capture, Cursor, Extension, Placement};
use crate::raw::Element;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BLANK_LINE: Regex = Regex::new(r"\n[ \t]*\n").expect("invalid regex expression");
    static ref HTML_TAG: Regex = Regex::new(concat!(
        r#"^(?:<[A-Za-z][A-Za-z0-9-]*(?:\s+[A-Za-z_:][A-Za-z0-9_.:-]*(?:\s*=\s*(?:[^\s"'=<>`]+|'[^']*'|"[^"]*"))?)*\s*/?>"#,
        r"|</[A-Za-z][A-Za-z0-9-]*\s*>",
        r"|<!--[\s\S]*?-->",
        r"|<\?[\s\S]*?\?>",
        r"|<![A-Za-z][^>]*>",
        r"|<!\[CDATA\[[\s\S]*?\]\]>)",
    ))
    .expect("invalid regex expression");
    static ref AUTOLINK: Regex = Regex::new(
        r"^<(?:[A-Za-z][A-Za-z0-9.+-]{1,31}:[^\s<>]*|[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*)>"
    )
    .expect("invalid regex expression");
    static ref LINK_DEFINITION: Regex =
        Regex::new(r"^\[[^\]]+\]:(?:\s|$)").expect("invalid regex expression");
    static ref LIST_MARKER: Regex =
        Regex::new(r"^(?:[-+*]|[0-9]{1,9}[.)])(?:[ \t]|$)").expect("invalid regex expression");
}

/// Splits `src` into markdown text and extension captures. Code, escapes, html tags, autolinks
/// and link destinations are passed through as markdown without asking the extensions.
pub(crate) fn split<'a>(src: &'a str, extensions: &[Box<dyn Extension>]) -> Vec<Element<'a>> {
    let mut scanner = Scanner {
        src,
        pos: 0,
        plain_start: 0,
        elements: Vec::new(),
        extensions,
        prev_blank: true,
        list_context: false,
    };
    scanner.run();
    scanner.elements
}

struct Scanner<'a, 'e> {
    src: &'a str,
    pos: usize,
    /// Start of the markdown text not yet pushed to `elements`.
    plain_start: usize,
    elements: Vec<Element<'a>>,
    extensions: &'e [Box<dyn Extension>],
    prev_blank: bool,
    /// Set after a list item marker until an unindented line follows a blank line. Indentation
    /// inside list items belongs to the item, not to an indented code block.
    list_context: bool,
}

impl<'a> Scanner<'a, '_> {
    fn run(&mut self) {
        while self.pos < self.src.len() {
            if self.at_line_start() && self.line_start() {
                continue;
            }
            if !self.inline() {
                self.bump();
            }
        }
        self.flush(self.src.len());
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.src.as_bytes()[self.pos - 1] == b'\n'
    }

    fn bump(&mut self) {
        self.pos += self.src[self.pos..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
    }

    fn flush(&mut self, until: usize) {
        if until > self.plain_start {
            self.elements
                .push(Element::Markdown(&self.src[self.plain_start..until]));
        }
        self.plain_start = until;
    }

    /// Handles block level constructs. Returns true when input was consumed.
    fn line_start(&mut self) -> bool {
        let src = self.src;
        let line_end = eol(src, self.pos);
        let line = &src[self.pos..line_end];

        if line.trim().is_empty() {
            self.prev_blank = true;
            return false;
        }
        let prev_blank = std::mem::replace(&mut self.prev_blank, false);

        let (quoted, quote_bytes) = strip_quotes(line);
        let (cols, indent_bytes) = indentation(quoted);
        let content = &quoted[indent_bytes..];
        let in_quote = quote_bytes > 0;

        if !in_quote {
            if cols <= 3 && LIST_MARKER.is_match(content) {
                self.list_context = true;
            } else if cols == 0 && prev_blank {
                self.list_context = false;
            }
        }

        if !in_quote && cols >= 4 && prev_blank && !self.list_context {
            self.skip_indented_code();
            return true;
        }

        if cols <= 3 || self.list_context {
            let fence_start = self.pos + quote_bytes + indent_bytes;
            if let Some(end) = fence_end(src, fence_start, self.list_context) {
                self.pos = end;
                return true;
            }
        }

        if cols <= 3 && LINK_DEFINITION.is_match(content) {
            self.pos = line_end;
            return true;
        }

        if cols <= 3 && !in_quote {
            let at = self.pos + indent_bytes;
            if let Some(capture) = self.capture_at(at, true) {
                self.push_capture(self.pos, at, capture);
                return true;
            }
        }

        false
    }

    fn skip_indented_code(&mut self) {
        let src = self.src;
        while self.pos < src.len() {
            let end = eol(src, self.pos);
            let line = &src[self.pos..end];
            let blank = line.trim().is_empty();
            if !blank && indentation(line).0 < 4 {
                break;
            }
            self.prev_blank = blank;
            self.pos = next_line(src, end);
        }
    }

    /// Handles inline constructs. Returns true when input was consumed.
    fn inline(&mut self) -> bool {
        let src = self.src;
        let rest = &src[self.pos..];
        let Some(c) = rest.chars().next() else {
            return false;
        };

        if let Some(capture) = self.capture_at(self.pos, false) {
            self.push_capture(self.pos, self.pos, capture);
            return true;
        }

        match c {
            '`' => {
                self.pos = code_span_end(src, self.pos);
                true
            }
            '\\' if rest[1..].starts_with(|n: char| n.is_ascii_punctuation()) => {
                self.pos += 2;
                true
            }
            '<' => match AUTOLINK.find(rest).or_else(|| HTML_TAG.find(rest)) {
                Some(found) => {
                    self.pos += found.end();
                    true
                }
                None => false,
            },
            ']' if rest[1..].starts_with('(') => {
                self.pos = destination_end(src, self.pos + 1);
                true
            }
            _ => false,
        }
    }

    fn capture_at(&self, at: usize, line_start: bool) -> Option<Capture> {
        let cursor = Cursor::new(self.src, at, line_start);
        self.extensions
            .iter()
            .find_map(|ext| ext.scan(&cursor))
            .filter(|capture| capture.len > 0 && self.src.is_char_boundary(at + capture.len))
    }

    /// Records a capture starting at `at`. Block captures additionally swallow the rest of their
    /// last line, and the indentation between `line_begin` and `at` moves with the marker.
    fn push_capture(&mut self, line_begin: usize, at: usize, mut capture: Capture) {
        let src = self.src;
        let end = at + capture.len;

        if capture.placement == Placement::Block {
            match trailing_blank(&src[end..]) {
                Some(tail) if line_begin < at || self.at_line_start() => {
                    self.flush(line_begin);
                    self.elements.push(Element::Special {
                        capture,
                        indent: &src[line_begin..at],
                        source: &src[at..end],
                    });
                    self.pos = end + tail;
                    self.plain_start = self.pos;
                    return;
                }
                _ => capture.placement = Placement::Inline,
            }
        }

        self.flush(at);
        self.elements.push(Element::Special {
            capture,
            indent: "",
            source: &src[at..end],
        });
        self.pos = end;
        self.plain_start = end;
    }
}

fn eol(src: &str, from: usize) -> usize {
    src[from..].find('\n').map_or(src.len(), |i| from + i)
}

fn next_line(src: &str, eol: usize) -> usize {
    (eol + 1).min(src.len())
}

/// Columns and bytes of leading indentation, tabs advancing to the next multiple of four.
fn indentation(line: &str) -> (usize, usize) {
    let mut cols = 0;
    let mut bytes = 0;
    for c in line.chars() {
        match c {
            ' ' => cols += 1,
            '\t' => cols += 4 - cols % 4,
            _ => break,
        }
        bytes += 1;
    }
    (cols, bytes)
}

/// Strips blockquote markers, returning the remaining line and the number of bytes removed.
fn strip_quotes(line: &str) -> (&str, usize) {
    let mut rest = line;
    loop {
        let (cols, bytes) = indentation(rest);
        if cols > 3 || !rest[bytes..].starts_with('>') {
            return (rest, line.len() - rest.len());
        }
        rest = &rest[bytes + 1..];
        rest = rest.strip_prefix(' ').unwrap_or(rest);
    }
}

/// End of a fenced code block opening at `start`, or `None` when no fence opens there. An
/// unclosed fence runs to the end of the input.
fn fence_end(src: &str, start: usize, lenient: bool) -> Option<usize> {
    let line_end = eol(src, start);
    let line = &src[start..line_end];
    let fence = line.chars().next().filter(|&c| c == '`' || c == '~')?;
    let run = line.chars().take_while(|&c| c == fence).count();
    if run < 3 || (fence == '`' && line[run..].contains('`')) {
        return None;
    }

    let mut pos = next_line(src, line_end);
    while pos < src.len() {
        let end = eol(src, pos);
        let (quoted, _) = strip_quotes(&src[pos..end]);
        let (cols, bytes) = indentation(quoted);
        let content = &quoted[bytes..];
        let close = content.chars().take_while(|&c| c == fence).count();
        if (cols <= 3 || lenient) && close >= run && content[close..].trim().is_empty() {
            return Some(next_line(src, end));
        }
        pos = next_line(src, end);
    }
    Some(src.len())
}

/// End of a code span opening at `start`. A backtick run without a matching closing run is
/// literal text.
fn code_span_end(src: &str, start: usize) -> usize {
    let run = count_backticks(&src[start..]);
    let open_end = start + run;
    let limit = BLANK_LINE
        .find(&src[open_end..])
        .map_or(src.len(), |m| open_end + m.start());

    let mut pos = open_end;
    while let Some(offset) = src[pos..limit].find('`') {
        let close = pos + offset;
        let len = count_backticks(&src[close..limit]);
        if len == run {
            return close + len;
        }
        pos = close + len;
    }
    open_end
}

fn count_backticks(s: &str) -> usize {
    s.bytes().take_while(|&b| b == b'`').count()
}

/// End of an inline link destination whose `(` is at `open`.
fn destination_end(src: &str, open: usize) -> usize {
    let limit = BLANK_LINE
        .find(&src[open..])
        .map_or(src.len(), |m| open + m.start());

    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in src[open..limit].char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return open + i + 1;
                }
            }
            _ => {}
        }
    }
    open + 1
}
