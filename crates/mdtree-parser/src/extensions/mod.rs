//! Syntax extensions layered on top of the CommonMark parser.
//!
//! An extension takes part in conversion in two places. While the raw source is split, [Extension::scan]
//! may capture a span of source text and turn it into a node before the markdown parser sees it
//! (this keeps markdown syntax inside math from being interpreted). After the node tree is built,
//! [Extension::rewrite] may transform it. Both have no-op defaults so implementors only write the
//! hook they need.

pub mod block_image;
pub mod linkify;
pub mod math;
pub mod toc;

use crate::node::Node;

pub use block_image::BlockImageExtension;
pub use linkify::LinkifyExtension;
pub use math::MathExtension;
pub use toc::TocExtension;

pub trait Extension: Send + Sync {
    /// Unique name of the extension within a converter.
    fn name(&self) -> &str;

    /// Tries to recognise extension syntax at the cursor position. Only called outside code.
    fn scan(&self, _cursor: &Cursor<'_>) -> Option<Capture> {
        None
    }

    /// Transforms the assembled node tree.
    fn rewrite(&self, nodes: Vec<Node>) -> Vec<Node> {
        nodes
    }
}

/// Where a captured node goes in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Inline,
    /// The node stands on its own, outside any paragraph. Only honoured when captured at the
    /// start of a line and followed by nothing but whitespace on its last line.
    Block,
}

/// A span of source replaced by a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Length of the captured source in bytes.
    pub len: usize,
    pub node: Node,
    pub placement: Placement,
}

impl Capture {
    pub fn inline(len: usize, node: Node) -> Self {
        Capture {
            len,
            node,
            placement: Placement::Inline,
        }
    }

    pub fn block(len: usize, node: Node) -> Self {
        Capture {
            len,
            node,
            placement: Placement::Block,
        }
    }
}

/// A position in the source being split.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line_start: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str, pos: usize, line_start: bool) -> Self {
        Cursor {
            src,
            pos,
            line_start,
        }
    }

    /// Source text from the cursor to the end of input.
    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn prev_char(&self) -> Option<char> {
        self.src[..self.pos].chars().next_back()
    }

    /// True when only indentation (at most three spaces) precedes the cursor on its line, so block
    /// syntax may start here.
    pub fn at_line_start(&self) -> bool {
        self.line_start
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Length of the remainder of the line starting at `rest`, when it holds only whitespace.
pub(crate) fn trailing_blank(rest: &str) -> Option<usize> {
    let end = rest.find('\n').map_or(rest.len(), |i| i + 1);
    rest[..end].trim().is_empty().then_some(end)
}
