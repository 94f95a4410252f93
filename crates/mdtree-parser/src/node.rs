use cowstr::CowStr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! node_kinds {
    ($($(#[$meta:meta])* $variant:ident => $tag:literal,)*) => {
        /// The syntactic role of a [Node]. Serialized as its tag string.
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum NodeKind {
            $($(#[$meta])* $variant,)*
            /// Emitted by an extension registered outside this crate.
            Custom(String),
        }

        impl NodeKind {
            pub fn as_str(&self) -> &str {
                match self {
                    $(NodeKind::$variant => $tag,)*
                    NodeKind::Custom(tag) => tag,
                }
            }
        }

        impl From<String> for NodeKind {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $($tag => NodeKind::$variant,)*
                    _ => NodeKind::Custom(value),
                }
            }
        }
    };
}

node_kinds! {
    Heading => "heading",
    Paragraph => "paragraph",
    BlockQuote => "blockquote",
    BulletList => "bullet-list",
    OrderedList => "ordered-list",
    ListItem => "list-item",
    /// Fenced or indented code. The fence info string is kept in the `info` attribute.
    CodeBlock => "code-block",
    /// Unescaped html. Only produced when raw html is allowed.
    HtmlBlock => "html-block",
    ThematicBreak => "hr",
    Table => "table",
    TableHead => "table-head",
    TableRow => "table-row",
    TableCell => "table-cell",
    FootnoteDefinition => "footnote-definition",
    Text => "text",
    CodeInline => "code-inline",
    Emphasis => "em",
    Strong => "strong",
    Strikethrough => "strikethrough",
    Link => "link",
    Image => "image",
    HtmlInline => "html-inline",
    SoftBreak => "softbreak",
    HardBreak => "hardbreak",
    FootnoteReference => "footnote-reference",
    TaskListMarker => "task-list-marker",
    MathInline => "math-inline",
    /// `$$...$$` written inside a paragraph.
    MathInlineDouble => "math-inline-double",
    MathBlock => "math-block",
    /// Display math followed by an equation number, kept in the `eqno` attribute.
    MathBlockEqno => "math-block-eqno",
    /// A paragraph that only held an image.
    ImageBlock => "image-block",
    Toc => "toc",
    TocList => "toc-list",
    TocItem => "toc-item",
}

impl NodeKind {
    /// Creates a kind for a custom extension. Tags that collide with a built-in kind resolve to it.
    pub fn custom<S: Into<String>>(tag: S) -> Self {
        NodeKind::from(tag.into())
    }
}

impl From<NodeKind> for String {
    fn from(value: NodeKind) -> Self {
        match value {
            NodeKind::Custom(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural or inline unit of a parsed document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    /// Raw text for leaf nodes (text, code, math, html).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CowStr>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            attrs: BTreeMap::new(),
            children: Vec::new(),
            content: None,
        }
    }

    pub fn text<C: Into<CowStr>>(content: C) -> Self {
        Node::new(NodeKind::Text).with_content(content)
    }

    pub fn with_attr<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn with_content<C: Into<CowStr>>(mut self, content: C) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// True for text nodes that only contain whitespace.
    pub fn is_blank_text(&self) -> bool {
        self.is_text() && self.content().map_or(true, |c| c.trim().is_empty())
    }

    /// The plain text of this node and its descendants. Only text and inline code count, math and
    /// html are skipped.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_plain_text(&mut out);
        out
    }

    fn collect_plain_text(&self, out: &mut String) {
        match self.kind {
            NodeKind::Text | NodeKind::CodeInline => out.push_str(self.content().unwrap_or_default()),
            NodeKind::SoftBreak | NodeKind::HardBreak => out.push(' '),
            _ => self
                .children
                .iter()
                .for_each(|child| child.collect_plain_text(out)),
        }
    }
}
