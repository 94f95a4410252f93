//! Node tree assembly: the markdown parse of the composed source, followed by the passes that
//! apply the html policy and put captured nodes back in place of their markers.

pub(crate) mod parser;
pub mod visitor;

use crate::extensions::Placement;
use crate::node::{Node, NodeKind};
use crate::raw::{ComposedMarkdown, Segment, MARKER_OPEN};
use visitor::NodeVisitor;

/// Turns raw html into literal text. Html blocks become paragraphs.
pub(crate) fn html_as_text(nodes: &mut Vec<Node>) {
    HtmlAsText.visit_nodes(nodes)
}

struct HtmlAsText;

impl NodeVisitor for HtmlAsText {
    fn visit_node(&mut self, node: &mut Node) {
        match node.kind {
            NodeKind::HtmlBlock => {
                let text = node.content().unwrap_or_default().trim_end_matches('\n');
                *node = Node::new(NodeKind::Paragraph).with_children(vec![Node::text(text)]);
            }
            NodeKind::HtmlInline => {
                node.kind = NodeKind::Text;
            }
            _ => self.walk_node(node),
        }
    }
}

/// Replaces markers by the nodes captured for them and merges adjacent text.
pub(crate) fn expand(nodes: Vec<Node>, composed: &ComposedMarkdown) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        expand_node(node, composed, &mut out);
    }
    merge_text(out)
}

fn expand_node(mut node: Node, composed: &ComposedMarkdown, out: &mut Vec<Node>) {
    if let Some(block) = block_capture(&node, composed) {
        out.push(block);
        return;
    }

    match node.kind {
        NodeKind::Text => {
            let text = node.content().unwrap_or_default();
            if !text.contains(MARKER_OPEN) {
                out.push(node);
                return;
            }
            for segment in composed.segments(text) {
                match segment {
                    Segment::Text(s) => out.push(Node::text(s)),
                    Segment::Capture(idx) => match composed.captures.get(idx) {
                        Some(capture) => out.push(capture.node.clone()),
                        None => out.push(Node::text(composed.marker(idx))),
                    },
                }
            }
            return;
        }
        // Literal content keeps the captured source.
        NodeKind::CodeBlock | NodeKind::CodeInline | NodeKind::HtmlBlock | NodeKind::HtmlInline => {
            if let Some(content) = node.content().filter(|c| c.contains(MARKER_OPEN)) {
                node.content = Some(composed.restore(content).into());
            }
        }
        _ => {}
    }

    for value in node.attrs.values_mut() {
        if value.contains(MARKER_OPEN) {
            *value = composed.restore(value);
        }
    }

    let children = std::mem::take(&mut node.children);
    node.children = expand(children, composed);
    out.push(node);
}

/// A paragraph that only holds the marker of a block capture.
fn block_capture(node: &Node, composed: &ComposedMarkdown) -> Option<Node> {
    if node.kind != NodeKind::Paragraph {
        return None;
    }
    let [text] = node.children.as_slice() else {
        return None;
    };
    if !text.is_text() {
        return None;
    }

    match composed
        .segments(text.content().unwrap_or_default().trim())
        .as_slice()
    {
        [Segment::Capture(idx)] => composed
            .captures
            .get(*idx)
            .filter(|capture| capture.placement == Placement::Block)
            .map(|capture| capture.node.clone()),
        _ => None,
    }
}

fn merge_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        let merge = node.is_text() && out.last().map_or(false, Node::is_text);
        match out.last_mut() {
            Some(last) if merge => {
                let mut content = last.content().unwrap_or_default().to_string();
                content.push_str(node.content().unwrap_or_default());
                last.content = Some(content.into());
            }
            _ => out.push(node),
        }
    }
    out
}
