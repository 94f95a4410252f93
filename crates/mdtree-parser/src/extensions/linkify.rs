use crate::ast::visitor::NodeVisitor;
use crate::extensions::Extension;
use crate::node::{Node, NodeKind};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BARE_LINK: Regex = Regex::new(
        r"\b(?:(?i-u:https?|ftp)://|(?i-u:www)\.)[^\s<>]+|\b[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}\b"
    )
    .expect("invalid regex expression");
}

/// Turns bare urls and e-mail addresses in text into link nodes.
#[derive(Default)]
pub struct LinkifyExtension;

impl Extension for LinkifyExtension {
    fn name(&self) -> &str {
        "linkify"
    }

    fn rewrite(&self, mut nodes: Vec<Node>) -> Vec<Node> {
        Linkifier.visit_nodes(&mut nodes);
        nodes
    }
}

struct Linkifier;

impl NodeVisitor for Linkifier {
    fn visit_node(&mut self, node: &mut Node) {
        // Link text and image alt text are already inside a link.
        if !matches!(node.kind, NodeKind::Link | NodeKind::Image) {
            self.walk_node(node)
        }
    }

    fn visit_nodes(&mut self, nodes: &mut Vec<Node>) {
        if nodes.iter().any(Node::is_text) {
            *nodes = std::mem::take(nodes)
                .into_iter()
                .flat_map(split_links)
                .collect();
        }
        self.walk_nodes(nodes)
    }
}

fn split_links(node: Node) -> Vec<Node> {
    let text = match node.content.clone() {
        Some(text) if node.is_text() => text,
        _ => return vec![node],
    };

    let mut out = Vec::new();
    let mut last = 0;

    for found in BARE_LINK.find_iter(&text) {
        let url = trim_trailing(found.as_str());
        let Some(href) = href_for(url) else {
            continue;
        };

        if found.start() > last {
            out.push(Node::text(&text[last..found.start()]));
        }
        out.push(
            Node::new(NodeKind::Link)
                .with_attr("href", href)
                .with_children(vec![Node::text(url)]),
        );
        last = found.start() + url.len();
    }

    if out.is_empty() {
        return vec![node];
    }
    if last < text.len() {
        out.push(Node::text(&text[last..]));
    }
    out
}

/// Drops sentence punctuation and unbalanced closing parentheses from the end of a url.
fn trim_trailing(url: &str) -> &str {
    let mut end = url.len();
    loop {
        let current = &url[..end];
        match current.chars().next_back() {
            Some(c) if ".,:;!?'\"*_~".contains(c) => end -= c.len_utf8(),
            Some(')') if current.matches(')').count() > current.matches('(').count() => end -= 1,
            _ => return current,
        }
    }
}

fn href_for(url: &str) -> Option<String> {
    let www = url.get(..4).map_or(false, |p| p.eq_ignore_ascii_case("www."));
    if let Some((_, host)) = url.split_once("://") {
        (!host.is_empty()).then(|| url.to_string())
    } else if www && url.len() > 4 {
        url[4..].contains('.').then(|| format!("http://{url}"))
    } else if url.contains('@') {
        Some(format!("mailto:{url}"))
    } else {
        None
    }
}
