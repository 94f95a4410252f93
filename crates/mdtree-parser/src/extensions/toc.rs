use crate::ast::visitor::NodeVisitor;
use crate::config::{ConfigError, TocOptions};
use crate::extensions::Extension;
use crate::node::{Node, NodeKind};
use lazy_static::lazy_static;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

const NAME: &str = "toc";

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("invalid regex expression");
}

/// Heading anchor for a title: trimmed, lowercased, whitespace runs replaced by `-` and the
/// result percent-encoded as a uri component.
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let dashed = WHITESPACE.replace_all(&lowered, "-");
    utf8_percent_encode(&dashed, URI_COMPONENT).to_string()
}

/// Replaces placeholder paragraphs with a nested table of contents and anchors headings.
pub struct TocExtension {
    placeholder: Regex,
    options: TocOptions,
}

impl TocExtension {
    pub fn new(options: &TocOptions) -> Result<Self, ConfigError> {
        let (min, max) = (options.min_level, options.max_level);
        if !(1..=6).contains(&min) || !(1..=6).contains(&max) || min > max {
            return Err(ConfigError::HeadingRange {
                extension: NAME,
                min,
                max,
            });
        }

        let placeholder = RegexBuilder::new(&format!("^(?:{})$", options.placeholder))
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::Pattern {
                extension: NAME,
                source,
            })?;

        if placeholder.is_match("") {
            return Err(ConfigError::Conflict {
                extension: NAME,
                reason: "placeholder matches an empty paragraph".to_string(),
            });
        }

        Ok(TocExtension {
            placeholder,
            options: options.clone(),
        })
    }

    fn is_placeholder(&self, node: &Node) -> bool {
        node.kind == NodeKind::Paragraph
            && node.children.iter().all(only_text)
            && self.placeholder.is_match(node.plain_text().trim())
    }

    fn toc_node(&self, entries: Vec<Entry>) -> Node {
        let mut toc = Node::new(NodeKind::Toc);
        if !self.options.container_class.is_empty() {
            toc.attrs
                .insert("class".into(), self.options.container_class.clone());
        }
        if !entries.is_empty() {
            toc.children.push(self.list(entries));
        }
        toc
    }

    fn list(&self, entries: Vec<Entry>) -> Node {
        Node::new(NodeKind::TocList)
            .with_attr("list-type", self.options.list_type.as_str())
            .with_children(entries.into_iter().map(|e| self.item(e)).collect())
    }

    fn item(&self, entry: Entry) -> Node {
        let mut item = Node::new(NodeKind::TocItem)
            .with_attr("href", format!("#{}", entry.slug))
            .with_content(entry.title);
        if !entry.children.is_empty() {
            item.children.push(self.list(entry.children));
        }
        item
    }
}

/// Text, possibly emphasised. `[[_toc_]]` parses with emphasis inside.
fn only_text(node: &Node) -> bool {
    match node.kind {
        NodeKind::Text => true,
        NodeKind::Emphasis | NodeKind::Strong | NodeKind::Strikethrough => {
            node.children.iter().all(only_text)
        }
        _ => false,
    }
}

impl Extension for TocExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn rewrite(&self, mut nodes: Vec<Node>) -> Vec<Node> {
        let mut anchors = Anchors {
            options: &self.options,
            slugs: HashSet::new(),
            entries: Vec::new(),
        };
        anchors.visit_nodes(&mut nodes);

        let mut roots = Vec::new();
        for entry in anchors.entries {
            insert(&mut roots, entry);
        }

        let toc = self.toc_node(roots);
        Placer {
            ext: self,
            toc: &toc,
        }
        .visit_nodes(&mut nodes);
        nodes
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    level: u8,
    title: String,
    slug: String,
    children: Vec<Entry>,
}

/// Deeper headings nest under the closest preceding shallower one.
fn insert(siblings: &mut Vec<Entry>, entry: Entry) {
    match siblings.last_mut() {
        Some(last) if entry.level > last.level => insert(&mut last.children, entry),
        _ => siblings.push(entry),
    }
}

/// Collects headings in document order, assigning unique slugs.
struct Anchors<'a> {
    options: &'a TocOptions,
    slugs: HashSet<String>,
    entries: Vec<Entry>,
}

impl Anchors<'_> {
    fn unique(&mut self, slug: String) -> String {
        let mut candidate = slug.clone();
        let mut index = self.options.unique_slug_start_index;
        while self.slugs.contains(&candidate) {
            candidate = format!("{slug}-{index}");
            index += 1;
        }
        self.slugs.insert(candidate.clone());
        candidate
    }
}

impl NodeVisitor for Anchors<'_> {
    fn visit_node(&mut self, node: &mut Node) {
        if node.kind != NodeKind::Heading {
            return self.walk_node(node);
        }

        let title = node.plain_text().trim().to_string();
        let slug = match node.attr("id") {
            Some(id) => {
                let id = id.to_string();
                self.slugs.insert(id.clone());
                id
            }
            None => {
                let slug = self.unique(slugify(&title));
                if self.options.anchor_headings {
                    node.attrs.insert("id".into(), slug.clone());
                }
                slug
            }
        };

        let level = node.attr("level").and_then(|l| l.parse::<u8>().ok());
        if let Some(level) = level {
            if (self.options.min_level..=self.options.max_level).contains(&level) {
                self.entries.push(Entry {
                    level,
                    title,
                    slug,
                    children: Vec::new(),
                });
            }
        }
    }
}

struct Placer<'a> {
    ext: &'a TocExtension,
    toc: &'a Node,
}

impl NodeVisitor for Placer<'_> {
    fn visit_nodes(&mut self, nodes: &mut Vec<Node>) {
        for node in nodes.iter_mut() {
            if self.ext.is_placeholder(node) {
                *node = self.toc.clone();
            }
        }
        self.walk_nodes(nodes)
    }

    fn visit_node(&mut self, node: &mut Node) {
        if node.kind != NodeKind::Toc {
            self.walk_node(node)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TocListType;

    fn heading(level: u8, title: &str) -> Node {
        Node::new(NodeKind::Heading)
            .with_attr("level", level.to_string())
            .with_children(vec![Node::text(title)])
    }

    fn placeholder(text: &str) -> Node {
        Node::new(NodeKind::Paragraph).with_children(vec![Node::text(text)])
    }

    fn item(slug: &str, title: &str, children: Vec<Node>) -> Node {
        let item = Node::new(NodeKind::TocItem)
            .with_attr("href", format!("#{slug}"))
            .with_content(title);
        if children.is_empty() {
            item
        } else {
            item.with_children(vec![list(children)])
        }
    }

    fn list(items: Vec<Node>) -> Node {
        Node::new(NodeKind::TocList)
            .with_attr("list-type", "ol")
            .with_children(items)
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  a  b\tc "), "a-b-c");
        assert_eq!(slugify("What's new?"), "what's-new%3F");
        assert_eq!(slugify("Größe"), "gr%C3%B6%C3%9Fe");
    }

    #[test]
    fn nested_toc() {
        let ext = TocExtension::new(&TocOptions::default()).unwrap();
        let nodes = ext.rewrite(vec![
            placeholder("${toc}"),
            heading(1, "A"),
            heading(2, "B"),
            heading(3, "C"),
            heading(2, "D"),
            heading(1, "E"),
        ]);

        let expected = Node::new(NodeKind::Toc)
            .with_attr("class", "table-of-contents")
            .with_children(vec![list(vec![
                item(
                    "a",
                    "A",
                    vec![item("b", "B", vec![item("c", "C", vec![])]), item("d", "D", vec![])],
                ),
                item("e", "E", vec![]),
            ])]);

        assert_eq!(nodes[0], expected);
        assert_eq!(nodes[1].attr("id"), Some("a"));
    }

    #[test]
    fn duplicate_titles() {
        let ext = TocExtension::new(&TocOptions::default()).unwrap();
        let nodes = ext.rewrite(vec![
            heading(2, "Intro"),
            heading(2, "Intro"),
            heading(2, "Intro"),
        ]);

        let ids: Vec<_> = nodes.iter().filter_map(|n| n.attr("id")).collect();
        assert_eq!(ids, vec!["intro", "intro-1", "intro-2"]);
    }

    #[test]
    fn level_range_and_list_type() {
        let ext = TocExtension::new(&TocOptions {
            min_level: 2,
            max_level: 2,
            list_type: TocListType::Ul,
            anchor_headings: false,
            ..Default::default()
        })
        .unwrap();
        let nodes = ext.rewrite(vec![
            heading(1, "Title"),
            heading(2, "Part"),
            heading(3, "Detail"),
            placeholder("[[toc]]"),
        ]);

        assert_eq!(nodes[0].attr("id"), None);
        let toc_list = &nodes[3].children[0];
        assert_eq!(toc_list.attr("list-type"), Some("ul"));
        assert_eq!(toc_list.children.len(), 1);
        assert_eq!(toc_list.children[0].attr("href"), Some("#part"));
    }

    #[test]
    fn placeholder_variants() {
        let ext = TocExtension::new(&TocOptions::default()).unwrap();
        for text in ["${toc}", "[[toc]]", "[toc]", "[[TOC]]"] {
            assert!(ext.is_placeholder(&placeholder(text)), "{text}");
        }
        assert!(!ext.is_placeholder(&placeholder("the ${toc} here")));

        let emphasised = Node::new(NodeKind::Paragraph).with_children(vec![
            Node::text("[["),
            Node::new(NodeKind::Emphasis).with_children(vec![Node::text("toc")]),
            Node::text("]]"),
        ]);
        assert!(ext.is_placeholder(&emphasised));
    }

    #[test]
    fn invalid_options() {
        let range = TocExtension::new(&TocOptions {
            min_level: 3,
            max_level: 2,
            ..Default::default()
        });
        assert!(matches!(range, Err(ConfigError::HeadingRange { min: 3, max: 2, .. })));

        let pattern = TocExtension::new(&TocOptions {
            placeholder: "(".into(),
            ..Default::default()
        });
        assert!(matches!(pattern, Err(ConfigError::Pattern { .. })));

        let empty = TocExtension::new(&TocOptions {
            placeholder: "x*".into(),
            ..Default::default()
        });
        assert!(matches!(empty, Err(ConfigError::Conflict { .. })));
    }
}
