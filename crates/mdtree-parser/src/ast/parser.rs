use crate::node::{Node, NodeKind};
use pulldown_cmark::{
    Alignment, CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser as MdParser, Tag,
};

/// Parses composed markdown into a node tree. Text events are merged as they arrive, markers are
/// left in place.
pub(crate) fn parse(src: &str) -> Vec<Node> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    // Html block lines then always end with a newline, which is what tells them apart from
    // inline html.
    let owned;
    let src = if src.is_empty() || src.ends_with('\n') {
        src
    } else {
        owned = format!("{src}\n");
        &owned
    };

    let mut builder = Builder::default();
    for event in MdParser::new_ext(src, options) {
        builder.event(event);
    }
    builder.finish()
}

#[derive(Default)]
struct Builder {
    /// Finished top level nodes.
    root: Vec<Node>,
    /// Nodes whose end event has not been seen yet.
    open: Vec<Node>,
    alignments: Vec<Alignment>,
    cell: usize,
    /// The last event was a line of an html block.
    in_html_block: bool,
}

impl Builder {
    fn event(&mut self, event: Event<'_>) {
        let html_line = matches!(&event, Event::Html(_));
        match event {
            Event::Start(tag) => {
                let node = self.start(tag);
                self.open.push(node);
            }
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.top_kind() == Some(&NodeKind::CodeBlock) {
                    if let Some(code) = self.open.last_mut() {
                        append(code, &text);
                    }
                } else {
                    self.push_text(&text);
                }
            }
            Event::Code(code) => {
                self.push(Node::new(NodeKind::CodeInline).with_content(&*code))
            }
            Event::Html(html) => self.html(&html),
            Event::FootnoteReference(label) => self.push(
                Node::new(NodeKind::FootnoteReference).with_attr("label", &*label),
            ),
            Event::SoftBreak => self.push(Node::new(NodeKind::SoftBreak)),
            Event::HardBreak => self.push(Node::new(NodeKind::HardBreak)),
            Event::Rule => self.push(Node::new(NodeKind::ThematicBreak)),
            Event::TaskListMarker(checked) => self.push(
                Node::new(NodeKind::TaskListMarker).with_attr("checked", checked.to_string()),
            ),
        }
        if !html_line {
            self.in_html_block = false;
        }
    }

    fn start(&mut self, tag: Tag<'_>) -> Node {
        match tag {
            Tag::Paragraph => Node::new(NodeKind::Paragraph),
            Tag::Heading(level, id, classes) => {
                let mut node =
                    Node::new(NodeKind::Heading).with_attr("level", heading_level(level).to_string());
                if let Some(id) = id {
                    node.attrs.insert("id".into(), id.to_string());
                }
                if !classes.is_empty() {
                    node.attrs.insert("class".into(), classes.join(" "));
                }
                node
            }
            Tag::BlockQuote => Node::new(NodeKind::BlockQuote),
            Tag::CodeBlock(kind) => {
                let node = Node::new(NodeKind::CodeBlock).with_content("");
                match kind {
                    CodeBlockKind::Fenced(info) if !info.trim().is_empty() => {
                        node.with_attr("info", info.trim())
                    }
                    _ => node,
                }
            }
            Tag::List(Some(start)) => {
                Node::new(NodeKind::OrderedList).with_attr("start", start.to_string())
            }
            Tag::List(None) => Node::new(NodeKind::BulletList),
            Tag::Item => Node::new(NodeKind::ListItem),
            Tag::FootnoteDefinition(label) => {
                Node::new(NodeKind::FootnoteDefinition).with_attr("label", &*label)
            }
            Tag::Table(alignments) => {
                self.alignments = alignments;
                Node::new(NodeKind::Table)
            }
            Tag::TableHead => {
                self.cell = 0;
                Node::new(NodeKind::TableHead)
            }
            Tag::TableRow => {
                self.cell = 0;
                Node::new(NodeKind::TableRow)
            }
            Tag::TableCell => {
                let node = Node::new(NodeKind::TableCell);
                let align = self.alignments.get(self.cell).and_then(alignment_name);
                self.cell += 1;
                match align {
                    Some(align) => node.with_attr("align", align),
                    None => node,
                }
            }
            Tag::Emphasis => Node::new(NodeKind::Emphasis),
            Tag::Strong => Node::new(NodeKind::Strong),
            Tag::Strikethrough => Node::new(NodeKind::Strikethrough),
            Tag::Link(link_type, url, title) => {
                let href = match link_type {
                    LinkType::Email => format!("mailto:{url}"),
                    _ => url.to_string(),
                };
                with_title(Node::new(NodeKind::Link).with_attr("href", href), &title)
            }
            Tag::Image(_, url, title) => {
                with_title(Node::new(NodeKind::Image).with_attr("src", &*url), &title)
            }
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        let Some(mut node) = self.open.pop() else {
            return;
        };
        match tag {
            Tag::Image(..) => {
                let alt = node.plain_text();
                node.attrs.insert("alt".into(), alt);
            }
            Tag::Table(_) => self.alignments.clear(),
            _ => {}
        }
        self.push(node);
    }

    fn html(&mut self, html: &str) {
        let block = html.ends_with('\n') && self.block_context();
        if !block {
            self.push(Node::new(NodeKind::HtmlInline).with_content(html));
            self.in_html_block = false;
            return;
        }

        let continued = self.in_html_block
            && self.siblings().last().map(|n| &n.kind) == Some(&NodeKind::HtmlBlock);
        if continued {
            if let Some(last) = self.siblings().last_mut() {
                append(last, html);
            }
        } else {
            self.push(Node::new(NodeKind::HtmlBlock).with_content(html));
        }
        self.in_html_block = true;
    }

    fn block_context(&self) -> bool {
        matches!(
            self.top_kind(),
            None | Some(NodeKind::BlockQuote | NodeKind::ListItem | NodeKind::FootnoteDefinition)
        )
    }

    fn top_kind(&self) -> Option<&NodeKind> {
        self.open.last().map(|node| &node.kind)
    }

    fn siblings(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        }
    }

    fn push(&mut self, node: Node) {
        self.siblings().push(node)
    }

    fn push_text(&mut self, text: &str) {
        let siblings = self.siblings();
        if siblings.last().map_or(false, Node::is_text) {
            if let Some(last) = siblings.last_mut() {
                append(last, text);
            }
        } else {
            siblings.push(Node::text(text));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        // Only reachable with unbalanced events.
        while let Some(node) = self.open.pop() {
            self.push(node);
        }
        self.root
    }
}

fn append(node: &mut Node, text: &str) {
    let mut content = node.content().unwrap_or_default().to_string();
    content.push_str(text);
    node.content = Some(content.into());
}

fn with_title(node: Node, title: &str) -> Node {
    if title.is_empty() {
        node
    } else {
        node.with_attr("title", title)
    }
}

fn alignment_name(alignment: &Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some("left"),
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
    }
}

fn heading_level(value: HeadingLevel) -> u8 {
    match value {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
