use crate::ast;
use crate::config::{ConfigError, ParserConfig};
use crate::extensions::{
    BlockImageExtension, Extension, LinkifyExtension, MathExtension, TocExtension,
};
use crate::node::Node;
use crate::raw::{self, ComposedMarkdown};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Converts markdown text to a node tree. Configured once, then shared freely between threads.
pub struct Converter {
    config: ParserConfig,
    extensions: Vec<Box<dyn Extension>>,
}

impl Converter {
    /// A converter with the built-in extensions enabled by `config`.
    pub fn new(config: ParserConfig) -> Result<Self, ConfigError> {
        Converter::builder(config).build()
    }

    pub fn builder(config: ParserConfig) -> ConverterBuilder {
        ConverterBuilder {
            config,
            custom: Vec::new(),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Names of the active extensions in the order their rewrites run.
    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.iter().map(|ext| ext.name()).collect()
    }

    pub fn to_nodes(&self, text: &str) -> Vec<Node> {
        if text.is_empty() {
            return Vec::new();
        }

        let composed = ComposedMarkdown::from(raw::split(text, &self.extensions));
        trace!(
            captures = composed.captures.len(),
            len = text.len(),
            "composed markdown"
        );

        let mut nodes = ast::parser::parse(&composed.src);
        if !self.config.allow_raw_html {
            ast::html_as_text(&mut nodes);
        }
        let nodes = ast::expand(nodes, &composed);

        self.extensions
            .iter()
            .fold(nodes, |nodes, ext| ext.rewrite(nodes))
    }

    /// The node tree as a compact JSON array.
    pub fn to_serialized(&self, text: &str) -> String {
        serde_json::to_string(&self.to_nodes(text)).expect("nodes always serialize to json")
    }
}

/// Reads nodes back from their serialized form.
pub fn from_serialized(serialized: &str) -> Result<Vec<Node>, serde_json::Error> {
    serde_json::from_str(serialized)
}

/// Builds a [Converter] with additional extensions. Custom extensions run after the built-in ones,
/// in registration order.
pub struct ConverterBuilder {
    config: ParserConfig,
    custom: Vec<Box<dyn Extension>>,
}

impl ConverterBuilder {
    pub fn register<E: Extension + 'static>(mut self, extension: E) -> Self {
        self.custom.push(Box::new(extension));
        self
    }

    pub fn build(self) -> Result<Converter, ConfigError> {
        let config = self.config;
        let mut extensions: Vec<Box<dyn Extension>> =
            vec![Box::new(MathExtension::new(config.math_delimiters))];

        if config.auto_link_bare_urls {
            extensions.push(Box::new(LinkifyExtension));
        }
        if config.enable_block_images {
            extensions.push(Box::new(BlockImageExtension::new(&config.block_image)?));
        }
        if config.enable_toc {
            extensions.push(Box::new(TocExtension::new(&config.toc)?));
        }
        extensions.extend(self.custom);
        check_unique(&extensions)?;

        let converter = Converter { config, extensions };
        debug!(
            extensions = ?converter.extension_names(),
            allow_raw_html = converter.config.allow_raw_html,
            "converter configured"
        );
        Ok(converter)
    }
}

fn check_unique(extensions: &[Box<dyn Extension>]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for ext in extensions {
        if !names.insert(ext.name()) {
            return Err(ConfigError::DuplicateExtension(ext.name().to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MathDelimiters;
    use crate::extensions::{Capture, Cursor};
    use crate::node::NodeKind;

    fn converter() -> Converter {
        Converter::new(ParserConfig::default()).unwrap()
    }

    fn paragraph(children: Vec<Node>) -> Node {
        Node::new(NodeKind::Paragraph).with_children(children)
    }

    fn math(kind: NodeKind, tex: &str) -> Node {
        Node::new(kind).with_content(tex)
    }

    #[test]
    fn heading() {
        let nodes = converter().to_nodes("# Title\n");
        assert_eq!(
            nodes,
            vec![Node::new(NodeKind::Heading)
                .with_attr("level", "1")
                .with_attr("id", "title")
                .with_children(vec![Node::text("Title")])]
        );
    }

    #[test]
    fn inline_math() {
        let nodes = converter().to_nodes("$x^2$");
        assert_eq!(
            nodes,
            vec![paragraph(vec![math(NodeKind::MathInline, "x^2")])]
        );
    }

    #[test]
    fn unterminated_math_is_text() {
        let nodes = converter().to_nodes("$x^2");
        assert_eq!(nodes, vec![paragraph(vec![Node::text("$x^2")])]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(converter().to_nodes(""), vec![]);
        assert_eq!(converter().to_serialized(""), "[]");
    }

    #[test]
    fn deterministic() {
        let input = include_str!("../resources/tests/document.md");
        let converter = converter();
        assert_eq!(converter.to_nodes(input), converter.to_nodes(input));
        assert_eq!(converter.to_serialized(input), converter.to_serialized(input));
    }

    #[test]
    fn serialized_round_trip() {
        let input = include_str!("../resources/tests/document.md");
        let converter = converter();
        let back = from_serialized(&converter.to_serialized(input)).unwrap();
        assert_eq!(back, converter.to_nodes(input));
    }

    #[test]
    fn shared_between_threads() {
        let converter = converter();
        let input = include_str!("../resources/tests/document.md");
        let expected = converter.to_serialized(input);

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| converter.to_serialized(input)))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn full_document() {
        let input = include_str!("../resources/tests/document.md");
        let nodes = converter().to_nodes(input);
        let kinds: Vec<_> = nodes.iter().map(|n| n.kind.as_str()).collect();

        assert_eq!(
            kinds,
            vec![
                "heading",
                "toc",
                "paragraph",
                "math-block",
                "math-block-eqno",
                "heading",
                "image-block",
                "code-block",
                "paragraph",
                "heading",
                "html-block",
                "paragraph",
            ]
        );

        assert_eq!(
            nodes[2].children,
            vec![
                Node::text("Euler wrote "),
                math(NodeKind::MathInline, "e^{i\\pi} + 1 = 0"),
                Node::text(" and "),
                math(NodeKind::MathInlineDouble, "\\sum_n n"),
                Node::text(", costing $5 or $10."),
            ]
        );
        assert_eq!(nodes[3], math(NodeKind::MathBlock, "\na^2 + b^2 = c^2\n"));
        assert_eq!(nodes[4].attr("eqno"), Some("1"));
        assert_eq!(nodes[6].attr("src"), Some("figure.png"));
        assert_eq!(nodes[7].content(), Some("$not math$\n"));
        assert_eq!(
            nodes[8].children[1],
            Node::new(NodeKind::Link)
                .with_attr("href", "https://example.org")
                .with_children(vec![Node::text("https://example.org")])
        );
        assert_eq!(nodes[10].content(), Some("<div class=\"note\">$y$</div>\n"));

        let toc_items = &nodes[1].children[0].children;
        assert_eq!(toc_items.len(), 1);
        assert_eq!(toc_items[0].attr("href"), Some("#math"));
        assert_eq!(toc_items[0].children[0].children.len(), 2);
    }

    #[test]
    fn raw_html_disallowed() {
        let converter = Converter::new(ParserConfig {
            allow_raw_html: false,
            ..Default::default()
        })
        .unwrap();

        let nodes = converter.to_nodes("<div>\n$x$\n</div>\n\na <b>b</b>");
        assert_eq!(
            nodes,
            vec![
                paragraph(vec![
                    Node::text("<div>\n"),
                    math(NodeKind::MathInline, "x"),
                    Node::text("\n</div>"),
                ]),
                paragraph(vec![Node::text("a <b>b</b>")]),
            ]
        );
    }

    #[test]
    fn options_disable_extensions() {
        let converter = Converter::new(ParserConfig {
            auto_link_bare_urls: false,
            enable_block_images: false,
            enable_toc: false,
            math_delimiters: MathDelimiters::Brackets,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(converter.extension_names(), vec!["math"]);

        let nodes = converter.to_nodes("# T\n\nwww.example.com \\(x\\) $y$\n\n![a](b.png)\n");
        assert_eq!(nodes[0].attr("id"), None);
        assert_eq!(
            nodes[1].children,
            vec![
                Node::text("www.example.com "),
                math(NodeKind::MathInline, "x"),
                Node::text(" $y$"),
            ]
        );
        assert_eq!(nodes[2].kind, NodeKind::Paragraph);
    }

    struct Mention;

    impl Extension for Mention {
        fn name(&self) -> &str {
            "mention"
        }

        fn scan(&self, cursor: &Cursor<'_>) -> Option<Capture> {
            let rest = cursor.rest().strip_prefix('@')?;
            let len = rest
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(rest.len());
            (len > 0).then(|| {
                Capture::inline(
                    len + 1,
                    Node::new(NodeKind::custom("mention")).with_attr("user", &rest[..len]),
                )
            })
        }
    }

    #[test]
    fn custom_extension() {
        let converter = Converter::builder(ParserConfig {
            auto_link_bare_urls: false,
            ..Default::default()
        })
        .register(Mention)
        .build()
        .unwrap();

        assert_eq!(
            converter.extension_names(),
            vec!["math", "block-image", "toc", "mention"]
        );
        assert_eq!(
            converter.to_nodes("hi @ann!"),
            vec![paragraph(vec![
                Node::text("hi "),
                Node::new(NodeKind::custom("mention")).with_attr("user", "ann"),
                Node::text("!"),
            ])]
        );
    }

    struct Named(&'static str);

    impl Extension for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn duplicate_extension() {
        let result = Converter::builder(ParserConfig::default())
            .register(Named("toc"))
            .build();
        assert!(matches!(result, Err(ConfigError::DuplicateExtension(name)) if name == "toc"));
    }

    #[test]
    fn character_references_stay_text() {
        assert_eq!(
            converter().to_nodes("&#xE000;0&#xE001; and $y$"),
            vec![paragraph(vec![
                Node::text("\u{E000}0\u{E001} and "),
                math(NodeKind::MathInline, "y"),
            ])]
        );
    }

    #[test]
    fn marker_characters_in_code_stay_literal() {
        assert_eq!(
            converter().to_nodes("`\u{E000}0\u{E001}` and $y$"),
            vec![paragraph(vec![
                Node::new(NodeKind::CodeInline).with_content("\u{E000}0\u{E001}"),
                Node::text(" and "),
                math(NodeKind::MathInline, "y"),
            ])]
        );

        let nodes = converter().to_nodes("```\n\u{E000}0\u{E001}\n```\n\n$y$");
        assert_eq!(nodes[0].content(), Some("\u{E000}0\u{E001}\n"));
        assert_eq!(nodes[1], paragraph(vec![math(NodeKind::MathInline, "y")]));
    }

    #[test]
    fn folded_letters_in_addresses() {
        let input = "write abc\u{17F}@example.org or \u{212A}@example.org now";
        assert_eq!(
            converter().to_nodes(input),
            vec![paragraph(vec![Node::text(input)])]
        );
    }

    #[test]
    fn invalid_toc_options() {
        let mut config = ParserConfig::default();
        config.toc.placeholder = "[".into();
        assert!(matches!(
            Converter::new(config),
            Err(ConfigError::Pattern { extension: "toc", .. })
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn fragment() -> impl Strategy<Value = String> {
            prop_oneof![
                "[a-zA-Z0-9 ]{1,6}",
                "\\PC{1,3}",
                "[\u{17F}\u{212A}\u{E000}\u{E001}\u{E9}\u{4E2D}]",
                prop::sample::select(vec![
                    "$", "$$", "\\", "\\(", "\\)", "\\[", "\\]", "`", "```", "~~~", "\n",
                    "\n\n", "    ", "# ", "> ", "- ", "1. ", "*", "_", "~~", "[", "]", "(", ")",
                    "![", "<", ">", "<div>", "</div>", "&#xE000;", "&#57345;", "&amp;", "@", "www.",
                    "https://", ".", "|", "---", "[[toc]]", "(1)",
                ])
                .prop_map(String::from),
            ]
        }

        fn markdown() -> impl Strategy<Value = String> {
            prop::collection::vec(fragment(), 0..32).prop_map(|parts| parts.concat())
        }

        proptest! {
            #[test]
            fn prop_conversion_is_total_and_stable(text in markdown()) {
                let converter = converter();
                let nodes = converter.to_nodes(&text);
                prop_assert_eq!(&converter.to_nodes(&text), &nodes);

                let back = from_serialized(&converter.to_serialized(&text));
                prop_assert!(back.is_ok());
                prop_assert_eq!(back.unwrap(), nodes);
            }

            #[test]
            fn prop_html_as_text_is_total(text in markdown()) {
                let converter = Converter::new(ParserConfig {
                    allow_raw_html: false,
                    math_delimiters: MathDelimiters::Kramdown,
                    ..Default::default()
                })
                .unwrap();
                let nodes = converter.to_nodes(&text);
                let back = from_serialized(&converter.to_serialized(&text)).unwrap();
                prop_assert_eq!(back, nodes);
            }
        }
    }
}
