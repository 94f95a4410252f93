use crate::ast::visitor::NodeVisitor;
use crate::config::{BlockImageOptions, ConfigError};
use crate::extensions::Extension;
use crate::node::{Node, NodeKind};

const NAME: &str = "block-image";

/// Promotes a paragraph holding nothing but one image to a standalone `image-block` node.
pub struct BlockImageExtension {
    container: Option<String>,
    container_class: Option<String>,
}

impl BlockImageExtension {
    pub fn new(options: &BlockImageOptions) -> Result<Self, ConfigError> {
        match (&options.container, &options.container_class) {
            (None, Some(_)) => Err(ConfigError::Conflict {
                extension: NAME,
                reason: "container_class is set without a container".to_string(),
            }),
            (Some(container), _) if !is_element_name(container) => Err(ConfigError::Conflict {
                extension: NAME,
                reason: format!("`{container}` is not an element name"),
            }),
            _ => Ok(BlockImageExtension {
                container: options.container.clone(),
                container_class: options.container_class.clone(),
            }),
        }
    }

    fn promote(&self, paragraph: &Node) -> Option<Node> {
        if paragraph.kind != NodeKind::Paragraph {
            return None;
        }

        let mut content = paragraph.children.iter().filter(|c| !c.is_blank_text());
        let image = content.next().filter(|c| c.kind == NodeKind::Image)?;
        if content.next().is_some() {
            return None;
        }

        let mut block = Node::new(NodeKind::ImageBlock);
        block.attrs = image.attrs.clone();
        if let Some(container) = &self.container {
            block.attrs.insert("container".into(), container.clone());
        }
        if let Some(class) = &self.container_class {
            block.attrs.insert("class".into(), class.clone());
        }
        Some(block)
    }
}

fn is_element_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl Extension for BlockImageExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn rewrite(&self, mut nodes: Vec<Node>) -> Vec<Node> {
        Promoter(self).visit_nodes(&mut nodes);
        nodes
    }
}

struct Promoter<'a>(&'a BlockImageExtension);

impl NodeVisitor for Promoter<'_> {
    fn visit_nodes(&mut self, nodes: &mut Vec<Node>) {
        for node in nodes.iter_mut() {
            if let Some(block) = self.0.promote(node) {
                *node = block;
            }
        }
        self.walk_nodes(nodes)
    }
}
