use crate::node::Node;

/// Implements the visitor pattern for node trees. Blanket implementations are provided so
/// implementors only have to implement the methods they need to modify.
pub trait NodeVisitor {
    fn walk_nodes(&mut self, nodes: &mut Vec<Node>) {
        nodes.iter_mut().for_each(|node| self.visit_node(node))
    }

    fn walk_node(&mut self, node: &mut Node) {
        self.visit_nodes(&mut node.children)
    }

    /// Called for every list of siblings, including the top level. Implementors may replace
    /// elements before walking into them.
    fn visit_nodes(&mut self, nodes: &mut Vec<Node>) {
        self.walk_nodes(nodes)
    }

    fn visit_node(&mut self, node: &mut Node) {
        self.walk_node(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    struct CountText(usize);

    impl NodeVisitor for CountText {
        fn visit_node(&mut self, node: &mut Node) {
            if node.is_text() {
                self.0 += 1;
            }
            self.walk_node(node)
        }
    }

    #[test]
    fn visits_nested_nodes() {
        let mut nodes = vec![
            Node::new(NodeKind::Paragraph).with_children(vec![
                Node::text("a"),
                Node::new(NodeKind::Emphasis).with_children(vec![Node::text("b")]),
            ]),
            Node::text("c"),
        ];

        let mut counter = CountText(0);
        counter.visit_nodes(&mut nodes);
        assert_eq!(counter.0, 3);
    }
}
