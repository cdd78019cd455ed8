use crate::ast::*;

/// Visitor pattern for traversing markup immutably
///
/// Default implementations walk the entire tree in document order.
/// Override specific visit_* methods to act on nodes.
pub trait Visitor: Sized {
    fn visit_markup(&mut self, markup: &Markup) {
        walk_markup(self, markup);
    }

    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_text(&mut self, _text: &str) {}

    fn visit_comment(&mut self, _comment: &str) {}
}

/// Mutable visitor for transforming markup in place
pub trait VisitorMut: Sized {
    fn visit_markup_mut(&mut self, markup: &mut Markup) {
        walk_markup_mut(self, markup);
    }

    fn visit_node_mut(&mut self, node: &mut Node) {
        walk_node_mut(self, node);
    }

    fn visit_text_mut(&mut self, _text: &mut String) {}
}

pub fn walk_markup<V: Visitor>(visitor: &mut V, markup: &Markup) {
    walk_children(visitor, &markup.children);
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &Node) {
    walk_children(visitor, &node.children);
}

fn walk_children<V: Visitor>(visitor: &mut V, children: &[Child]) {
    for child in children {
        match child {
            Child::Element(node) => visitor.visit_node(node),
            Child::Text { content } => visitor.visit_text(content),
            Child::Comment { content } => visitor.visit_comment(content),
        }
    }
}

pub fn walk_markup_mut<V: VisitorMut>(visitor: &mut V, markup: &mut Markup) {
    walk_children_mut(visitor, &mut markup.children);
}

pub fn walk_node_mut<V: VisitorMut>(visitor: &mut V, node: &mut Node) {
    walk_children_mut(visitor, &mut node.children);
}

fn walk_children_mut<V: VisitorMut>(visitor: &mut V, children: &mut [Child]) {
    for child in children {
        match child {
            Child::Element(node) => visitor.visit_node_mut(node),
            Child::Text { content } => visitor.visit_text_mut(content),
            Child::Comment { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    struct TagCollector {
        tags: Vec<String>,
    }

    impl Visitor for TagCollector {
        fn visit_node(&mut self, node: &Node) {
            self.tags.push(node.tag.clone());
            walk_node(self, node);
        }
    }

    struct Shouter;

    impl VisitorMut for Shouter {
        fn visit_text_mut(&mut self, text: &mut String) {
            *text = text.to_uppercase();
        }
    }

    #[test]
    fn test_visitor_walks_in_document_order() {
        let markup = parse("<mj-section><mj-column><mj-text>hi</mj-text></mj-column></mj-section>")
            .unwrap();
        let mut collector = TagCollector { tags: vec![] };
        collector.visit_markup(&markup);
        assert_eq!(collector.tags, vec!["mj-section", "mj-column", "mj-text"]);
    }

    #[test]
    fn test_visitor_mut_rewrites_text() {
        let mut markup = parse("<mj-text>hi</mj-text>").unwrap();
        Shouter.visit_markup_mut(&mut markup);
        assert_eq!(crate::serialize(&markup), "<mj-text>HI</mj-text>");
    }
}
