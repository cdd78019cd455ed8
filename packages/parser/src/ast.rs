use serde::{Deserialize, Serialize};

/// Session-scoped node identifier. Never serialized into markup.
pub type NodeId = String;

/// Root of a parsed template
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Markup {
    pub children: Vec<Child>,
}

/// Child of an element or of the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Child {
    Element(Node),
    Text { content: String },
    Comment { content: String },
}

/// How an element was closed in source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Closing {
    /// `<tag>...</tag>`
    Pair,
    /// `<tag />`
    SelfClosing,
    /// HTML void element such as `<br>`
    Void,
}

/// Element node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub tag: String,
    pub attributes: Attributes,
    pub children: Vec<Child>,
    pub closing: Closing,
}

/// Single attribute. `value` is `None` for boolean attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

/// Ordered attribute list. Names are unique; setting an existing name
/// replaces its value in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|a| a.name == name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = Some(value.into());
        match self.0.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(Attribute { name, value }),
        }
    }

    pub fn set_flag(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.0.push(Attribute { name, value: None });
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let pos = self.0.iter().position(|a| a.name == name)?;
        Some(self.0.remove(pos))
    }

    /// Keep only the attributes `keep` accepts, preserving order
    pub fn retain(&mut self, keep: impl FnMut(&Attribute) -> bool) {
        self.0.retain(keep);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attribute> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}

impl Child {
    pub fn text(content: impl Into<String>) -> Self {
        Child::Text {
            content: content.into(),
        }
    }

    pub fn as_element(&self) -> Option<&Node> {
        match self {
            Child::Element(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Node> {
        match self {
            Child::Element(node) => Some(node),
            _ => None,
        }
    }
}

impl Node {
    pub fn new(id: impl Into<NodeId>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
            closing: Closing::Pair,
        }
    }

    /// Iterate over element children, skipping text and comments
    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(Child::as_element)
    }

    /// Concatenated text of direct text children
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                Child::Text { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.elements().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .filter_map(Child::as_element_mut)
            .find_map(|child| child.find_mut(id))
    }

    /// Number of element descendants including self
    pub fn node_count(&self) -> usize {
        1 + self.elements().map(Node::node_count).sum::<usize>()
    }
}

impl Markup {
    pub fn new(children: Vec<Child>) -> Self {
        Self { children }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(Child::as_element)
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.elements().find_map(|n| n.find(id))
    }

    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.children
            .iter_mut()
            .filter_map(Child::as_element_mut)
            .find_map(|n| n.find_mut(id))
    }

    /// First element (depth-first, document order) with the given tag
    pub fn find_by_tag(&self, tag: &str) -> Option<&Node> {
        fn search<'a>(node: &'a Node, tag: &str) -> Option<&'a Node> {
            if node.tag == tag {
                return Some(node);
            }
            node.elements().find_map(|c| search(c, tag))
        }
        self.elements().find_map(|n| search(n, tag))
    }

    /// Id of the element whose children contain `id`, and the child index
    pub fn parent_of(&self, id: &str) -> Option<(NodeId, usize)> {
        fn search(node: &Node, id: &str) -> Option<(NodeId, usize)> {
            for (index, child) in node.children.iter().enumerate() {
                if let Child::Element(el) = child {
                    if el.id == id {
                        return Some((node.id.clone(), index));
                    }
                    if let Some(found) = search(el, id) {
                        return Some(found);
                    }
                }
            }
            None
        }
        self.elements().find_map(|n| search(n, id))
    }

    /// Ids of every ancestor of `id`, nearest first
    pub fn ancestors_of(&self, id: &str) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = id.to_string();
        while let Some((parent, _)) = self.parent_of(&current) {
            ancestors.push(parent.clone());
            current = parent;
        }
        ancestors
    }

    /// Detach the element `id` from the tree and return it
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        if let Some(pos) = self
            .children
            .iter()
            .position(|c| matches!(c, Child::Element(n) if n.id == id))
        {
            if let Child::Element(node) = self.children.remove(pos) {
                return Some(node);
            }
        }
        let (parent_id, index) = self.parent_of(id)?;
        let parent = self.find_node_mut(&parent_id)?;
        match parent.children.remove(index) {
            Child::Element(node) => Some(node),
            _ => None,
        }
    }

    /// Insert `node` under `parent_id` at `index` (clamped to the child count).
    /// Returns the node back if the parent does not exist.
    pub fn insert_node(&mut self, parent_id: &str, index: usize, node: Node) -> Result<(), Node> {
        match self.find_node_mut(parent_id) {
            Some(parent) => {
                let index = index.min(parent.children.len());
                parent.children.insert(index, Child::Element(node));
                Ok(())
            }
            None => Err(node),
        }
    }

    pub fn node_count(&self) -> usize {
        self.elements().map(Node::node_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_keep_order_and_replace_in_place() {
        let mut attrs = Attributes::new();
        attrs.set("alt", "a");
        attrs.set("src", "x.png");
        attrs.set("alt", "b");

        let names: Vec<_> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["alt", "src"]);
        assert_eq!(attrs.get("alt"), Some("b"));
    }

    #[test]
    fn test_flag_attribute_has_no_value() {
        let mut attrs = Attributes::new();
        attrs.set_flag("hidden");
        assert!(attrs.contains("hidden"));
        assert_eq!(attrs.get("hidden"), None);
    }

    #[test]
    fn test_retain_keeps_order() {
        let mut attrs: Attributes = vec![("src", "x"), ("junk", "1"), ("alt", "a")]
            .into_iter()
            .collect();
        attrs.set_flag("svg");
        attrs.retain(|a| a.name != "junk" && a.value.is_some());

        let names: Vec<_> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["src", "alt"]);
    }

    #[test]
    fn test_insert_and_remove_node() {
        let mut root = Node::new("root", "mj-body");
        root.children.push(Child::Element(Node::new("a", "mj-section")));
        let mut markup = Markup::new(vec![Child::Element(root)]);

        markup
            .insert_node("a", 0, Node::new("b", "mj-column"))
            .unwrap();
        assert_eq!(markup.parent_of("b"), Some(("a".to_string(), 0)));
        assert_eq!(markup.ancestors_of("b"), vec!["a".to_string(), "root".to_string()]);

        let removed = markup.remove_node("a").unwrap();
        assert_eq!(removed.node_count(), 2);
        assert!(markup.find_node("b").is_none());
    }

    #[test]
    fn test_insert_into_missing_parent_returns_node() {
        let mut markup = Markup::default();
        let result = markup.insert_node("nope", 0, Node::new("x", "mj-text"));
        assert!(result.is_err());
    }
}
