use crate::ast::*;

/// Serializer converts a markup tree back to text
///
/// Output is compact: no whitespace is added beyond what the text
/// children already carry, so parse → serialize reproduces
/// double-quoted input byte for byte.
pub struct Serializer {
    output: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    pub fn serialize(mut self, markup: &Markup) -> String {
        for child in &markup.children {
            self.write_child(child);
        }
        self.output
    }

    pub fn serialize_node(mut self, node: &Node) -> String {
        self.write_node(node);
        self.output
    }

    fn write_child(&mut self, child: &Child) {
        match child {
            Child::Element(node) => self.write_node(node),
            Child::Text { content } => self.output.push_str(content),
            Child::Comment { content } => {
                self.output.push_str("<!--");
                self.output.push_str(content);
                self.output.push_str("-->");
            }
        }
    }

    fn write_node(&mut self, node: &Node) {
        self.output.push('<');
        self.output.push_str(&node.tag);
        self.write_attributes(&node.attributes);

        match node.closing {
            Closing::SelfClosing if node.children.is_empty() => {
                self.output.push_str(" />");
            }
            Closing::Void if node.children.is_empty() => {
                self.output.push('>');
            }
            _ => {
                self.output.push('>');
                for child in &node.children {
                    self.write_child(child);
                }
                self.output.push_str("</");
                self.output.push_str(&node.tag);
                self.output.push('>');
            }
        }
    }

    fn write_attributes(&mut self, attributes: &Attributes) {
        for attr in attributes.iter() {
            self.output.push(' ');
            self.output.push_str(&attr.name);
            if let Some(value) = &attr.value {
                // Values are stored raw. One containing only double quotes is
                // single-quoted; one containing both is written as-is.
                let quote = if value.contains('"') && !value.contains('\'') {
                    '\''
                } else {
                    '"'
                };
                self.output.push('=');
                self.output.push(quote);
                self.output.push_str(value);
                self.output.push(quote);
            }
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a full markup tree
pub fn serialize(markup: &Markup) -> String {
    Serializer::new().serialize(markup)
}

/// Serialize a single subtree
pub fn serialize_node(node: &Node) -> String {
    Serializer::new().serialize_node(node)
}

/// Serialize only the children of a node (its inner markup)
pub fn serialize_children(children: &[Child]) -> String {
    let mut serializer = Serializer::new();
    for child in children {
        serializer.write_child(child);
    }
    serializer.output
}
