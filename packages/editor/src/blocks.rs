//! Insertable block catalog
//!
//! Each block is stored in persisted form. Instantiating one parses it with
//! the session's id generator, forward-transforms it and locks any reserved
//! region it contains, ready to be dispatched as an inserted node.

use mailslot_parser::{parse_fragment, IdGenerator, Node};

use crate::config::EngineConfig;
use crate::drop_zone::{BlockClass, LockPolicy};
use crate::forward::ForwardTransform;
use crate::EditorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub name: &'static str,
    pub label: &'static str,
    pub class: BlockClass,
    pub markup: &'static str,
}

pub const BLOCKS: &[Block] = &[
    Block {
        name: "text",
        label: "Text",
        class: BlockClass::Content,
        markup: "<mj-text>{{content:body-text}}</mj-text>",
    },
    Block {
        name: "headline",
        label: "Headline",
        class: BlockClass::Content,
        markup: r#"<mj-text font-size="28px" font-weight="bold">{{content:headline}}</mj-text>"#,
    },
    Block {
        name: "image",
        label: "Image",
        class: BlockClass::Content,
        markup: r#"<mj-image src="{{image:image}}" alt="" />"#,
    },
    Block {
        name: "button",
        label: "Button",
        class: BlockClass::Content,
        markup: r##"<mj-button href="#">{{content:cta-text}}</mj-button>"##,
    },
    Block {
        name: "divider",
        label: "Divider",
        class: BlockClass::Content,
        markup: "<mj-divider />",
    },
    Block {
        name: "spacer",
        label: "Spacer",
        class: BlockClass::Content,
        markup: r#"<mj-spacer height="20px" />"#,
    },
    Block {
        name: "product-card",
        label: "Product card",
        class: BlockClass::Content,
        markup: r#"<mj-column><mj-image src="{{product:product:0:image}}" href="{{product:product:0:url}}" /><mj-text>{{product:product:0:name}}</mj-text><mj-text>{{product:product:0:price}}</mj-text></mj-column>"#,
    },
    Block {
        name: "section",
        label: "Section",
        class: BlockClass::Structure,
        markup: "<mj-section><mj-column><mj-text>{{content:body-text}}</mj-text></mj-column></mj-section>",
    },
    Block {
        name: "two-columns",
        label: "Two columns",
        class: BlockClass::Structure,
        markup: r#"<mj-section><mj-column><mj-image src="{{image:column-image}}" /></mj-column><mj-column><mj-text>{{content:body-text}}</mj-text></mj-column></mj-section>"#,
    },
    Block {
        name: "hero",
        label: "Hero",
        class: BlockClass::Structure,
        markup: r##"<mj-hero mode="fluid-height"><mj-image src="{{image:hero}}" /><mj-text>{{content:headline}}</mj-text><mj-button href="#">{{content:cta-text}}</mj-button></mj-hero>"##,
    },
];

pub fn find_block(name: &str) -> Option<&'static Block> {
    BLOCKS.iter().find(|b| b.name == name)
}

impl Block {
    /// Editable node for this block
    pub fn instantiate(&self, ids: &mut IdGenerator, config: &EngineConfig) -> Result<Node, EditorError> {
        let mut node = parse_fragment(self.markup, ids)?;
        ForwardTransform::new(config).apply_node(&mut node);
        LockPolicy::new(config).apply_node(&mut node);
        Ok(node)
    }
}
