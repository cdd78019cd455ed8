//! Node-level access to the tracking attribute

use mailslot_parser::Node;

use crate::config::EngineConfig;
use crate::grammar::{add_class_token, retain_class_tokens, tracking_tokens, TrackingToken};

/// Tracking tokens carried by `node`
pub fn node_tokens(node: &Node, config: &EngineConfig) -> Vec<TrackingToken> {
    node.attributes
        .get(&config.tracking_attribute)
        .map(tracking_tokens)
        .unwrap_or_default()
}

/// Marker identity tokens carried by `node` (lock flag excluded)
pub fn identity_tokens(node: &Node, config: &EngineConfig) -> Vec<TrackingToken> {
    node_tokens(node, config)
        .into_iter()
        .filter(TrackingToken::is_identity)
        .collect()
}

pub fn has_identity(node: &Node, config: &EngineConfig) -> bool {
    !identity_tokens(node, config).is_empty()
}

pub fn has_token(node: &Node, config: &EngineConfig, token: &TrackingToken) -> bool {
    node_tokens(node, config).iter().any(|t| t == token)
}

/// Append a token, keeping any unrelated classes
pub fn add_token(node: &mut Node, config: &EngineConfig, token: &TrackingToken) {
    let current = node.attributes.get(&config.tracking_attribute);
    let updated = add_class_token(current, &token.to_string());
    node.attributes.set(config.tracking_attribute.clone(), updated);
}

/// Drop every class token for which `strip` returns true; the attribute
/// is removed entirely when it ends up empty
pub fn strip_tokens(node: &mut Node, config: &EngineConfig, strip: impl Fn(&str) -> bool) {
    let Some(current) = node.attributes.get(&config.tracking_attribute) else {
        return;
    };
    match retain_class_tokens(current, |t| !strip(t)) {
        Some(rest) => node.attributes.set(config.tracking_attribute.clone(), rest),
        None => {
            node.attributes.remove(&config.tracking_attribute);
        }
    }
}

/// Replace one token with another in place, preserving position
pub fn replace_token(
    node: &mut Node,
    config: &EngineConfig,
    from: &TrackingToken,
    to: &TrackingToken,
) {
    let Some(current) = node.attributes.get(&config.tracking_attribute) else {
        return;
    };
    let from = from.to_string();
    let to = to.to_string();
    let updated = current
        .split_ascii_whitespace()
        .map(|t| if t == from { to.as_str() } else { t })
        .collect::<Vec<_>>()
        .join(" ");
    node.attributes.set(config.tracking_attribute.clone(), updated);
}

/// Plain class names (tokens that are not tracking tokens)
pub fn plain_classes<'a>(node: &'a Node, config: &EngineConfig) -> Vec<&'a str> {
    node.attributes
        .get(&config.tracking_attribute)
        .map(|v| {
            v.split_ascii_whitespace()
                .filter(|t| TrackingToken::parse(t).is_none())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with_class(class: &str) -> Node {
        let mut node = Node::new("n", "mj-image");
        node.attributes.set("css-class", class);
        node
    }

    #[test]
    fn test_identity_tokens_skip_lock_flag() {
        let config = EngineConfig::default();
        let node = node_with_class("hero locked-section img-slot--hero");
        assert_eq!(
            identity_tokens(&node, &config),
            vec![TrackingToken::ImageSlot("hero".to_string())]
        );
        assert_eq!(node_tokens(&node, &config).len(), 2);
        assert_eq!(plain_classes(&node, &config), vec!["hero"]);
    }

    #[test]
    fn test_add_and_strip_tokens() {
        let config = EngineConfig::default();
        let mut node = Node::new("n", "mj-text");

        add_token(&mut node, &config, &TrackingToken::ContentSlot("headline".to_string()));
        add_token(&mut node, &config, &TrackingToken::LockedSection);
        assert_eq!(
            node.attributes.get("css-class"),
            Some("content-slot--headline locked-section")
        );

        strip_tokens(&mut node, &config, |t| TrackingToken::parse(t).is_some());
        assert!(!node.attributes.contains("css-class"));
    }

    #[test]
    fn test_replace_token_keeps_position() {
        let config = EngineConfig::default();
        let mut node = node_with_class("a content-slot--x b");
        replace_token(
            &mut node,
            &config,
            &TrackingToken::ContentSlot("x".to_string()),
            &TrackingToken::ContentSlot("x-1".to_string()),
        );
        assert_eq!(node.attributes.get("css-class"), Some("a content-slot--x-1 b"));
    }
}
