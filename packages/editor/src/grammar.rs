//! # Marker Grammar
//!
//! Placeholder markers stand in for content the AI fills in later:
//!
//! ```text
//! {{content:<slotId>}}
//! {{image:<slotId>}}
//! {{logo}}                                  alias for image:logo
//! {{footer}}                                alias for content:footer
//! {{product:<componentId>:<index>:<field>}} field ∈ name|price|url|image
//! ```
//!
//! Tracking tokens record a node's marker identity while it is shown as
//! dummy content in the editor. They live in the class-list tracking
//! attribute and are never persisted.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

pub const CONTENT_SLOT_PREFIX: &str = "content-slot--";
pub const IMAGE_SLOT_PREFIX: &str = "img-slot--";
pub const PRODUCT_IMAGE_SLOT_PREFIX: &str = "product-img-slot--";
pub const LOCKED_SECTION: &str = "locked-section";

pub const LOGO_SLOT: &str = "logo";
pub const FOOTER_SLOT: &str = "footer";

/// Generic placeholder image (grey 600x300 with caption)
pub const DUMMY_IMAGE: &str = "data:image/svg+xml;charset=utf-8,%3Csvg xmlns='http://www.w3.org/2000/svg' width='600' height='300' viewBox='0 0 600 300'%3E%3Crect width='600' height='300' fill='%23e2e8f0'/%3E%3Ctext x='300' y='155' font-family='Arial' font-size='22' fill='%2364748b' text-anchor='middle'%3EImage%3C/text%3E%3C/svg%3E";

/// Logo placeholder
pub const DUMMY_LOGO: &str = "data:image/svg+xml;charset=utf-8,%3Csvg xmlns='http://www.w3.org/2000/svg' width='200' height='60' viewBox='0 0 200 60'%3E%3Crect width='200' height='60' rx='8' fill='%231e293b'/%3E%3Ctext x='100' y='37' font-family='Arial' font-size='20' font-weight='bold' fill='%23ffffff' text-anchor='middle'%3ELOGO%3C/text%3E%3C/svg%3E";

/// Product photo placeholder
pub const DUMMY_PRODUCT_IMAGE: &str = "data:image/svg+xml;charset=utf-8,%3Csvg xmlns='http://www.w3.org/2000/svg' width='300' height='300' viewBox='0 0 300 300'%3E%3Crect width='300' height='300' fill='%23f1f5f9'/%3E%3Ctext x='150' y='155' font-family='Arial' font-size='18' fill='%2394a3b8' text-anchor='middle'%3EProduct%3C/text%3E%3C/svg%3E";

/// Prefix shared by every inline vector-graphic data URI
pub const SVG_DATA_URI_PREFIX: &str = "data:image/svg+xml";

const DUMMY_TEXT: &[(&str, &str)] = &[
    ("headline", "Your Headline Goes Here"),
    ("subheadline", "A short supporting line that expands on the headline"),
    ("preheader", "A quick preview of what's inside this email"),
    (
        "body-text",
        "This is where the main message of your email will appear. Tell your readers what's new and why it matters to them.",
    ),
    ("intro-text", "Hi there, we have something special to share with you."),
    ("cta-text", "Shop Now"),
    ("offer-text", "Save 20% on your next order"),
    ("product-description", "A short description of the featured product."),
    ("signature", "The Team"),
    ("footer", "You are receiving this email because you subscribed to our newsletter."),
];

/// Product marker field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductField {
    Name,
    Price,
    Url,
    Image,
}

impl ProductField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "url" => Some(Self::Url),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::Url => "url",
            Self::Image => "image",
        }
    }
}

/// Parsed placeholder reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Marker {
    Content { slot_id: String },
    Image { slot_id: String },
    Product {
        component_id: String,
        index: usize,
        field: ProductField,
    },
}

pub fn is_valid_slot_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl Marker {
    pub fn content(slot_id: impl Into<String>) -> Self {
        Self::Content {
            slot_id: slot_id.into(),
        }
    }

    pub fn image(slot_id: impl Into<String>) -> Self {
        Self::Image {
            slot_id: slot_id.into(),
        }
    }

    /// Recognize a marker. The trimmed text must be exactly one token;
    /// anything else is ordinary content.
    pub fn parse(text: &str) -> Option<Self> {
        let body = text.trim().strip_prefix("{{")?.strip_suffix("}}")?;

        match body {
            "logo" => return Some(Self::image(LOGO_SLOT)),
            "footer" => return Some(Self::content(FOOTER_SLOT)),
            _ => {}
        }

        let (kind, rest) = body.split_once(':')?;
        match kind {
            "content" if is_valid_slot_id(rest) => Some(Self::content(rest)),
            "image" if is_valid_slot_id(rest) => Some(Self::image(rest)),
            "product" => {
                let mut parts = rest.split(':');
                let component_id = parts.next()?;
                let index = parts.next()?;
                let field = parts.next()?;
                if parts.next().is_some()
                    || !is_valid_slot_id(component_id)
                    || index.is_empty()
                    || !index.chars().all(|c| c.is_ascii_digit())
                {
                    return None;
                }
                Some(Self::Product {
                    component_id: component_id.to_string(),
                    index: index.parse().ok()?,
                    field: ProductField::parse(field)?,
                })
            }
            _ => None,
        }
    }

    /// Tracking token for the node this marker occupies
    pub fn tracking_token(&self) -> TrackingToken {
        match self {
            Self::Content { slot_id } => TrackingToken::ContentSlot(slot_id.clone()),
            Self::Image { slot_id } => TrackingToken::ImageSlot(slot_id.clone()),
            Self::Product {
                component_id,
                index,
                ..
            } => TrackingToken::ProductImageSlot {
                component_id: component_id.clone(),
                index: *index,
            },
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content { slot_id } if slot_id == FOOTER_SLOT => write!(f, "{{{{footer}}}}"),
            Self::Content { slot_id } => write!(f, "{{{{content:{}}}}}", slot_id),
            Self::Image { slot_id } if slot_id == LOGO_SLOT => write!(f, "{{{{logo}}}}"),
            Self::Image { slot_id } => write!(f, "{{{{image:{}}}}}", slot_id),
            Self::Product {
                component_id,
                index,
                field,
            } => write!(
                f,
                "{{{{product:{}:{}:{}}}}}",
                component_id,
                index,
                field.as_str()
            ),
        }
    }
}

/// Identity tag stored in the tracking attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackingToken {
    ContentSlot(String),
    ImageSlot(String),
    ProductImageSlot { component_id: String, index: usize },
    /// UI-only lock flag, not a marker identity
    LockedSection,
}

impl TrackingToken {
    pub fn parse(token: &str) -> Option<Self> {
        if token == LOCKED_SECTION {
            return Some(Self::LockedSection);
        }
        if let Some(rest) = token.strip_prefix(PRODUCT_IMAGE_SLOT_PREFIX) {
            let (component_id, index) = rest.rsplit_once("--")?;
            if component_id.is_empty() || index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            return Some(Self::ProductImageSlot {
                component_id: component_id.to_string(),
                index: index.parse().ok()?,
            });
        }
        if let Some(id) = token.strip_prefix(IMAGE_SLOT_PREFIX) {
            return is_valid_slot_id(id).then(|| Self::ImageSlot(id.to_string()));
        }
        if let Some(id) = token.strip_prefix(CONTENT_SLOT_PREFIX) {
            return is_valid_slot_id(id).then(|| Self::ContentSlot(id.to_string()));
        }
        None
    }

    /// Whether this token names a marker identity (everything but the lock flag)
    pub fn is_identity(&self) -> bool {
        !matches!(self, Self::LockedSection)
    }
}

impl fmt::Display for TrackingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentSlot(id) => write!(f, "{}{}", CONTENT_SLOT_PREFIX, id),
            Self::ImageSlot(id) => write!(f, "{}{}", IMAGE_SLOT_PREFIX, id),
            Self::ProductImageSlot {
                component_id,
                index,
            } => write!(f, "{}{}--{}", PRODUCT_IMAGE_SLOT_PREFIX, component_id, index),
            Self::LockedSection => f.write_str(LOCKED_SECTION),
        }
    }
}

/// Whitespace-separated tokens of a class-list value
pub fn class_tokens(value: &str) -> impl Iterator<Item = &str> {
    value.split_ascii_whitespace()
}

/// Tracking tokens present in a class-list value
pub fn tracking_tokens(value: &str) -> Vec<TrackingToken> {
    class_tokens(value).filter_map(TrackingToken::parse).collect()
}

/// Append `token` to a class list unless it is already present
pub fn add_class_token(value: Option<&str>, token: &str) -> String {
    match value.map(str::trim) {
        None | Some("") => token.to_string(),
        Some(existing) if class_tokens(existing).any(|t| t == token) => existing.to_string(),
        Some(existing) => format!("{} {}", existing, token),
    }
}

/// Remove every exact occurrence of `token`, collapsing whitespace.
/// Returns `None` when nothing is left.
pub fn remove_class_token(value: &str, token: &str) -> Option<String> {
    retain_class_tokens(value, |t| t != token)
}

/// Keep only the tokens matching `keep`. Returns `None` when nothing is left.
pub fn retain_class_tokens(value: &str, keep: impl Fn(&str) -> bool) -> Option<String> {
    let kept: Vec<&str> = class_tokens(value).filter(|t| keep(t)).collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(" "))
    }
}

/// Dummy text lookup. Forward direction only: the reverse transform keys
/// off tracking tokens, never off text.
#[derive(Debug, Clone)]
pub struct PlaceholderTable {
    entries: BTreeMap<String, String>,
}

impl PlaceholderTable {
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        let mut entries: BTreeMap<String, String> = DUMMY_TEXT
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        entries.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { entries }
    }

    /// Human-readable stand-in for a content slot; unknown ids fall back
    /// to the id itself
    pub fn text_for<'a>(&'a self, slot_id: &'a str) -> &'a str {
        self.entries.get(slot_id).map(String::as_str).unwrap_or(slot_id)
    }
}

impl Default for PlaceholderTable {
    fn default() -> Self {
        Self::new(&BTreeMap::new())
    }
}

/// Dummy image for an image or product marker
pub fn dummy_image_for(marker: &Marker) -> &'static str {
    match marker {
        Marker::Image { slot_id } if slot_id == LOGO_SLOT => DUMMY_LOGO,
        Marker::Image { .. } | Marker::Content { .. } => DUMMY_IMAGE,
        Marker::Product { .. } => DUMMY_PRODUCT_IMAGE,
    }
}

fn product_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{product:([A-Za-z0-9_-]+):([0-9]+):(name|price|url|image)\}\}").unwrap()
    })
}

/// A product marker found inside free text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductMarkerMatch {
    pub range: std::ops::Range<usize>,
    pub component_id: String,
    pub index: usize,
    pub field: ProductField,
}

/// Every product marker embedded anywhere in `text`
pub fn find_product_markers(text: &str) -> Vec<ProductMarkerMatch> {
    product_marker_re()
        .captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            Some(ProductMarkerMatch {
                range: whole.range(),
                component_id: cap[1].to_string(),
                index: cap[2].parse().ok()?,
                field: ProductField::parse(&cap[3])?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_marker() {
        assert_eq!(
            Marker::parse("  {{content:headline}} "),
            Some(Marker::content("headline"))
        );
        assert_eq!(Marker::parse("{{content:Body_Text-2}}"), Some(Marker::content("Body_Text-2")));
    }

    #[test]
    fn test_marker_with_surrounding_text_is_not_a_marker() {
        assert_eq!(Marker::parse("Hello {{content:headline}}"), None);
        assert_eq!(Marker::parse("{{content:headline}}!"), None);
        assert_eq!(Marker::parse("{{content:head line}}"), None);
        assert_eq!(Marker::parse("{{content:}}"), None);
        assert_eq!(Marker::parse("{{ content:headline }}"), None);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Marker::parse("{{logo}}"), Some(Marker::image("logo")));
        assert_eq!(Marker::parse("{{footer}}"), Some(Marker::content("footer")));
    }

    #[test]
    fn test_alias_serialization_is_asymmetric() {
        assert_eq!(Marker::parse("{{image:logo}}").unwrap().to_string(), "{{logo}}");
        assert_eq!(Marker::parse("{{content:footer}}").unwrap().to_string(), "{{footer}}");
        assert_eq!(Marker::image("hero").to_string(), "{{image:hero}}");
    }

    #[test]
    fn test_parse_product_marker() {
        assert_eq!(
            Marker::parse("{{product:spotlight:2:price}}"),
            Some(Marker::Product {
                component_id: "spotlight".to_string(),
                index: 2,
                field: ProductField::Price,
            })
        );
        assert_eq!(Marker::parse("{{product:spotlight:x:price}}"), None);
        assert_eq!(Marker::parse("{{product:spotlight:0:color}}"), None);
        assert_eq!(Marker::parse("{{product:spotlight:0:name:extra}}"), None);
    }

    #[test]
    fn test_product_marker_display() {
        let marker = Marker::parse("{{product:blockA:0:image}}").unwrap();
        assert_eq!(marker.to_string(), "{{product:blockA:0:image}}");
    }

    #[test]
    fn test_tracking_token_parse_and_display() {
        for raw in [
            "content-slot--headline",
            "img-slot--hero-banner",
            "product-img-slot--spotlight--3",
            "product-img-slot--my--block--0",
            "locked-section",
        ] {
            let token = TrackingToken::parse(raw).unwrap();
            assert_eq!(token.to_string(), raw);
        }

        assert_eq!(
            TrackingToken::parse("product-img-slot--my--block--0"),
            Some(TrackingToken::ProductImageSlot {
                component_id: "my--block".to_string(),
                index: 0,
            })
        );
        assert_eq!(TrackingToken::parse("hero"), None);
        assert_eq!(TrackingToken::parse("img-slot--"), None);
    }

    #[test]
    fn test_class_list_helpers() {
        assert_eq!(add_class_token(None, "img-slot--a"), "img-slot--a");
        assert_eq!(add_class_token(Some("rounded"), "img-slot--a"), "rounded img-slot--a");
        assert_eq!(add_class_token(Some("img-slot--a"), "img-slot--a"), "img-slot--a");

        assert_eq!(
            remove_class_token("rounded  img-slot--a shadow", "img-slot--a"),
            Some("rounded shadow".to_string())
        );
        assert_eq!(remove_class_token("img-slot--a", "img-slot--a"), None);
        // token-exact: a longer id is not touched
        assert_eq!(
            remove_class_token("img-slot--a-1", "img-slot--a"),
            Some("img-slot--a-1".to_string())
        );
    }

    #[test]
    fn test_placeholder_lookup_falls_back_to_slot_id() {
        let table = PlaceholderTable::default();
        assert_eq!(table.text_for("headline"), "Your Headline Goes Here");
        assert_eq!(table.text_for("promo-code"), "promo-code");

        let mut overrides = BTreeMap::new();
        overrides.insert("headline".to_string(), "Big news".to_string());
        let table = PlaceholderTable::new(&overrides);
        assert_eq!(table.text_for("headline"), "Big news");
    }

    #[test]
    fn test_dummy_images_never_contain_double_quotes() {
        for uri in [DUMMY_IMAGE, DUMMY_LOGO, DUMMY_PRODUCT_IMAGE] {
            assert!(!uri.contains('"'));
            assert!(uri.starts_with(SVG_DATA_URI_PREFIX));
        }
        assert_eq!(dummy_image_for(&Marker::image("logo")), DUMMY_LOGO);
    }

    #[test]
    fn test_find_product_markers_in_text() {
        let found = find_product_markers("{{product:grid:0:name}} - {{product:grid:0:price}}");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].component_id, "grid");
        assert_eq!(found[1].field, ProductField::Price);
        assert_eq!(found[1].range, 26..50);
    }
}
