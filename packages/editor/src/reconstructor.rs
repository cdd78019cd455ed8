//! # Attribute Reconstructor
//!
//! Placeholder images are inline SVG data URIs. When the editor round-trips
//! one with imperfect quoting, the leaked image data bleeds into the rest
//! of the tag and a naive "replace src" string edit corrupts the node.
//!
//! This module works on raw text because its input may not parse as a
//! tree at all. It extracts the attributes worth keeping (last occurrence
//! wins, so genuine attributes written after leaked fragments take
//! precedence) and rebuilds a minimal, well-formed image tag.

use mailslot_parser::Attributes;
use regex::Regex;
use std::sync::OnceLock;

use crate::config::EngineConfig;
use crate::grammar::SVG_DATA_URI_PREFIX;

#[derive(Debug, Clone)]
pub struct AttributeReconstructor {
    image_tags: Vec<String>,
    source_attribute: String,
    allowed: Vec<String>,
    patterns: Vec<(String, Regex)>,
}

impl AttributeReconstructor {
    pub fn new(config: &EngineConfig) -> Self {
        let allowed: Vec<String> = config
            .image_attributes
            .iter()
            .filter(|name| **name != config.source_attribute)
            .cloned()
            .collect();
        let patterns = allowed
            .iter()
            .map(|name| (name.clone(), attribute_pattern(name)))
            .collect();

        Self {
            image_tags: config.image_tags.clone(),
            source_attribute: config.source_attribute.clone(),
            allowed,
            patterns,
        }
    }

    /// Attribute names this reconstructor recovers
    pub fn allowed_attributes(&self) -> &[String] {
        &self.allowed
    }

    /// Scan raw tag text for each allowed attribute assigned a double-quoted
    /// value. The last occurrence of a name wins. Result order follows the
    /// allow-list.
    pub fn extract_attributes(&self, raw: &str) -> Attributes {
        let mut attrs = Attributes::new();
        for (name, pattern) in &self.patterns {
            if let Some(value) = pattern
                .captures_iter(raw)
                .last()
                .and_then(|cap| cap.get(1))
            {
                attrs.set(name.clone(), value.as_str());
            }
        }
        attrs
    }

    /// Emit a minimal image tag: the source attribute followed by each of
    /// `attributes` in order, and nothing else
    pub fn build_image_node(&self, tag: &str, source: &str, attributes: &Attributes) -> String {
        let mut out = String::new();
        out.push('<');
        out.push_str(tag);
        out.push(' ');
        out.push_str(&self.source_attribute);
        out.push_str("=\"");
        out.push_str(source);
        out.push('"');
        for attr in attributes.iter() {
            if attr.name == self.source_attribute {
                continue;
            }
            if let Some(value) = &attr.value {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(value);
                out.push('"');
            }
        }
        out.push_str(" />");
        out
    }

    /// Safety net: rebuild every image tag that still carries an SVG data
    /// URI, blanking its source. Well-formed tags without one are untouched.
    pub fn repair(&self, markup: &str) -> String {
        self.repair_where(markup, |raw| raw.contains(SVG_DATA_URI_PREFIX))
    }

    /// Rebuild only image tags whose vector data leaked into the tag text:
    /// an unencoded `<`, or quotes that no longer pair up into attributes.
    /// Such tags cannot be trusted to lex into sensible attributes.
    pub fn repair_leaked(&self, markup: &str) -> String {
        self.repair_where(markup, |raw| {
            raw.contains(SVG_DATA_URI_PREFIX) && (raw[1..].contains('<') || !is_well_formed_tag(raw))
        })
    }

    fn repair_where(&self, markup: &str, corrupted: impl Fn(&str) -> bool) -> String {
        let mut output = markup.to_string();
        for tag in &self.image_tags {
            output = self.repair_tag(&output, tag, &corrupted);
        }
        output
    }

    /// Number of image tags the safety net would rebuild
    pub fn corrupted_count(&self, markup: &str) -> usize {
        self.image_tags
            .iter()
            .map(|tag| {
                image_tag_extents(markup, tag)
                    .into_iter()
                    .filter(|range| markup[range.clone()].contains(SVG_DATA_URI_PREFIX))
                    .count()
            })
            .sum()
    }

    fn repair_tag(&self, markup: &str, tag: &str, corrupted: &impl Fn(&str) -> bool) -> String {
        let mut result = String::with_capacity(markup.len());
        let mut last_end = 0;

        for range in image_tag_extents(markup, tag) {
            let raw = &markup[range.clone()];
            if !corrupted(raw) {
                continue;
            }
            let attrs = self.extract_attributes(raw);
            tracing::debug!(
                "[Reconstructor] rebuilding corrupted <{}> ({} bytes, {} attributes kept)",
                tag,
                raw.len(),
                attrs.len()
            );
            result.push_str(&markup[last_end..range.start]);
            result.push_str(&self.build_image_node(tag, "", &attrs));
            last_end = range.end;
        }

        result.push_str(&markup[last_end..]);
        result
    }
}

/// Start tag made only of `name` or `name="value"` pairs, optionally
/// followed by its close tag
fn is_well_formed_tag(raw: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"^<[A-Za-z][\w:-]*(?:\s+[^\s"'=<>/]+(?:\s*=\s*(?:"[^"]*"|'[^']*'))?)*\s*/?>"#)
            .expect("static tag pattern is valid")
    });
    match re.find(raw) {
        Some(m) => {
            let rest = raw[m.end()..].trim_start();
            rest.is_empty() || rest.starts_with("</")
        }
        None => false,
    }
}

fn attribute_pattern(name: &str) -> Regex {
    let pattern = format!(r#"(?:^|[\s"']){}\s*=\s*"([^"]*)""#, regex::escape(name));
    Regex::new(&pattern).expect("escaped attribute name yields a valid pattern")
}

/// Byte ranges of every `<tag ...>` element in raw text, including an
/// explicit `</tag>` when present
///
/// Leaked SVG data can contain `/>` of its own, so among the candidate
/// ends before the next `<tag` the first one enclosing an even number of
/// double quotes is chosen.
fn image_tag_extents(markup: &str, tag: &str) -> Vec<std::ops::Range<usize>> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let starts: Vec<usize> = markup
        .match_indices(&open)
        .map(|(i, _)| i)
        .filter(|&i| {
            markup[i + open.len()..]
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_whitespace() || c == '/' || c == '>')
        })
        .collect();

    let mut extents = Vec::new();
    for (n, &start) in starts.iter().enumerate() {
        let limit = starts.get(n + 1).copied().unwrap_or(markup.len());
        if extents
            .last()
            .map_or(false, |prev: &std::ops::Range<usize>| prev.end > start)
        {
            continue;
        }

        let segment = &markup[start..limit];
        let mut candidates: Vec<usize> = segment
            .match_indices("/>")
            .map(|(i, _)| start + i + 2)
            .chain(segment.match_indices(&close).map(|(i, _)| start + i + close.len()))
            .collect();
        candidates.sort_unstable();

        let chosen = candidates
            .iter()
            .copied()
            .find(|&end| markup[start..end].matches('"').count() % 2 == 0)
            .or_else(|| candidates.first().copied());

        if let Some(end) = chosen {
            extents.push(start..end);
        }
    }

    extents
}
