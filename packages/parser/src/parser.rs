//! Stack-based tree builder over the logos token stream

use crate::ast::{Attributes, Child, Closing, Markup, Node};
use crate::error::{ParseError, ParseResult, TokenSpan};
use crate::id_generator::IdGenerator;
use crate::lexer::{lex, lex_attributes, split_open_tag, Token};

/// HTML elements that never take a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Parse markup, generating node ids from a fresh generator
pub fn parse(source: &str) -> ParseResult<Markup> {
    let mut ids = IdGenerator::default();
    Parser::new(source, &mut ids).parse()
}

/// Parse markup, drawing node ids from an existing session generator
pub fn parse_with_ids(source: &str, ids: &mut IdGenerator) -> ParseResult<Markup> {
    Parser::new(source, ids).parse()
}

/// Parse a fragment that must contain exactly one root element
pub fn parse_fragment(source: &str, ids: &mut IdGenerator) -> ParseResult<Node> {
    let markup = parse_with_ids(source, ids)?;
    let mut roots = markup.children.into_iter().filter_map(|c| match c {
        Child::Element(node) => Some(node),
        _ => None,
    });
    match (roots.next(), roots.next()) {
        (Some(node), None) => Ok(node),
        _ => Err(ParseError::invalid_syntax(
            TokenSpan::new(0, source.len()),
            "fragment must contain exactly one root element",
        )),
    }
}

struct OpenElement {
    node: Node,
    span: TokenSpan,
}

pub struct Parser<'src, 'ids> {
    source: &'src str,
    ids: &'ids mut IdGenerator,
    stack: Vec<OpenElement>,
    root: Vec<Child>,
}

impl<'src, 'ids> Parser<'src, 'ids> {
    pub fn new(source: &'src str, ids: &'ids mut IdGenerator) -> Self {
        Self {
            source,
            ids,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    pub fn parse(mut self) -> ParseResult<Markup> {
        for result in lex(self.source) {
            match result {
                Ok(spanned) => match spanned.token {
                    Token::Text(text) => self.push_child(Child::text(text)),
                    Token::Comment(body) => self.push_child(Child::Comment {
                        content: body.to_string(),
                    }),
                    Token::OpenTag(raw) => self.open(raw, spanned.span),
                    Token::CloseTag(name) => self.close(name, spanned.span)?,
                },
                Err(err) => {
                    let slice = &self.source[err.span.start..err.span.end];
                    let rest = &self.source[err.span.start..];
                    if rest.starts_with("<!--") {
                        return Err(ParseError::UnterminatedComment {
                            span: TokenSpan::new(err.span.start, self.source.len()),
                        });
                    }
                    if rest.len() > 1 && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                        return Err(ParseError::UnterminatedTag {
                            span: TokenSpan::new(err.span.start, self.source.len()),
                        });
                    }
                    // A lone `<` is ordinary text
                    self.push_child(Child::text(slice));
                }
            }
        }

        if let Some(open) = self.stack.pop() {
            return Err(ParseError::UnclosedTag {
                tag: open.node.tag,
                span: open.span,
            });
        }

        Ok(Markup::new(self.root))
    }

    fn push_child(&mut self, child: Child) {
        // Adjacent text runs (e.g. around a lone `<`) are merged
        let children = match self.stack.last_mut() {
            Some(open) => &mut open.node.children,
            None => &mut self.root,
        };
        if let (Child::Text { content: new }, Some(Child::Text { content: prev })) =
            (&child, children.last_mut())
        {
            prev.push_str(new);
            return;
        }
        children.push(child);
    }

    fn open(&mut self, raw: &'src str, span: TokenSpan) {
        let (tag, attr_text, self_closing) = split_open_tag(raw);

        let mut attributes = Attributes::new();
        for (name, value) in lex_attributes(attr_text) {
            match value {
                Some(v) => attributes.set(name, v),
                None => attributes.set_flag(name),
            }
        }

        let closing = if self_closing {
            Closing::SelfClosing
        } else if is_void_element(tag) {
            Closing::Void
        } else {
            Closing::Pair
        };

        let node = Node {
            id: self.ids.new_id(),
            tag: tag.to_string(),
            attributes,
            children: Vec::new(),
            closing,
        };

        match closing {
            Closing::Pair => self.stack.push(OpenElement { node, span }),
            _ => self.push_child(Child::Element(node)),
        }
    }

    fn close(&mut self, name: &str, span: TokenSpan) -> ParseResult<()> {
        // `</br>` and friends are tolerated and dropped
        if is_void_element(name) {
            return Ok(());
        }

        match self.stack.pop() {
            Some(open) if open.node.tag == name => {
                self.push_child(Child::Element(open.node));
                Ok(())
            }
            Some(open) => Err(ParseError::UnexpectedCloseTag {
                tag: name.to_string(),
                expected: format!("</{}>", open.node.tag),
                span,
            }),
            None => Err(ParseError::UnexpectedCloseTag {
                tag: name.to_string(),
                expected: "no closing tag".to_string(),
                span,
            }),
        }
    }
}
