//! Lexer for template markup using logos
//!
//! Markup is lexed in two layers. The outer [`Token`] lexer splits the
//! source into comments, whole open tags, close tags and text runs. Each
//! open tag slice is then fed to the inner [`AttrToken`] lexer to pick out
//! attribute names and values.

use logos::{Lexer, Logos};

use crate::error::TokenSpan;

/// Outer (content-level) tokens
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    /// `<!-- ... -->`, body only
    #[token("<!--", lex_comment)]
    Comment(&'src str),

    /// `</name>`, name only
    #[regex(r"</[A-Za-z][A-Za-z0-9_:.\-]*[ \t\r\n]*>", |lex| {
        let s = lex.slice();
        s[2..s.len() - 1].trim_end()
    })]
    CloseTag(&'src str),

    /// Whole open tag including `<` and `>`
    #[regex(r"<[A-Za-z][A-Za-z0-9_:.\-]*", lex_open_tag)]
    OpenTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Tokens inside an open tag, after the tag name
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum AttrToken<'src> {
    #[regex(r#"[^ \t\r\n"'=<>/`]+"#, |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    DoubleQuoted(&'src str),

    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    SingleQuoted(&'src str),

    #[token("/")]
    Slash,
}

fn lex_comment<'src>(lex: &mut Lexer<'src, Token<'src>>) -> Option<&'src str> {
    let end = lex.remainder().find("-->")?;
    lex.bump(end + 3);
    let s = lex.slice();
    Some(&s[4..s.len() - 3])
}

/// Consume the rest of an open tag, honouring quoted attribute values
fn lex_open_tag<'src>(lex: &mut Lexer<'src, Token<'src>>) -> Option<&'src str> {
    let mut quote: Option<char> = None;
    for (offset, ch) in lex.remainder().char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '>') => {
                lex.bump(offset + 1);
                return Some(lex.slice());
            }
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

/// A token with its span
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: TokenSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: TokenSpan,
    pub message: String,
}

/// Lex markup into outer tokens with spans
pub fn lex(source: &str) -> impl Iterator<Item = Result<SpannedToken<'_>, LexError>> + '_ {
    Token::lexer(source).spanned().map(|(result, span)| {
        let span = TokenSpan::new(span.start, span.end);
        match result {
            Ok(token) => Ok(SpannedToken { token, span }),
            Err(_) => Err(LexError {
                span,
                message: "Unexpected character".to_string(),
            }),
        }
    })
}

/// Split an open tag slice (`<name ...>`) into its name, raw attribute
/// text and whether it ends with `/>`
pub fn split_open_tag(raw: &str) -> (&str, &str, bool) {
    let inner = &raw[1..raw.len() - 1];
    let name_end = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let name = &inner[..name_end];
    let rest = inner[name_end..].trim_end();
    match rest.strip_suffix('/') {
        Some(attrs) => (name, attrs, true),
        None => (name, rest, false),
    }
}

/// Lex attribute text into `(name, value)` pairs
///
/// Unquoted values are accepted. A stray `/` or unexpected quote is
/// skipped rather than rejected.
pub fn lex_attributes(raw: &str) -> Vec<(&str, Option<&str>)> {
    let tokens: Vec<_> = AttrToken::lexer(raw).filter_map(Result::ok).collect();
    let mut attrs = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            AttrToken::Name(name) => {
                if tokens.get(i + 1) == Some(&AttrToken::Eq) {
                    let value = match tokens.get(i + 2) {
                        Some(AttrToken::DoubleQuoted(v))
                        | Some(AttrToken::SingleQuoted(v))
                        | Some(AttrToken::Name(v)) => Some(*v),
                        _ => None,
                    };
                    match value {
                        Some(v) => {
                            attrs.push((name, Some(v)));
                            i += 3;
                        }
                        None => {
                            attrs.push((name, Some("")));
                            i += 2;
                        }
                    }
                } else {
                    attrs.push((name, None));
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        lex(source).filter_map(|r| r.ok()).map(|t| t.token).collect()
    }

    #[test]
    fn test_lex_elements_and_text() {
        let toks = tokens(r#"<mj-text align="left">Hello</mj-text>"#);
        assert_eq!(
            toks,
            vec![
                Token::OpenTag(r#"<mj-text align="left">"#),
                Token::Text("Hello"),
                Token::CloseTag("mj-text"),
            ]
        );
    }

    #[test]
    fn test_open_tag_respects_quotes() {
        let toks = tokens(r#"<mj-image alt="a > b" src='x' />"#);
        assert_eq!(toks, vec![Token::OpenTag(r#"<mj-image alt="a > b" src='x' />"#)]);
    }

    #[test]
    fn test_lex_comment() {
        let toks = tokens("<!-- header -- block -->x");
        assert_eq!(toks, vec![Token::Comment(" header -- block "), Token::Text("x")]);
    }

    #[test]
    fn test_unterminated_tag_is_an_error() {
        let results: Vec<_> = lex("<mj-text align=\"left\"").collect();
        assert!(results.iter().any(|r| r.is_err()));
    }

    #[test]
    fn test_split_open_tag() {
        let (name, attrs, self_closing) = split_open_tag(r#"<mj-image src="a.png" />"#);
        assert_eq!(name, "mj-image");
        assert_eq!(attrs.trim(), r#"src="a.png""#);
        assert!(self_closing);

        let (name, attrs, self_closing) = split_open_tag("<br>");
        assert_eq!(name, "br");
        assert_eq!(attrs, "");
        assert!(!self_closing);
    }

    #[test]
    fn test_lex_attributes() {
        let attrs = lex_attributes(r#" alt="Logo" width=120 hidden css-class='a b'"#);
        assert_eq!(
            attrs,
            vec![
                ("alt", Some("Logo")),
                ("width", Some("120")),
                ("hidden", None),
                ("css-class", Some("a b")),
            ]
        );
    }
}
