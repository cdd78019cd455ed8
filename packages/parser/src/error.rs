//! Error types for the markup parser

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Byte range in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected closing tag </{tag}> at {span:?}: expected {expected}")]
    UnexpectedCloseTag {
        tag: String,
        expected: String,
        span: TokenSpan,
    },

    #[error("Element <{tag}> opened at {span:?} is never closed")]
    UnclosedTag { tag: String, span: TokenSpan },

    #[error("Unterminated tag at {span:?}")]
    UnterminatedTag { span: TokenSpan },

    #[error("Unterminated comment at {span:?}")]
    UnterminatedComment { span: TokenSpan },

    #[error("Invalid syntax at {span:?}: {message}")]
    InvalidSyntax { span: TokenSpan, message: String },
}

impl ParseError {
    pub fn span(&self) -> TokenSpan {
        match self {
            ParseError::UnexpectedCloseTag { span, .. }
            | ParseError::UnclosedTag { span, .. }
            | ParseError::UnterminatedTag { span }
            | ParseError::UnterminatedComment { span }
            | ParseError::InvalidSyntax { span, .. } => *span,
        }
    }

    pub fn invalid_syntax(span: TokenSpan, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            span,
            message: message.into(),
        }
    }

    fn label(&self) -> String {
        match self {
            ParseError::UnexpectedCloseTag { expected, .. } => format!("expected {}", expected),
            ParseError::UnclosedTag { tag, .. } => format!("<{}> opened here", tag),
            ParseError::UnterminatedTag { .. } => "missing `>`".to_string(),
            ParseError::UnterminatedComment { .. } => "missing `-->`".to_string(),
            ParseError::InvalidSyntax { message, .. } => message.clone(),
        }
    }
}

/// Pretty-print an error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span();
    let end = span.end.max(span.start + 1).min(source.len().max(1));
    let start = span.start.min(end.saturating_sub(1));

    let mut output = Vec::new();
    let report = Report::build(ReportKind::Error, filename, start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, start..end))
                .with_color(Color::Red)
                .with_message(error.label()),
        )
        .finish();

    if report
        .write((filename, Source::from(source)), &mut output)
        .is_err()
    {
        return error.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| error.to_string())
}

/// Plain formatting fallback when ariadne is disabled
#[cfg(not(feature = "pretty-errors"))]
pub fn format_error(_source: &str, filename: &str, error: &ParseError) -> String {
    format!("{}: {} ({})", filename, error, error.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_accessor() {
        let err = ParseError::UnclosedTag {
            tag: "mj-text".to_string(),
            span: TokenSpan::new(3, 12),
        };
        assert_eq!(err.span(), TokenSpan::new(3, 12));
    }

    #[test]
    fn test_format_error_mentions_message() {
        let source = "<mj-text>hello";
        let err = ParseError::UnclosedTag {
            tag: "mj-text".to_string(),
            span: TokenSpan::new(0, 9),
        };
        let formatted = format_error(source, "template.mjml", &err);
        assert!(formatted.contains("never closed"));
    }
}
