//! # mailslot-parser
//!
//! Lossless markup tree for email templates: a logos lexer, a stack-based
//! tree builder, a compact serializer and visitor traits used by the
//! editing engine.

pub mod ast;
pub mod error;
pub mod id_generator;
pub mod lexer;
pub mod parser;
pub mod serializer;
pub mod visitor;


pub use ast::{Attribute, Attributes, Child, Closing, Markup, Node, NodeId};
pub use error::{format_error, ParseError, ParseResult, TokenSpan};
pub use id_generator::{get_template_seed, IdGenerator};
pub use parser::{is_void_element, parse, parse_fragment, parse_with_ids, Parser};
pub use serializer::{serialize, serialize_children, serialize_node, Serializer};
pub use visitor::{Visitor, VisitorMut};
