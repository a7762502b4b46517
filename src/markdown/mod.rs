//! Markup conversion and rendering module
//!
//! This module converts between markup text and the structured document tree
//! used by the visual editor, and renders either one to HTML.
//!
//! # Features
//! - Parse markup text into a typed [`Document`] tree
//! - Serialize a document back to markup, renumbering ordered lists
//! - Keep long image sources out of markup through an [`ImageRegistry`]
//! - Render documents and markup to HTML
//! - Syntax highlighting for code blocks using syntect
//!
//! # Example
//! ```ignore
//! use markcard::markdown::{parse_markup, serialize_document, ImageRegistry};
//!
//! let mut registry = ImageRegistry::new();
//! let doc = parse_markup("# Hello\n\nThis is **bold** text.");
//! let markup = serialize_document(&doc, &mut registry);
//! ```

pub mod document;
pub mod html;
pub mod images;
pub mod inline;
pub mod language;
pub mod parser;
pub mod serializer;
pub mod syntax;

pub use document::{
    Block, CodeBlock, Document, HeadingLevel, ImageNode, Inline, ListItem, Marks, NodePath,
};
pub use html::{render_card_document, render_card_html, render_document};
pub use images::{is_reference, strip_preview_comments, ImageRegistry};
pub use inline::{parse_inline, serialize_inline, InlineRule, INLINE_RULES};
pub use language::{Language, LanguageOption, LANGUAGES};
pub use parser::parse_markup;
pub use serializer::{remove_empty_list_items, serialize_document};
pub use syntax::{get_highlighter, highlight_html, resolve_images, CodeTokenizer, SyntaxHighlighter};
