//! markcard
//!
//! Conversion engine between Markdown-style markup and a structured document
//! tree, with image externalization, resizable image and language-tagged code
//! nodes, and syntax-highlighted HTML rendering for cards.

pub mod config;
pub mod editor;
pub mod error;
pub mod markdown;
pub mod state;

pub use error::{Error, Result};
pub use state::EditingSession;
