//! Block-level markup parser
//!
//! A line-oriented state machine that groups markup lines into document
//! blocks. Inline spans inside each block are handed to
//! [`parse_inline`](crate::markdown::inline::parse_inline).
//!
//! The parser is a best-effort reading of a small Markdown dialect and never
//! fails: unrecognized line shapes become paragraphs.
//!
//! # Example
//! ```ignore
//! use markcard::markdown::parse_markup;
//!
//! let doc = parse_markup("# Hello\n\n* one\n* two");
//! assert_eq!(doc.blocks.len(), 2);
//! ```

use crate::markdown::document::{
    inline_is_empty, Block, CodeBlock, Document, HeadingLevel, ImageNode, ListItem,
};
use crate::markdown::images::is_preview_comment;
use crate::markdown::inline::parse_inline;
use crate::markdown::language::Language;
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Line Shapes
// ─────────────────────────────────────────────────────────────────────────────

const FENCE: &str = "```";

/// Heading prefixes, longest first so `## ` is not read as `# `.
const HEADING_PREFIXES: [(&str, u8); 6] = [
    ("###### ", 6),
    ("##### ", 5),
    ("#### ", 4),
    ("### ", 3),
    ("## ", 2),
    ("# ", 1),
];

fn bullet_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[*-](?:\s+(.*))?$").expect("valid bullet regex"))
}

fn ordered_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\.(?:\s+(.*))?$").expect("valid ordered item regex"))
}

fn standalone_image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^!\[([^\]]*)\]\(([^)]*)\)$").expect("valid standalone image regex")
    })
}

/// Lines that are already structural output, e.g. fed back from rendering.
fn tagged_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^<(h[1-6]|p|ul|ol|li|blockquote|pre|img)[\s>/]").expect("valid tag regex")
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser State
// ─────────────────────────────────────────────────────────────────────────────

/// Accumulation state between lines. The variants are mutually exclusive.
#[derive(Debug, Default)]
enum ParseState {
    #[default]
    None,
    InUnorderedList(Vec<ListItem>),
    InOrderedList(Vec<ListItem>),
    /// `indent` is the fence's leading whitespace, stripped from each code
    /// line. An indented fence inside a list keeps the list as `parent` and
    /// attaches the block to its last item.
    InCodeBlock {
        language: Language,
        lines: Vec<String>,
        indent: usize,
        parent: Option<(ListKind, Vec<ListItem>)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ParseState {
    fn list(kind: ListKind, items: Vec<ListItem>) -> Self {
        match kind {
            ListKind::Unordered => ParseState::InUnorderedList(items),
            ListKind::Ordered => ParseState::InOrderedList(items),
        }
    }
}

#[derive(Debug, Default)]
struct BlockParser {
    blocks: Vec<Block>,
    state: ParseState,
}

impl BlockParser {
    fn feed_line(&mut self, line: &str) {
        let trimmed = line.trim();

        if let Some(info) = trimmed.strip_prefix(FENCE) {
            self.toggle_code_block(info, leading_whitespace(line));
            return;
        }

        if let ParseState::InCodeBlock { lines, indent, .. } = &mut self.state {
            lines.push(strip_indent(line, *indent).to_string());
            return;
        }

        if trimmed.is_empty() {
            self.flush_list();
            return;
        }

        if is_preview_comment(trimmed) {
            return;
        }

        if let Some((level, rest)) = heading_line(trimmed) {
            self.flush_list();
            self.blocks.push(Block::Heading {
                level: HeadingLevel::from(level),
                content: parse_inline(rest.trim()),
            });
            return;
        }

        if let Some(rest) = trimmed.strip_prefix('>') {
            self.flush_list();
            let content = parse_inline(rest.trim());
            if !inline_is_empty(&content) {
                self.blocks
                    .push(Block::Blockquote(vec![Block::Paragraph(content)]));
            }
            return;
        }

        if let Some(caps) = bullet_item_regex().captures(trimmed) {
            let content = caps.get(1).map_or("", |m| m.as_str());
            self.push_list_item(ListKind::Unordered, content);
            return;
        }

        if let Some(caps) = ordered_item_regex().captures(trimmed) {
            let content = caps.get(2).map_or("", |m| m.as_str());
            self.push_list_item(ListKind::Ordered, content);
            return;
        }

        if let Some(caps) = standalone_image_regex().captures(trimmed) {
            self.flush_list();
            let alt = caps.get(1).map_or("", |m| m.as_str());
            let src = caps.get(2).map_or("", |m| m.as_str()).trim();
            if !src.is_empty() {
                self.blocks.push(Block::Image(ImageNode::new(src, alt)));
            }
            return;
        }

        if tagged_line_regex().is_match(trimmed) {
            self.flush_list();
            self.blocks.push(Block::RawHtml(trimmed.to_string()));
            return;
        }

        self.flush_list();
        let content = parse_inline(trimmed);
        if !inline_is_empty(&content) {
            self.blocks.push(Block::Paragraph(content));
        }
    }

    fn toggle_code_block(&mut self, info: &str, indent: usize) {
        match std::mem::take(&mut self.state) {
            ParseState::InCodeBlock {
                language,
                lines,
                parent,
                ..
            } => {
                let code = Block::CodeBlock(CodeBlock::new(language, &lines.join("\n")));
                match parent {
                    Some((kind, mut items)) => {
                        if let Some(item) = items.last_mut() {
                            item.blocks.push(code);
                        }
                        self.state = ParseState::list(kind, items);
                    }
                    None => self.blocks.push(code),
                }
            }
            previous => {
                let parent = match previous {
                    ParseState::InUnorderedList(items) if indent > 0 && !items.is_empty() => {
                        Some((ListKind::Unordered, items))
                    }
                    ParseState::InOrderedList(items) if indent > 0 && !items.is_empty() => {
                        Some((ListKind::Ordered, items))
                    }
                    other => {
                        self.state = other;
                        self.flush_list();
                        None
                    }
                };
                let language = Language::from_tag(info.trim());
                if !info.trim().is_empty() && language.is_plain_text() {
                    debug!("Unknown code block language '{}', using plain text", info.trim());
                }
                self.state = ParseState::InCodeBlock {
                    language,
                    lines: Vec::new(),
                    indent,
                    parent,
                };
            }
        }
    }

    fn push_list_item(&mut self, kind: ListKind, content: &str) {
        let same_kind = matches!(
            (&self.state, kind),
            (ParseState::InUnorderedList(_), ListKind::Unordered)
                | (ParseState::InOrderedList(_), ListKind::Ordered)
        );
        if !same_kind {
            self.flush_list();
            self.state = ParseState::list(kind, Vec::new());
        }

        let inline = parse_inline(content.trim());
        if inline_is_empty(&inline) {
            return;
        }
        if let ParseState::InUnorderedList(items) | ParseState::InOrderedList(items) =
            &mut self.state
        {
            items.push(ListItem::paragraph(inline));
        }
    }

    /// Emit any open list. Code block state is left alone.
    fn flush_list(&mut self) {
        match std::mem::take(&mut self.state) {
            ParseState::InUnorderedList(items) => {
                if !items.is_empty() {
                    self.blocks.push(Block::BulletList(items));
                }
            }
            ParseState::InOrderedList(items) => {
                if !items.is_empty() {
                    self.blocks.push(Block::OrderedList(items));
                }
            }
            other => self.state = other,
        }
    }

    fn finish(mut self) -> Document {
        if matches!(self.state, ParseState::InCodeBlock { .. }) {
            debug!("Unclosed code block at end of input");
            self.toggle_code_block("", 0);
        }
        self.flush_list();
        Document::new(self.blocks)
    }
}

fn leading_whitespace(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Drop up to `indent` bytes of leading spaces or tabs.
fn strip_indent(line: &str, indent: usize) -> &str {
    let strip = line
        .bytes()
        .take(indent)
        .take_while(|b| *b == b' ' || *b == b'\t')
        .count();
    &line[strip..]
}

fn heading_line(trimmed: &str) -> Option<(u8, &str)> {
    HEADING_PREFIXES
        .iter()
        .find_map(|(prefix, level)| trimmed.strip_prefix(prefix).map(|rest| (*level, rest)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Parse markup text into a fresh document.
///
/// Preview comment lines written next to externalized images are ignored.
/// Image identifiers are kept as-is; they are resolved against the session
/// registry at render time.
pub fn parse_markup(markup: &str) -> Document {
    let mut parser = BlockParser::default();
    for line in markup.lines() {
        parser.feed_line(line);
    }
    let doc = parser.finish();
    debug!("Parsed markup into {} blocks", doc.blocks.len());
    doc
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
