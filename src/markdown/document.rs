//! Structured document tree
//!
//! This is the representation the rich-text editing surface works on. Every
//! node kind is a variant with a fixed attribute set, so traversal is a
//! pattern match rather than attribute probing.

use crate::markdown::language::Language;
use std::borrow::Cow;

// ─────────────────────────────────────────────────────────────────────────────
// Block Attributes
// ─────────────────────────────────────────────────────────────────────────────

/// Heading level (H1-H6). The markup dialect only produces H1-H3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    H1 = 1,
    H2 = 2,
    H3 = 3,
    H4 = 4,
    H5 = 5,
    H6 = 6,
}

impl From<u8> for HeadingLevel {
    fn from(level: u8) -> Self {
        match level {
            0 | 1 => HeadingLevel::H1,
            2 => HeadingLevel::H2,
            3 => HeadingLevel::H3,
            4 => HeadingLevel::H4,
            5 => HeadingLevel::H5,
            _ => HeadingLevel::H6,
        }
    }
}

impl HeadingLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A fenced code block.
///
/// The code is kept in its HTML-escaped stored form, the way the editing
/// surface holds it; [`CodeBlock::text`] decodes it back to literal
/// characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Language,
    pub html: String,
}

impl CodeBlock {
    /// Create a code block from literal code text.
    pub fn new(language: Language, text: &str) -> Self {
        Self {
            language,
            html: html_escape::encode_safe(text).into_owned(),
        }
    }

    /// Create a code block from an already-escaped stored representation.
    pub fn from_html(language: Language, html: impl Into<String>) -> Self {
        Self {
            language,
            html: html.into(),
        }
    }

    /// The literal code text with entities decoded.
    pub fn text(&self) -> Cow<'_, str> {
        html_escape::decode_html_entities(&self.html)
    }

    /// Replace the code with new literal text.
    pub fn set_text(&mut self, text: &str) {
        self.html = html_escape::encode_safe(text).into_owned();
    }

    /// Whether the block holds no code at all (empty or a lone newline).
    pub fn is_empty(&self) -> bool {
        let text = self.text();
        text.is_empty() || text == "\n"
    }
}

/// A block-level image with a user-adjustable width.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageNode {
    pub src: String,
    pub alt: String,
    /// Width in pixels; `None` fills the available space
    pub width: Option<u32>,
}

impl ImageNode {
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
            width: None,
        }
    }

    /// CSS width value, `100%` when unset.
    pub fn width_css(&self) -> String {
        match self.width {
            Some(px) => format!("{}px", px),
            None => "100%".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline Content
// ─────────────────────────────────────────────────────────────────────────────

/// Formatting applied to a run of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    /// Link target, when the run is part of a link
    pub link: Option<String>,
}

impl Marks {
    pub fn is_plain(&self) -> bool {
        *self == Marks::default()
    }

    pub fn with_bold(&self) -> Self {
        Self {
            bold: true,
            ..self.clone()
        }
    }

    pub fn with_italic(&self) -> Self {
        Self {
            italic: true,
            ..self.clone()
        }
    }

    pub fn with_code(&self) -> Self {
        Self {
            code: true,
            ..self.clone()
        }
    }

    pub fn with_link(&self, href: impl Into<String>) -> Self {
        Self {
            link: Some(href.into()),
            ..self.clone()
        }
    }
}

/// Inline content of a heading, paragraph, or list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// A run of text sharing one set of marks
    Text { text: String, marks: Marks },
    /// An inline image leaf
    Image { src: String, alt: String },
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Inline::Text {
            text: text.into(),
            marks,
        }
    }

    pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Inline::Image {
            src: src.into(),
            alt: alt.into(),
        }
    }
}

/// Concatenated text of a run of inline nodes (images contribute nothing).
pub fn inline_text(content: &[Inline]) -> String {
    content
        .iter()
        .filter_map(|node| match node {
            Inline::Text { text, .. } => Some(text.as_str()),
            Inline::Image { .. } => None,
        })
        .collect()
}

/// Whether inline content carries nothing worth keeping.
pub fn inline_is_empty(content: &[Inline]) -> bool {
    content.iter().all(|node| match node {
        Inline::Text { text, .. } => text.trim().is_empty(),
        Inline::Image { src, .. } => src.trim().is_empty(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Blocks
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of a bulleted or ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

impl ListItem {
    /// A list item wrapping a single paragraph.
    pub fn paragraph(content: Vec<Inline>) -> Self {
        Self {
            blocks: vec![Block::Paragraph(content)],
        }
    }

    /// An item is empty when it holds nothing or only empty paragraphs.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(Block::is_empty)
    }
}

/// A block-level node of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: HeadingLevel,
        content: Vec<Inline>,
    },
    Paragraph(Vec<Inline>),
    Blockquote(Vec<Block>),
    BulletList(Vec<ListItem>),
    OrderedList(Vec<ListItem>),
    CodeBlock(CodeBlock),
    Image(ImageNode),
    /// A line that was already structural HTML, kept verbatim
    RawHtml(String),
}

impl Block {
    /// Short name of the node kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Paragraph(_) => "paragraph",
            Block::Blockquote(_) => "blockquote",
            Block::BulletList(_) => "bulletList",
            Block::OrderedList(_) => "orderedList",
            Block::CodeBlock(_) => "codeBlock",
            Block::Image(_) => "image",
            Block::RawHtml(_) => "rawHtml",
        }
    }

    /// Whether the block carries no content.
    pub fn is_empty(&self) -> bool {
        match self {
            Block::Heading { content, .. } | Block::Paragraph(content) => inline_is_empty(content),
            Block::Blockquote(children) => children.iter().all(Block::is_empty),
            Block::BulletList(items) | Block::OrderedList(items) => {
                items.iter().all(ListItem::is_empty)
            }
            Block::CodeBlock(code) => code.is_empty(),
            Block::Image(image) => image.src.trim().is_empty(),
            Block::RawHtml(html) => html.trim().is_empty(),
        }
    }

    /// Direct child blocks, in order. List items count as one child each,
    /// addressed through their own block list.
    pub fn child_blocks(&self) -> Vec<&Block> {
        match self {
            Block::Blockquote(children) => children.iter().collect(),
            Block::BulletList(items) | Block::OrderedList(items) => {
                items.iter().flat_map(|item| item.blocks.iter()).collect()
            }
            _ => Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Addressing
// ─────────────────────────────────────────────────────────────────────────────

/// Address of a block inside a document.
///
/// Each step is a child index. Inside a list, a step selects the item and
/// the next step selects a block within that item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root(index: usize) -> Self {
        NodePath(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(index);
        NodePath(steps)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// A whole structured document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(Block::is_empty)
    }

    /// Visit every block depth-first with its path.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&NodePath, &Block),
    {
        fn walk_blocks<F>(blocks: &[Block], parent: Option<&NodePath>, visit: &mut F)
        where
            F: FnMut(&NodePath, &Block),
        {
            for (index, block) in blocks.iter().enumerate() {
                let path = match parent {
                    Some(p) => p.child(index),
                    None => NodePath::root(index),
                };
                visit(&path, block);
                match block {
                    Block::Blockquote(children) => walk_blocks(children, Some(&path), visit),
                    Block::BulletList(items) | Block::OrderedList(items) => {
                        for (item_index, item) in items.iter().enumerate() {
                            walk_blocks(&item.blocks, Some(&path.child(item_index)), visit);
                        }
                    }
                    _ => {}
                }
            }
        }

        walk_blocks(&self.blocks, None, &mut visit);
    }

    /// Look up a block by path.
    pub fn get(&self, path: &NodePath) -> Option<&Block> {
        let (first, rest) = path.0.split_first()?;
        let mut current = self.blocks.get(*first)?;
        let mut steps = rest.iter();
        while let Some(step) = steps.next() {
            current = match current {
                Block::Blockquote(children) => children.get(*step)?,
                Block::BulletList(items) | Block::OrderedList(items) => {
                    let item = items.get(*step)?;
                    item.blocks.get(*steps.next()?)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Look up a block mutably by path.
    pub fn get_mut(&mut self, path: &NodePath) -> Option<&mut Block> {
        let (first, rest) = path.0.split_first()?;
        let mut current = self.blocks.get_mut(*first)?;
        let mut steps = rest.iter();
        while let Some(step) = steps.next() {
            current = match current {
                Block::Blockquote(children) => children.get_mut(*step)?,
                Block::BulletList(items) | Block::OrderedList(items) => {
                    let item = items.get_mut(*step)?;
                    item.blocks.get_mut(*steps.next()?)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Remove the block at `path`, returning it.
    pub fn remove(&mut self, path: &NodePath) -> Option<Block> {
        let (last, parent_steps) = path.0.split_last()?;
        if parent_steps.is_empty() {
            return (*last < self.blocks.len()).then(|| self.blocks.remove(*last));
        }

        // Inside a list the parent path ends at an item index
        if parent_steps.len() >= 2 {
            let (item_index, list_steps) = parent_steps.split_last()?;
            let list_path = NodePath(list_steps.to_vec());
            if let Some(Block::BulletList(items) | Block::OrderedList(items)) =
                self.get_mut(&list_path)
            {
                let item = items.get_mut(*item_index)?;
                return (*last < item.blocks.len()).then(|| item.blocks.remove(*last));
            }
        }

        match self.get_mut(&NodePath(parent_steps.to_vec()))? {
            Block::Blockquote(children) => {
                (*last < children.len()).then(|| children.remove(*last))
            }
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
