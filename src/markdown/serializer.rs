//! Document-to-markup serializer
//!
//! Walks a [`Document`] and regenerates markup text, the inverse of
//! [`parse_markup`](crate::markdown::parser::parse_markup). Block siblings are
//! separated by a blank line.
//!
//! Long image sources are externalized through the session's
//! [`ImageRegistry`]: the image is written by identifier and a preview comment
//! line follows the line that contains it.
//!
//! Literal text that would read back as markup is backslash-escaped, so a
//! tree survives a trip through markup unchanged.

use crate::markdown::document::{Block, Document, ListItem};
use crate::markdown::images::{is_preview_comment, ImageRegistry};
use crate::markdown::inline::{image_markup, serialize_inline};
use log::debug;

const BLOCK_SEPARATOR: &str = "\n\n";

// ─────────────────────────────────────────────────────────────────────────────
// Cleanup
// ─────────────────────────────────────────────────────────────────────────────

/// Remove empty list items, and lists left with no items, at any depth.
///
/// The editing surface can leave stray empty items behind after some edits.
/// Returns the number of items removed.
pub fn remove_empty_list_items(doc: &mut Document) -> usize {
    let removed = clean_blocks(&mut doc.blocks);
    if removed > 0 {
        debug!("Removed {} empty list items", removed);
    }
    removed
}

fn clean_blocks(blocks: &mut Vec<Block>) -> usize {
    let mut removed = 0;
    for block in blocks.iter_mut() {
        match block {
            Block::Blockquote(children) => removed += clean_blocks(children),
            Block::BulletList(items) | Block::OrderedList(items) => {
                removed += clean_items(items)
            }
            _ => {}
        }
    }
    blocks.retain(|block| match block {
        Block::BulletList(items) | Block::OrderedList(items) => !items.is_empty(),
        _ => true,
    });
    removed
}

fn clean_items(items: &mut Vec<ListItem>) -> usize {
    let mut removed = 0;
    for item in items.iter_mut() {
        removed += clean_blocks(&mut item.blocks);
    }
    let before = items.len();
    items.retain(|item| !item.is_empty());
    removed + (before - items.len())
}

// ─────────────────────────────────────────────────────────────────────────────
// Serialization
// ─────────────────────────────────────────────────────────────────────────────

/// Serialize a document to markup text.
///
/// The document itself is not modified; empty list items are dropped from a
/// working copy before conversion.
pub fn serialize_document(doc: &Document, registry: &mut ImageRegistry) -> String {
    let mut doc = doc.clone();
    remove_empty_list_items(&mut doc);

    let markup = doc
        .blocks
        .iter()
        .filter_map(|block| serialize_block(block, registry))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR);

    debug!(
        "Serialized {} blocks ({} registered images)",
        doc.blocks.len(),
        registry.len()
    );
    markup
}

fn serialize_block(block: &Block, registry: &mut ImageRegistry) -> Option<String> {
    // Preview comments go on the lines right after the block that holds the image
    let mut previews = Vec::new();
    let markup = match block {
        Block::Heading { level, content } => {
            let text = serialize_inline(content, registry, &mut previews);
            if text.trim().is_empty() {
                return None;
            }
            format!("{} {}", "#".repeat(level.as_u8() as usize), text)
        }
        Block::Paragraph(content) => {
            escape_block_marker(&serialize_inline(content, registry, &mut previews))
        }
        Block::Blockquote(children) => {
            let inner = serialize_children(children, registry)?;
            prefix_lines(&inner, "> ", "> ")
        }
        Block::BulletList(items) => serialize_list(items, registry, |_| "* ".to_string())?,
        Block::OrderedList(items) => {
            serialize_list(items, registry, |index| format!("{}. ", index + 1))?
        }
        Block::CodeBlock(code) => {
            let text = code.text();
            let body = text.strip_suffix('\n').unwrap_or(&text);
            if body.is_empty() {
                format!("```{}\n```", code.language.fence_tag())
            } else {
                format!("```{}\n{}\n```", code.language.fence_tag(), body)
            }
        }
        Block::Image(image) => image_markup(&image.alt, &image.src, registry, &mut previews),
        Block::RawHtml(html) => html.clone(),
    };

    if markup.trim().is_empty() {
        None
    } else if previews.is_empty() {
        Some(markup)
    } else {
        Some(format!("{}\n{}", markup, previews.join("\n")))
    }
}

/// Blocks nested in a quote or list item, one per line.
fn serialize_children(children: &[Block], registry: &mut ImageRegistry) -> Option<String> {
    let parts: Vec<String> = children
        .iter()
        .filter_map(|child| serialize_block(child, registry))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

fn serialize_list<F>(items: &[ListItem], registry: &mut ImageRegistry, marker: F) -> Option<String>
where
    F: Fn(usize) -> String,
{
    let mut lines = Vec::new();
    // Numbering counts only items that produce output
    for item in items {
        let Some(body) = serialize_children(&item.blocks, registry) else {
            continue;
        };
        let first = marker(lines.len());
        let rest = " ".repeat(first.len());
        lines.push(prefix_lines(&body, &first, &rest));
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Prefix every line except preview comments, which the parser reads at
/// column zero. Code inside an item keeps its trailing whitespace; the
/// parser strips the fence indent back off.
fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(index, line)| {
            let prefix = if index == 0 { first } else { rest };
            if index > 0 && is_preview_comment(line) {
                line.to_string()
            } else if line.is_empty() {
                prefix.trim_end().to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape a paragraph's first character when the line parser would read it
/// as block syntax.
fn escape_block_marker(line: &str) -> String {
    let bytes = line.as_bytes();
    let followed_by_space = |at: usize| {
        line.get(at..)
            .map_or(true, |rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    };

    let escape_at = match bytes.first() {
        Some(b'>') | Some(b'<') => Some(0),
        Some(b'-') if followed_by_space(1) => Some(0),
        Some(b'#') => {
            let hashes = bytes.iter().take_while(|&&b| b == b'#').count();
            (hashes <= 6 && line[hashes..].starts_with(' ')).then_some(0)
        }
        Some(b) if b.is_ascii_digit() => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            (bytes.get(digits) == Some(&b'.') && followed_by_space(digits + 1)).then_some(digits)
        }
        _ => None,
    };

    match escape_at {
        Some(at) => format!("{}\\{}", &line[..at], &line[at..]),
        None => line.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::document::{CodeBlock, HeadingLevel, ImageNode, Inline, Marks};
    use crate::markdown::language::Language;
    use crate::markdown::parser::parse_markup;

    fn item(text: &str) -> ListItem {
        ListItem::paragraph(vec![Inline::text(text)])
    }

    fn base64_source(len: usize) -> String {
        let prefix = "data:image/png;base64,";
        format!("{}{}", prefix, "iVBO".repeat(len).chars().take(len - prefix.len()).collect::<String>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Round Trips
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_short_content_roundtrip() {
        let markup = "# Title\n\n\
                      ## Sub with `code`\n\n\
                      Some **bold** and *italic* text.\n\n\
                      > quoted *line*\n\n\
                      * one\n* two **strong**\n\n\
                      1. first\n2. second\n\n\
                      ```rust\nfn main() {\n    println!(\"<hi>\");\n}\n```";
        let mut registry = ImageRegistry::new();
        let doc = parse_markup(markup);
        assert_eq!(serialize_document(&doc, &mut registry), markup);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_roundtrip_normalizes_markers() {
        let mut registry = ImageRegistry::new();
        let doc = parse_markup("-   one\n- two\n3. x\n9. y");
        assert_eq!(
            serialize_document(&doc, &mut registry),
            "* one\n* two\n\n1. x\n2. y"
        );
    }

    #[test]
    fn test_roundtrip_is_stable_after_first_pass() {
        let mut registry = ImageRegistry::new();
        let input = "#  Spaced\n> a\n> b\ntext\n* x\n\n\n```js\nlet a = 1 && 2;\n```";
        let first = serialize_document(&parse_markup(input), &mut registry);
        let second = serialize_document(&parse_markup(&first), &mut registry);
        assert_eq!(first, second);
        assert_eq!(parse_markup(&first), parse_markup(input));
    }

    #[test]
    fn test_bare_fence_roundtrip() {
        let mut registry = ImageRegistry::new();
        let doc = parse_markup("```\nplain\n```");
        assert!(matches!(
            &doc.blocks[..],
            [Block::CodeBlock(code)] if code.language.is_plain_text()
        ));
        assert_eq!(serialize_document(&doc, &mut registry), "```\nplain\n```");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Images
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_image_externalization_roundtrip() {
        let source = base64_source(200);
        assert_eq!(source.chars().count(), 200);
        let doc = Document::new(vec![Block::Image(ImageNode::new(source.clone(), "pic"))]);
        let mut registry = ImageRegistry::new();

        let markup = serialize_document(&doc, &mut registry);
        let mut lines = markup.lines();
        assert_eq!(lines.next(), Some("![pic](__IMG_1__)"));
        let comment = lines.next().unwrap_or_default();
        assert!(comment.starts_with("<!-- __IMG_1__: data:image/png;base64,"));
        assert!(comment.contains("[base64]"));
        assert!(!markup.contains(&source));

        let reparsed = parse_markup(&markup);
        match &reparsed.blocks[..] {
            [Block::Image(image)] => assert_eq!(registry.resolve(&image.src), source),
            other => panic!("expected one image block, got {:?}", other),
        }
    }

    #[test]
    fn test_short_image_is_not_registered() {
        let url = "http://example.com/img/abc.png";
        assert_eq!(url.len(), 30);
        let doc = Document::new(vec![Block::Image(ImageNode::new(url, "abc"))]);
        let mut registry = ImageRegistry::new();

        let markup = serialize_document(&doc, &mut registry);

        assert_eq!(markup, format!("![abc]({})", url));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_inline_image_preview_follows_block() {
        let source = base64_source(120);
        let doc = Document::new(vec![
            Block::Paragraph(vec![Inline::text("look "), Inline::image(source, "x")]),
            Block::Paragraph(vec![Inline::text("next")]),
        ]);
        let mut registry = ImageRegistry::new();

        let markup = serialize_document(&doc, &mut registry);
        let lines: Vec<&str> = markup.lines().collect();

        assert_eq!(lines[0], "look ![x](__IMG_1__)");
        assert!(lines[1].starts_with("<!-- __IMG_1__:"));
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "next");
    }

    #[test]
    fn test_repeated_source_mints_distinct_identifiers() {
        let source = base64_source(100);
        let doc = Document::new(vec![
            Block::Image(ImageNode::new(source.clone(), "a")),
            Block::Image(ImageNode::new(source, "b")),
        ]);
        let mut registry = ImageRegistry::new();
        let markup = serialize_document(&doc, &mut registry);
        assert!(markup.contains("__IMG_1__"));
        assert!(markup.contains("__IMG_2__"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_image_without_source_is_skipped() {
        let doc = Document::new(vec![
            Block::Image(ImageNode::new("", "ghost")),
            Block::Paragraph(vec![Inline::text("kept")]),
        ]);
        let mut registry = ImageRegistry::new();
        assert_eq!(serialize_document(&doc, &mut registry), "kept");
    }

    #[test]
    fn test_image_width_is_not_written() {
        let mut image = ImageNode::new("a.png", "a");
        image.width = Some(240);
        let doc = Document::new(vec![Block::Image(image)]);
        let mut registry = ImageRegistry::new();
        assert_eq!(serialize_document(&doc, &mut registry), "![a](a.png)");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blocks
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_ordered_list_is_renumbered() {
        let doc = Document::new(vec![Block::OrderedList(vec![
            item("a"),
            ListItem::default(),
            item("b"),
            item("c"),
        ])]);
        let mut registry = ImageRegistry::new();
        assert_eq!(
            serialize_document(&doc, &mut registry),
            "1. a\n2. b\n3. c"
        );
    }

    #[test]
    fn test_code_entities_are_decoded() {
        let code = CodeBlock::from_html(
            Language::Html,
            "&lt;a title=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;",
        );
        let doc = Document::new(vec![Block::CodeBlock(code)]);
        let mut registry = ImageRegistry::new();
        assert_eq!(
            serialize_document(&doc, &mut registry),
            "```html\n<a title=\"x\">&'</a>\n```"
        );
    }

    #[test]
    fn test_code_trailing_newline_is_trimmed_once() {
        let doc = Document::new(vec![Block::CodeBlock(CodeBlock::new(
            Language::Python,
            "x = 1\n",
        ))]);
        let mut registry = ImageRegistry::new();
        assert_eq!(
            serialize_document(&doc, &mut registry),
            "```python\nx = 1\n```"
        );
    }

    #[test]
    fn test_blockquote_prefixes_each_line() {
        let doc = Document::new(vec![Block::Blockquote(vec![
            Block::Paragraph(vec![Inline::text("one")]),
            Block::Paragraph(vec![Inline::marked("two", Marks::default().with_bold())]),
        ])]);
        let mut registry = ImageRegistry::new();
        assert_eq!(
            serialize_document(&doc, &mut registry),
            "> one\n> **two**"
        );
    }

    #[test]
    fn test_raw_html_is_verbatim() {
        let doc = Document::new(vec![
            Block::RawHtml("<h2>Kept</h2>".to_string()),
            Block::Heading {
                level: HeadingLevel::H1,
                content: vec![Inline::text("T")],
            },
        ]);
        let mut registry = ImageRegistry::new();
        assert_eq!(
            serialize_document(&doc, &mut registry),
            "<h2>Kept</h2>\n\n# T"
        );
    }

    #[test]
    fn test_deep_headings_roundtrip() {
        let markup = "#### Four\n\n##### Five\n\n###### Six";
        let doc = parse_markup(markup);
        assert!(matches!(
            doc.blocks[0],
            Block::Heading { level: HeadingLevel::H4, .. }
        ));
        let mut registry = ImageRegistry::new();
        assert_eq!(serialize_document(&doc, &mut registry), markup);
    }

    #[test]
    fn test_code_inside_list_item_roundtrip() {
        let code = "let a = 1;\n\n    let b = 2;  ";
        let doc = Document::new(vec![
            Block::BulletList(vec![
                ListItem {
                    blocks: vec![
                        Block::Paragraph(vec![Inline::text("step")]),
                        Block::CodeBlock(CodeBlock::new(Language::Rust, code)),
                    ],
                },
                item("after"),
            ]),
            Block::OrderedList(vec![ListItem {
                blocks: vec![
                    Block::Paragraph(vec![Inline::text("run")]),
                    Block::CodeBlock(CodeBlock::new(Language::Bash, "ls -la")),
                ],
            }]),
        ]);
        let mut registry = ImageRegistry::new();

        let markup = serialize_document(&doc, &mut registry);

        assert_eq!(
            markup,
            "* step\n  ```rust\n  let a = 1;\n\n      let b = 2;  \n  ```\n* after\n\n\
             1. run\n   ```bash\n   ls -la\n   ```"
        );
        assert_eq!(parse_markup(&markup), doc);
    }

    #[test]
    fn test_literal_block_markers_are_escaped() {
        let texts = [
            "2*3*4 and # not heading",
            "- not a bullet",
            "## not a heading",
            "1. not numbered",
            "> not a quote",
            "<p> not a tag",
            "#hashtag",
        ];
        let doc = Document::new(
            texts
                .iter()
                .map(|text| Block::Paragraph(vec![Inline::text(*text)]))
                .collect(),
        );
        let mut registry = ImageRegistry::new();

        let markup = serialize_document(&doc, &mut registry);

        assert_eq!(
            markup,
            "2\\*3\\*4 and # not heading\n\n\\- not a bullet\n\n\\## not a heading\n\n\
             1\\. not numbered\n\n\\> not a quote\n\n\\<p> not a tag\n\n#hashtag"
        );
        assert_eq!(parse_markup(&markup), doc);
    }

    #[test]
    fn test_preview_follows_the_list_item_line() {
        let source = base64_source(120);
        let mut items = vec![ListItem::paragraph(vec![
            Inline::text("shot "),
            Inline::image(source.clone(), "s"),
        ])];
        items.extend(["two", "three", "four", "five"].map(item));
        let doc = Document::new(vec![Block::BulletList(items)]);
        let mut registry = ImageRegistry::new();

        let markup = serialize_document(&doc, &mut registry);
        let lines: Vec<&str> = markup.lines().collect();

        assert_eq!(lines[0], "* shot ![s](__IMG_1__)");
        assert!(lines[1].starts_with("<!-- __IMG_1__:"));
        assert_eq!(lines[2], "* two");
        assert_eq!(lines.len(), 6);

        match &parse_markup(&markup).blocks[..] {
            [Block::BulletList(items)] => {
                assert_eq!(items.len(), 5);
                assert_eq!(
                    items[0],
                    ListItem::paragraph(vec![
                        Inline::text("shot "),
                        Inline::image("__IMG_1__", "s"),
                    ])
                );
            }
            other => panic!("expected one list, got {:?}", other),
        }
        assert_eq!(registry.resolve("__IMG_1__"), source);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cleanup
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_remove_empty_list_items() {
        let mut doc = Document::new(vec![
            Block::BulletList(vec![ListItem::paragraph(vec![]), item("keep")]),
            Block::OrderedList(vec![ListItem::default(), ListItem::paragraph(vec![Inline::text(" ")])]),
            Block::Blockquote(vec![Block::BulletList(vec![ListItem::default()])]),
        ]);

        let removed = remove_empty_list_items(&mut doc);

        assert_eq!(removed, 4);
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0], Block::BulletList(vec![item("keep")]));
        assert_eq!(doc.blocks[1], Block::Blockquote(vec![]));
    }

    #[test]
    fn test_serialize_does_not_mutate_document() {
        let doc = Document::new(vec![Block::BulletList(vec![ListItem::default(), item("x")])]);
        let before = doc.clone();
        let mut registry = ImageRegistry::new();
        assert_eq!(serialize_document(&doc, &mut registry), "* x");
        assert_eq!(doc, before);
    }
}
