//! HTML rendering
//!
//! Two render paths feed the display surface:
//! - [`render_document`] turns a structured [`Document`] into block HTML,
//!   one block per line, in the shape the highlighting pass consumes.
//! - [`render_card_html`] renders markup text through comrak for the card
//!   preview, then resolves images and highlights code.

use crate::config::Settings;
use crate::error::Result;
use crate::markdown::document::{Block, Document, Inline, ListItem, Marks};
use crate::markdown::images::{strip_preview_comments, ImageRegistry};
use crate::markdown::syntax::{get_highlighter, highlight_html, PrefixedTokenizer};
use comrak::{markdown_to_html, Options};
use html_escape::{encode_double_quoted_attribute, encode_text};

// ─────────────────────────────────────────────────────────────────────────────
// Document Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Render a document to block HTML.
///
/// Images are resolved against the registry; an image whose identifier is
/// unknown is left out. Code is emitted escaped and unhighlighted.
pub fn render_document(doc: &Document, registry: &ImageRegistry) -> String {
    doc.blocks
        .iter()
        .filter_map(|block| render_block(block, registry))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(block: &Block, registry: &ImageRegistry) -> Option<String> {
    let html = match block {
        Block::Heading { level, content } => {
            let n = level.as_u8();
            format!("<h{}>{}</h{}>", n, render_inline(content, registry), n)
        }
        Block::Paragraph(content) => {
            let inner = render_inline(content, registry);
            if inner.is_empty() {
                return None;
            }
            format!("<p>{}</p>", inner)
        }
        Block::Blockquote(children) => {
            format!("<blockquote>{}</blockquote>", render_children(children, registry))
        }
        Block::BulletList(items) => format!("<ul>{}</ul>", render_items(items, registry)),
        Block::OrderedList(items) => format!("<ol>{}</ol>", render_items(items, registry)),
        Block::CodeBlock(code) => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            code.language.value(),
            code.html
        ),
        Block::Image(image) => {
            let src = registry.resolve_for_render(&image.src)?;
            if src.trim().is_empty() {
                return None;
            }
            let width = match image.width {
                Some(px) => format!(" style=\"width: {}px\"", px),
                None => String::new(),
            };
            format!(
                "<img src=\"{}\" alt=\"{}\"{}>",
                encode_double_quoted_attribute(src),
                encode_double_quoted_attribute(&image.alt),
                width
            )
        }
        Block::RawHtml(html) => html.clone(),
    };
    Some(html)
}

fn render_children(children: &[Block], registry: &ImageRegistry) -> String {
    children
        .iter()
        .filter_map(|child| render_block(child, registry))
        .collect()
}

fn render_items(items: &[ListItem], registry: &ImageRegistry) -> String {
    items
        .iter()
        .map(|item| format!("<li>{}</li>", render_children(&item.blocks, registry)))
        .collect()
}

/// Render inline nodes. Marks nest link, strong, em, code from the outside in.
pub fn render_inline(content: &[Inline], registry: &ImageRegistry) -> String {
    let mut out = String::new();
    for node in content {
        match node {
            Inline::Text { text, marks } => out.push_str(&render_marked(text, marks)),
            Inline::Image { src, alt } => {
                if let Some(src) = registry.resolve_for_render(src) {
                    if !src.trim().is_empty() {
                        out.push_str(&format!(
                            "<img src=\"{}\" alt=\"{}\">",
                            encode_double_quoted_attribute(src),
                            encode_double_quoted_attribute(alt)
                        ));
                    }
                }
            }
        }
    }
    out
}

fn render_marked(text: &str, marks: &Marks) -> String {
    let mut html = encode_text(text).into_owned();
    if marks.code {
        html = format!("<code>{}</code>", html);
    }
    if marks.italic {
        html = format!("<em>{}</em>", html);
    }
    if marks.bold {
        html = format!("<strong>{}</strong>", html);
    }
    if let Some(href) = &marks.link {
        html = format!(
            "<a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(href),
            html
        );
    }
    html
}

// ─────────────────────────────────────────────────────────────────────────────
// Card Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Render markup text to the card body HTML.
///
/// Preview comments are dropped, the rest goes through comrak, then image
/// references are resolved and code blocks are highlighted.
pub fn render_card_html(markup: &str, registry: &ImageRegistry, settings: &Settings) -> String {
    let body = markdown_to_html_body(&strip_preview_comments(markup));
    let tokenizer = PrefixedTokenizer {
        highlighter: get_highlighter(),
        class_prefix: &settings.highlight_class_prefix,
    };
    highlight_html(&body, registry, &tokenizer)
}

/// Render markup text to a standalone HTML page with the token stylesheet.
pub fn render_card_document(
    markup: &str,
    registry: &ImageRegistry,
    settings: &Settings,
) -> Result<String> {
    let body = render_card_html(markup, registry, settings);
    let css = get_highlighter().stylesheet(
        &settings.syntax_theme,
        settings.theme.is_dark(),
        &settings.highlight_class_prefix,
    )?;
    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n{}\n</style>\n</head>\n<body>\n<article class=\"card\">\n{}</article>\n</body>\n</html>\n",
        css, body
    ))
}

/// Convert markdown to HTML body content.
fn markdown_to_html_body(markdown: &str) -> String {
    let mut options = Options::default();

    // Enable common extensions
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;

    // Render options
    options.render.unsafe_ = true; // Allow raw HTML

    markdown_to_html(markdown, &options)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
