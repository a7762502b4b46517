//! Inline span processing
//!
//! Converts a line of markup into inline nodes (text runs with marks, inline
//! images) and back.
//!
//! # Precedence
//! At every position the rules of [`INLINE_RULES`] are tried in order and the
//! first match wins:
//!
//! | # | Rule       | Syntax          | Content reprocessed |
//! |---|------------|-----------------|---------------------|
//! | 1 | `Escape`   | `\*`            | no (literal)        |
//! | 2 | `Image`    | `![alt](src)`   | no (leaf)           |
//! | 3 | `CodeSpan` | `` `code` ``    | no (raw zone)       |
//! | 4 | `Strong`   | `**text**`      | yes                 |
//! | 5 | `Emphasis` | `*text*`        | yes                 |
//! | 6 | `Link`     | `[text](url)`   | yes                 |
//!
//! Escapes, images and code spans are raw zones: delimiter searches for the
//! other rules skip over them, so `*` or `)` inside a data URI or a code span
//! never closes an emphasis. New rules must be added to the table, not
//! special-cased in the scanner.
//!
//! A backslash before any ASCII punctuation character makes it literal. Code
//! spans may use longer backtick runs (``` `` a`b `` ```) to hold backticks.
//! The serializer escapes literal text so that a tree always reads back as
//! itself.

use crate::markdown::document::{Inline, Marks};
use crate::markdown::images::ImageRegistry;

// ─────────────────────────────────────────────────────────────────────────────
// Rule Table
// ─────────────────────────────────────────────────────────────────────────────

/// Inline syntax rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineRule {
    Escape,
    Image,
    CodeSpan,
    Strong,
    Emphasis,
    Link,
}

/// Rules in the order they are tried at each position.
pub const INLINE_RULES: &[InlineRule] = &[
    InlineRule::Escape,
    InlineRule::Image,
    InlineRule::CodeSpan,
    InlineRule::Strong,
    InlineRule::Emphasis,
    InlineRule::Link,
];

/// What a rule matched, with byte offsets into the scanned string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Matched<'a> {
    Literal(&'a str),
    Image { alt: &'a str, src: &'a str },
    Code(&'a str),
    Strong(&'a str),
    Emphasis(&'a str),
    Link { text: &'a str, href: &'a str },
}

impl InlineRule {
    /// Try this rule at byte offset `pos`, returning the match and its end.
    fn try_at<'a>(self, s: &'a str, pos: usize) -> Option<(Matched<'a>, usize)> {
        match self {
            InlineRule::Escape => match_escape(s, pos),
            InlineRule::Image => match_image(s, pos),
            InlineRule::CodeSpan => match_code_span(s, pos),
            InlineRule::Strong => match_strong(s, pos),
            InlineRule::Emphasis => match_emphasis(s, pos),
            InlineRule::Link => match_link(s, pos),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a line of markup into inline nodes.
///
/// Never fails: anything that does not match a rule is kept as text.
/// Images with an empty source produce no node.
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    parse_into(text, &Marks::default(), &mut out);
    merge_adjacent(out)
}

fn parse_into(s: &str, marks: &Marks, out: &mut Vec<Inline>) {
    let mut pos = 0;
    let mut text_start = 0;

    while pos < s.len() {
        let matched = INLINE_RULES.iter().find_map(|rule| rule.try_at(s, pos));

        let Some((node, end)) = matched else {
            pos += char_len_at(s, pos);
            continue;
        };

        push_text(out, &s[text_start..pos], marks);
        match node {
            Matched::Literal(text) => push_text(out, text, marks),
            Matched::Image { alt, src } => {
                if !src.trim().is_empty() {
                    out.push(Inline::image(src.trim(), alt));
                }
            }
            Matched::Code(code) => push_text(out, code, &marks.with_code()),
            Matched::Strong(inner) => parse_into(inner, &marks.with_bold(), out),
            Matched::Emphasis(inner) => parse_into(inner, &marks.with_italic(), out),
            Matched::Link { text, href } => parse_into(text, &marks.with_link(href.trim()), out),
        }
        pos = end;
        text_start = end;
    }

    push_text(out, &s[text_start..], marks);
}

fn push_text(out: &mut Vec<Inline>, text: &str, marks: &Marks) {
    if !text.is_empty() {
        out.push(Inline::marked(text, marks.clone()));
    }
}

/// Join neighbouring text runs that carry identical marks.
fn merge_adjacent(nodes: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Inline> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let (
            Some(Inline::Text {
                text: prev,
                marks: prev_marks,
            }),
            Inline::Text { text, marks },
        ) = (merged.last_mut(), &node)
        {
            if prev_marks == marks {
                prev.push_str(text);
                continue;
            }
        }
        merged.push(node);
    }
    merged
}

fn char_len_at(s: &str, pos: usize) -> usize {
    s[pos..].chars().next().map_or(1, char::len_utf8)
}

fn star_run(s: &str, pos: usize) -> usize {
    s.as_bytes()[pos..].iter().take_while(|&&b| b == b'*').count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Rule Matchers
// ─────────────────────────────────────────────────────────────────────────────

fn match_escape(s: &str, pos: usize) -> Option<(Matched<'_>, usize)> {
    let bytes = s.as_bytes();
    if bytes.get(pos) != Some(&b'\\') {
        return None;
    }
    match bytes.get(pos + 1) {
        Some(next) if next.is_ascii_punctuation() => {
            Some((Matched::Literal(&s[pos + 1..pos + 2]), pos + 2))
        }
        _ => None,
    }
}

fn match_image(s: &str, pos: usize) -> Option<(Matched<'_>, usize)> {
    let rest = s.get(pos..)?;
    if !rest.starts_with("![") {
        return None;
    }
    let alt_end = rest[2..].find(']')? + 2;
    if !rest[alt_end..].starts_with("](") {
        return None;
    }
    let src_start = alt_end + 2;
    let src_end = rest[src_start..].find(')')? + src_start;
    let alt = &rest[2..alt_end];
    let src = &rest[src_start..src_end];
    if alt.contains('\n') || src.contains('\n') {
        return None;
    }
    Some((Matched::Image { alt, src }, pos + src_end + 1))
}

fn match_code_span(s: &str, pos: usize) -> Option<(Matched<'_>, usize)> {
    let ticks = backtick_run(s, pos);
    if ticks == 0 {
        return None;
    }
    let inner_start = pos + ticks;
    let mut i = inner_start;
    while i < s.len() {
        let run = backtick_run(s, i);
        if run == 0 {
            i += char_len_at(s, i);
            continue;
        }
        if run == ticks {
            let inner = strip_code_padding(&s[inner_start..i]);
            return Some((Matched::Code(inner), i + run));
        }
        i += run;
    }
    // An unmatched opening run is literal as a whole
    Some((Matched::Literal(&s[pos..inner_start]), inner_start))
}

fn backtick_run(s: &str, pos: usize) -> usize {
    s.as_bytes()[pos..].iter().take_while(|&&b| b == b'`').count()
}

/// One space is trimmed from each side of code that has both, so that code
/// starting or ending with a backtick can be delimited.
fn strip_code_padding(inner: &str) -> &str {
    if inner.len() >= 2
        && inner.starts_with(' ')
        && inner.ends_with(' ')
        && !inner.bytes().all(|b| b == b' ')
    {
        &inner[1..inner.len() - 1]
    } else {
        inner
    }
}

fn match_strong(s: &str, pos: usize) -> Option<(Matched<'_>, usize)> {
    let run = star_run(s, pos);
    if run < 2 {
        return None;
    }
    // `***a** b*` opens emphasis first: the next delimiter run closes strong
    if run == 3 && next_star_run(s, pos + 3) == Some(2) {
        return None;
    }
    let start = pos + 2;
    let close = find_strong_close(s, start)?;
    let inner = &s[start..close];
    if inner.is_empty() {
        return None;
    }
    Some((Matched::Strong(inner), close + 2))
}

fn match_emphasis(s: &str, pos: usize) -> Option<(Matched<'_>, usize)> {
    if s.as_bytes().get(pos) != Some(&b'*') {
        return None;
    }
    let start = pos + 1;
    let close = find_emphasis_close(s, start)?;
    let inner = &s[start..close];
    if inner.is_empty() {
        return None;
    }
    Some((Matched::Emphasis(inner), close + 1))
}

fn match_link(s: &str, pos: usize) -> Option<(Matched<'_>, usize)> {
    let rest = s.get(pos..)?;
    if !rest.starts_with('[') {
        return None;
    }
    let text_end = find_unescaped(rest, 1, b']')?;
    if !rest[text_end..].starts_with("](") {
        return None;
    }
    let href_start = text_end + 2;
    let href_end = rest[href_start..].find(')')? + href_start;
    let text = &rest[1..text_end];
    let href = &rest[href_start..href_end];
    if text.is_empty() || href.trim().is_empty() {
        return None;
    }
    Some((Matched::Link { text, href }, pos + href_end + 1))
}

/// End of a raw zone (escape, image or code span) starting at `pos`, if any.
fn skip_raw_zone(s: &str, pos: usize) -> Option<usize> {
    match_escape(s, pos)
        .or_else(|| match_image(s, pos))
        .or_else(|| match_code_span(s, pos))
        .map(|(_, end)| end)
}

/// Offset of the first `target` byte at or after `from` that is not escaped.
fn find_unescaped(s: &str, from: usize, target: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if let Some((_, end)) = match_escape(s, i) {
            i = end;
            continue;
        }
        if bytes[i] == target {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Length of the next `*` run at or after `from`, skipping raw zones.
fn next_star_run(s: &str, from: usize) -> Option<usize> {
    let mut i = from;
    while i < s.len() {
        if let Some(end) = skip_raw_zone(s, i) {
            i = end;
            continue;
        }
        if s.as_bytes()[i] == b'*' {
            return Some(star_run(s, i));
        }
        i += char_len_at(s, i);
    }
    None
}

/// Offset of the `**` closing a strong span whose content starts at `from`.
///
/// Single stars inside the content are emphasis delimiters. When a run of
/// three or more closes the span while an emphasis is still open inside, the
/// emphasis takes the first star of the run.
fn find_strong_close(s: &str, from: usize) -> Option<usize> {
    let mut lone_stars = 0usize;
    let mut i = from;
    while i < s.len() {
        if let Some(end) = skip_raw_zone(s, i) {
            i = end;
            continue;
        }
        if s.as_bytes()[i] == b'*' {
            let run = star_run(s, i);
            if run == 1 {
                lone_stars += 1;
                i += 1;
                continue;
            }
            if run >= 3 && lone_stars % 2 == 1 {
                return Some(i + run - 2);
            }
            return Some(i);
        }
        i += char_len_at(s, i);
    }
    None
}

/// Offset of the `*` closing an emphasis whose content starts at `from`.
///
/// Double stars inside the content open and close a nested strong span.
fn find_emphasis_close(s: &str, from: usize) -> Option<usize> {
    let mut in_strong = false;
    let mut i = from;
    while i < s.len() {
        if let Some(end) = skip_raw_zone(s, i) {
            i = end;
            continue;
        }
        if s.as_bytes()[i] == b'*' {
            let run = star_run(s, i);
            match run {
                1 => return Some(i),
                2 => {
                    in_strong = !in_strong;
                    i += 2;
                    continue;
                }
                _ if in_strong => return Some(i + run - 1),
                _ => return Some(i),
            }
        }
        i += char_len_at(s, i);
    }
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Serialization
// ─────────────────────────────────────────────────────────────────────────────

/// A mark that wraps a stretch of text with an opener and a closer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Wrapper {
    Link(String),
    Strong,
    Emphasis,
}

impl Wrapper {
    fn opener(&self) -> &'static str {
        match self {
            Wrapper::Link(_) => "[",
            Wrapper::Strong => "**",
            Wrapper::Emphasis => "*",
        }
    }

    fn closer(&self) -> String {
        match self {
            Wrapper::Link(href) => format!("]({})", href),
            Wrapper::Strong => "**".to_string(),
            Wrapper::Emphasis => "*".to_string(),
        }
    }

    fn applies_to(&self, marks: &Marks) -> bool {
        match self {
            Wrapper::Link(href) => marks.link.as_deref() == Some(href.as_str()),
            Wrapper::Strong => marks.bold,
            Wrapper::Emphasis => marks.italic,
        }
    }

    fn all_for(marks: &Marks) -> Vec<Wrapper> {
        let mut wrappers = Vec::new();
        if let Some(href) = &marks.link {
            wrappers.push(Wrapper::Link(href.clone()));
        }
        if marks.bold {
            wrappers.push(Wrapper::Strong);
        }
        if marks.italic {
            wrappers.push(Wrapper::Emphasis);
        }
        wrappers
    }
}

/// Serialize inline nodes back to markup.
///
/// Images whose source exceeds the registry threshold are registered and
/// written by identifier; the matching preview comment lines are appended to
/// `previews` so the caller can place them after the enclosing block.
pub fn serialize_inline(
    content: &[Inline],
    registry: &mut ImageRegistry,
    previews: &mut Vec<String>,
) -> String {
    let content = merge_adjacent(content.to_vec());
    let mut out = String::new();
    let mut open: Vec<Wrapper> = Vec::new();

    for (index, node) in content.iter().enumerate() {
        match node {
            Inline::Image { src, alt } => {
                out.push_str(&image_markup(alt, src, registry, previews));
            }
            Inline::Text { text, marks } => {
                if text.is_empty() {
                    continue;
                }

                // Close everything from the first wrapper that no longer applies
                if let Some(first_stale) = open.iter().position(|w| !w.applies_to(marks)) {
                    for wrapper in open.drain(first_stale..).rev() {
                        out.push_str(&wrapper.closer());
                    }
                }

                // Open missing wrappers, the longest-lasting outermost
                let mut missing: Vec<Wrapper> = Wrapper::all_for(marks)
                    .into_iter()
                    .filter(|w| !open.contains(w))
                    .collect();
                missing.sort_by_key(|w| std::cmp::Reverse(extent(&content[index..], w)));
                for wrapper in missing {
                    // `!` right before `[` would turn the link into an image
                    if matches!(wrapper, Wrapper::Link(_)) && out.ends_with('!') {
                        out.pop();
                        out.push_str("\\!");
                    }
                    out.push_str(wrapper.opener());
                    open.push(wrapper);
                }

                if marks.code {
                    out.push_str(&code_span(text));
                } else {
                    out.push_str(&escape_text(text, marks.link.is_some()));
                }
            }
        }
    }

    for wrapper in open.into_iter().rev() {
        out.push_str(&wrapper.closer());
    }
    out
}

/// Backslash-escape the characters of a plain text run that would otherwise
/// read back as inline syntax. `]` only matters inside link text.
fn escape_text(text: &str, in_link: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let escape = match c {
            '*' | '`' | '[' => true,
            ']' => in_link,
            '\\' => chars.peek().map_or(true, |next| next.is_ascii_punctuation()),
            _ => false,
        };
        if escape {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A code span whose delimiter is one backtick longer than any run inside.
fn code_span(code: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for b in code.bytes() {
        if b == b'`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    let fence = "`".repeat(longest + 1);
    let padded = code.starts_with('`')
        || code.ends_with('`')
        || (code.len() >= 2
            && code.starts_with(' ')
            && code.ends_with(' ')
            && !code.bytes().all(|b| b == b' '));
    if padded {
        format!("{} {} {}", fence, code, fence)
    } else {
        format!("{}{}{}", fence, code, fence)
    }
}

/// Number of consecutive text runs, starting at the first, a wrapper covers.
/// Images neither extend nor interrupt a wrapper.
fn extent(content: &[Inline], wrapper: &Wrapper) -> usize {
    content
        .iter()
        .filter_map(|node| match node {
            Inline::Text { marks, .. } => Some(marks),
            Inline::Image { .. } => None,
        })
        .take_while(|marks| wrapper.applies_to(marks))
        .count()
}

/// Markup for one image, externalizing long sources.
///
/// Returns an empty string for images without a source.
pub fn image_markup(
    alt: &str,
    src: &str,
    registry: &mut ImageRegistry,
    previews: &mut Vec<String>,
) -> String {
    let src = src.trim();
    if src.is_empty() {
        return String::new();
    }
    if registry.should_externalize(src) {
        let identifier = registry.register(src);
        previews.push(registry.preview_comment(&identifier, src));
        format!("![{}]({})", alt, identifier)
    } else {
        format!("![{}]({})", alt, src)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
