//! Image reference registry
//!
//! Long image sources (typically base64 data URIs) would swamp the markup
//! text, so the serializer swaps them for short opaque identifiers and keeps
//! the real source here. The registry lives as long as one editing session
//! and is handed by reference into every conversion.
//!
//! Identifiers look like `__IMG_7__`: only word characters, so they survive
//! inside `![alt](...)` and inside rendered `src="..."` attributes untouched.

use log::{debug, warn};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Sources longer than this many characters are externalized.
pub const DEFAULT_EXTERNALIZE_THRESHOLD: usize = 80;

/// Number of source characters shown in a preview comment.
pub const DEFAULT_PREVIEW_CHARS: usize = 50;

const REFERENCE_PREFIX: &str = "__IMG_";
const REFERENCE_SUFFIX: &str = "__";

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^__IMG_(\d+)__$").expect("valid reference regex"))
}

fn preview_comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*<!-- __IMG_\d+__: .* -->\s*$").expect("valid preview comment regex")
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Session-scoped mapping from minted identifiers to image sources.
///
/// Identifiers are never reused: the counter only moves forward, even across
/// [`ImageRegistry::clear`]. Registering the same source twice mints two
/// identifiers.
#[derive(Debug, Clone)]
pub struct ImageRegistry {
    entries: HashMap<u64, String>,
    next_id: u64,
    threshold: usize,
    preview_chars: usize,
}

impl Default for ImageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageRegistry {
    /// Create an empty registry with the default threshold.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_EXTERNALIZE_THRESHOLD, DEFAULT_PREVIEW_CHARS)
    }

    /// Create an empty registry with a custom threshold and preview length.
    pub fn with_limits(threshold: usize, preview_chars: usize) -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
            threshold,
            preview_chars,
        }
    }

    /// Character count above which a source is externalized.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether `source` is long enough to be kept out of markup.
    pub fn should_externalize(&self, source: &str) -> bool {
        source.chars().count() > self.threshold
    }

    /// Store `source` under a freshly minted identifier.
    pub fn register(&mut self, source: &str) -> String {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, source.to_string());
        debug!(
            "Registered image reference {} ({} chars)",
            id,
            source.chars().count()
        );
        format_reference(id)
    }

    /// Look up the source behind an identifier.
    pub fn lookup(&self, identifier: &str) -> Option<&str> {
        let id = parse_reference(identifier)?;
        self.entries.get(&id).map(String::as_str)
    }

    /// Resolve an identifier, returning it unchanged when unknown.
    pub fn resolve<'a>(&'a self, identifier: &'a str) -> &'a str {
        self.lookup(identifier).unwrap_or(identifier)
    }

    /// Resolve an image source for rendering.
    ///
    /// Plain sources pass through. Known identifiers become their source.
    /// Unknown identifiers yield `None`, and the caller omits the image.
    pub fn resolve_for_render<'a>(&'a self, src: &'a str) -> Option<&'a str> {
        if !is_reference(src) {
            return Some(src);
        }
        match self.lookup(src) {
            Some(source) => Some(source),
            None => {
                warn!("Unresolved image reference {}, omitting image", src);
                None
            }
        }
    }

    /// Human-readable comment line that follows an externalized image.
    pub fn preview_comment(&self, identifier: &str, source: &str) -> String {
        let head: String = source.chars().take(self.preview_chars).collect();
        let ellipsis = if source.chars().count() > self.preview_chars {
            "..."
        } else {
            ""
        };
        let marker = if source.starts_with("data:") {
            " [base64]"
        } else {
            ""
        };
        // Keep the comment well-formed whatever the source contains
        let head = head.replace("--", "- -");
        format!("<!-- {}: {}{}{} -->", identifier, head, ellipsis, marker)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every mapping. Identifiers minted later still never collide
    /// with earlier ones.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identifier Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn format_reference(id: u64) -> String {
    format!("{}{}{}", REFERENCE_PREFIX, id, REFERENCE_SUFFIX)
}

fn parse_reference(identifier: &str) -> Option<u64> {
    reference_regex()
        .captures(identifier.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether a source string has the identifier shape.
pub fn is_reference(src: &str) -> bool {
    parse_reference(src).is_some()
}

/// Whether a markup line is a preview comment emitted by the serializer.
pub fn is_preview_comment(line: &str) -> bool {
    preview_comment_regex().is_match(line)
}

/// Drop preview comment lines from markup text.
pub fn strip_preview_comments(markup: &str) -> String {
    markup
        .lines()
        .filter(|line| !is_preview_comment(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
