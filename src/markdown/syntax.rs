//! Syntax Highlighting Module
//!
//! Post-processes rendered HTML: every `<pre><code class="language-X">`
//! fragment is decoded, re-tokenized with syntect and re-emitted with each
//! token wrapped in a class-carrying `<span>`.
//!
//! # Features
//! - Loads and caches syntect SyntaxSet and ThemeSet
//! - Falls back to plain text for unknown or missing languages
//! - Isolates failures: a block that cannot be tokenized keeps its original
//!   escaped content while sibling blocks still highlight
//! - Resolves image references before highlighting, dropping unknown ones
//! - Generates the matching CSS for any bundled theme
//!
//! # Example
//! ```ignore
//! use markcard::markdown::syntax::{get_highlighter, highlight_html};
//!
//! let html = "<pre><code class=\"language-rust\">fn main() {}</code></pre>";
//! let out = highlight_html(html, &registry, get_highlighter());
//! ```

use crate::error::{Error, Result};
use crate::markdown::images::{is_reference, ImageRegistry};
use log::{debug, warn};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Default dark theme name from syntect's built-in themes
pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";

/// Default light theme name from syntect's built-in themes
pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";

/// Fallback theme if the specified theme is not found
pub const FALLBACK_THEME: &str = "base16-ocean.dark";

/// Prefix put in front of every token class name
pub const DEFAULT_CLASS_PREFIX: &str = "hljs-";

fn code_fragment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)(<pre><code(?: class="language-([^"]*)")?>)(.*?)(</code></pre>)"#)
            .expect("valid code fragment regex")
    })
}

fn image_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<img\b[^>]*?\bsrc="([^"]*)"[^>]*>"#).expect("valid image tag regex")
    })
}

fn span_class_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<span class="([^"]*)">"#).expect("valid span regex"))
}

fn css_class_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.([A-Za-z_][\w-]*)").expect("valid css class regex"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizer Seam
// ─────────────────────────────────────────────────────────────────────────────

/// Turns literal code into HTML with every token wrapped in a styling span.
pub trait CodeTokenizer {
    /// Tokenize `code` as `language`. Unknown languages should fall back to
    /// plain text rather than fail; an error leaves the block unhighlighted.
    fn tokenize(&self, code: &str, language: &str) -> Result<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Syntax Highlighter
// ─────────────────────────────────────────────────────────────────────────────

/// Syntax highlighter that caches syntect sets for performance.
///
/// This struct holds the loaded SyntaxSet and ThemeSet, which are expensive
/// to load and should be reused across highlighting operations.
pub struct SyntaxHighlighter {
    /// Loaded syntax definitions
    syntax_set: SyntaxSet,
    /// Loaded color themes
    theme_set: ThemeSet,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxHighlighter {
    /// Create a new syntax highlighter with default syntax and theme sets.
    ///
    /// The operation is relatively expensive, so the highlighter should be
    /// cached and reused.
    pub fn new() -> Self {
        debug!("Loading syntect syntax and theme sets");
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        debug!(
            "Loaded {} syntaxes and {} themes",
            syntax_set.syntaxes().len(),
            theme_set.themes.len()
        );
        Self {
            syntax_set,
            theme_set,
        }
    }

    /// Get available theme names.
    pub fn available_themes(&self) -> Vec<&str> {
        self.theme_set.themes.keys().map(|s| s.as_str()).collect()
    }

    /// Get a theme by name, falling back to the default if not found.
    pub fn get_theme(&self, name: &str) -> Option<&Theme> {
        self.theme_set
            .themes
            .get(name)
            .or_else(|| self.theme_set.themes.get(FALLBACK_THEME))
    }

    /// Get a theme by name from settings, with fallback based on dark mode.
    pub fn get_theme_by_name_or_mode(&self, theme_name: &str, dark_mode: bool) -> Option<&Theme> {
        if self.theme_set.themes.contains_key(theme_name) {
            self.get_theme(theme_name)
        } else {
            let fallback = if dark_mode {
                DEFAULT_DARK_THEME
            } else {
                DEFAULT_LIGHT_THEME
            };
            self.get_theme(fallback)
        }
    }

    /// Tokenize code into class-annotated spans.
    ///
    /// Every class name gets `class_prefix` in front, so `keyword` becomes
    /// `hljs-keyword` with the default prefix.
    pub fn highlight_to_html(&self, code: &str, language: &str, class_prefix: &str) -> Result<String> {
        let syntax = self.find_syntax_for_language(language).unwrap_or_else(|| {
            debug!("No syntax found for language '{}', using plain text", language);
            self.syntax_set.find_syntax_plain_text()
        });

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|e| Error::Highlight {
                    language: language.to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(prefix_span_classes(&generator.finalize(), class_prefix))
    }

    /// CSS rules for the token classes of a theme.
    pub fn stylesheet(&self, theme_name: &str, dark_mode: bool, class_prefix: &str) -> Result<String> {
        let theme = self
            .get_theme_by_name_or_mode(theme_name, dark_mode)
            .ok_or_else(|| Error::Application(format!("Theme '{}' not found", theme_name)))?;
        let css = css_for_theme_with_class_style(theme, ClassStyle::Spaced)?;
        Ok(prefix_css_selectors(&css, class_prefix))
    }

    /// Find syntax definition for a language identifier.
    ///
    /// Tries multiple strategies:
    /// 1. By extension (e.g., "rs" -> Rust)
    /// 2. By name (e.g., "Rust" -> Rust)
    /// 3. By case-insensitive name
    fn find_syntax_for_language(&self, language: &str) -> Option<&SyntaxReference> {
        if language.is_empty() {
            return None;
        }

        let lang_lower = language.to_lowercase();

        // Map picker values and common aliases to extensions
        let extension = match lang_lower.as_str() {
            "rust" | "rs" => "rs",
            "python" | "py" => "py",
            "javascript" | "js" => "js",
            "typescript" | "ts" => "ts",
            "c" => "c",
            "cpp" | "c++" | "cxx" => "cpp",
            "csharp" | "c#" | "cs" => "cs",
            "java" => "java",
            "kotlin" | "kt" => "kt",
            "go" | "golang" => "go",
            "ruby" | "rb" => "rb",
            "php" => "php",
            "swift" => "swift",
            "html" | "htm" => "html",
            "css" => "css",
            "json" => "json",
            "yaml" | "yml" => "yaml",
            "markdown" | "md" => "md",
            "sql" => "sql",
            "shell" | "sh" | "bash" | "zsh" => "sh",
            "plaintext" | "text" | "txt" => "txt",
            other => other,
        };

        if let Some(syntax) = self.syntax_set.find_syntax_by_extension(extension) {
            return Some(syntax);
        }

        if let Some(syntax) = self.syntax_set.find_syntax_by_name(language) {
            return Some(syntax);
        }

        self.syntax_set
            .syntaxes()
            .iter()
            .find(|&syntax| syntax.name.to_lowercase() == lang_lower)
    }
}

impl CodeTokenizer for SyntaxHighlighter {
    fn tokenize(&self, code: &str, language: &str) -> Result<String> {
        self.highlight_to_html(code, language, DEFAULT_CLASS_PREFIX)
    }
}

/// A highlighter paired with a custom class prefix.
pub struct PrefixedTokenizer<'a> {
    pub highlighter: &'a SyntaxHighlighter,
    pub class_prefix: &'a str,
}

impl CodeTokenizer for PrefixedTokenizer<'_> {
    fn tokenize(&self, code: &str, language: &str) -> Result<String> {
        self.highlighter
            .highlight_to_html(code, language, self.class_prefix)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Class Prefixing
// ─────────────────────────────────────────────────────────────────────────────

fn prefix_span_classes(html: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return html.to_string();
    }
    span_class_regex()
        .replace_all(html, |caps: &Captures| {
            let classes: Vec<String> = caps[1]
                .split_whitespace()
                .map(|class| format!("{}{}", prefix, class))
                .collect();
            format!("<span class=\"{}\">", classes.join(" "))
        })
        .into_owned()
}

/// Prefix class selectors; only selector lines (ending in `{`) are touched.
fn prefix_css_selectors(css: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return css.to_string();
    }
    let replacement = format!(".{}$1", prefix);
    css.lines()
        .map(|line| {
            if line.trim_end().ends_with('{') {
                css_class_regex()
                    .replace_all(line, replacement.as_str())
                    .into_owned()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Post-processing
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve image references in rendered HTML.
///
/// Known identifiers are replaced with their real source. Tags whose
/// identifier is unknown are removed entirely. Other images are untouched.
pub fn resolve_images(html: &str, registry: &ImageRegistry) -> String {
    image_tag_regex()
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            let src = &caps[1];
            if !is_reference(src) {
                return tag.to_string();
            }
            match registry.resolve_for_render(src) {
                Some(source) => tag.replacen(
                    &format!("src=\"{}\"", src),
                    &format!(
                        "src=\"{}\"",
                        html_escape::encode_double_quoted_attribute(source)
                    ),
                    1,
                ),
                None => String::new(),
            }
        })
        .into_owned()
}

/// Highlight every code fragment of rendered HTML.
///
/// Images are resolved first (see [`resolve_images`]). Each
/// `<pre><code>` fragment is handled on its own: when tokenization fails the
/// fragment is kept as it was and the failure is logged.
pub fn highlight_html(html: &str, registry: &ImageRegistry, tokenizer: &dyn CodeTokenizer) -> String {
    let html = resolve_images(html, registry);

    code_fragment_regex()
        .replace_all(&html, |caps: &Captures| {
            let open = &caps[1];
            let language = caps.get(2).map_or("", |m| m.as_str());
            let code = html_escape::decode_html_entities(&caps[3]);
            let close = &caps[4];

            match tokenizer.tokenize(&code, language) {
                Ok(tokens) => format!("{}{}{}", open, tokens, close),
                Err(e) => {
                    warn!("{}, leaving block unhighlighted", e);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Highlighter Instance
// ─────────────────────────────────────────────────────────────────────────────

/// Global syntax highlighter instance.
///
/// This is lazily initialized on first access and reused for all highlighting
/// operations. Using a global instance avoids the cost of loading syntax and
/// theme sets multiple times.
static HIGHLIGHTER: OnceLock<SyntaxHighlighter> = OnceLock::new();

/// Get or create the global syntax highlighter.
pub fn get_highlighter() -> &'static SyntaxHighlighter {
    HIGHLIGHTER.get_or_init(SyntaxHighlighter::new)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
