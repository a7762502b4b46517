//! User settings for markcard
//!
//! This module defines the `Settings` struct that holds the tunable knobs of
//! the conversion engine, with serde support for JSON persistence.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Theme Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Light or dark rendering of highlighted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Whether this theme renders on a dark background.
    pub fn is_dark(&self) -> bool {
        matches!(self, Theme::Dark)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// View Mode Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Editing modes for a card document.
///
/// Two modes are available:
/// - `Raw`: plain markup text is the source of truth
/// - `Rendered`: the structured document tree is the source of truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Plain markup editing
    #[default]
    Raw,
    /// Structured (rich-text) editing
    Rendered,
}

impl ViewMode {
    /// Toggle between Raw and Rendered modes.
    pub fn toggle(&self) -> Self {
        match self {
            ViewMode::Raw => ViewMode::Rendered,
            ViewMode::Rendered => ViewMode::Raw,
        }
    }

    /// Get a display label for the mode.
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Raw => "Markdown",
            ViewMode::Rendered => "Visual",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// Conversion and rendering preferences.
///
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Appearance
    // ─────────────────────────────────────────────────────────────────────────
    /// Color theme for highlighted code
    pub theme: Theme,

    /// Mode a new editing session starts in
    pub view_mode: ViewMode,

    // ─────────────────────────────────────────────────────────────────────────
    // Syntax Highlighting
    // ─────────────────────────────────────────────────────────────────────────
    /// Syntax highlighting theme name used for the token stylesheet
    pub syntax_theme: String,

    /// Prefix put in front of every token class name
    pub highlight_class_prefix: String,

    // ─────────────────────────────────────────────────────────────────────────
    // Images
    // ─────────────────────────────────────────────────────────────────────────
    /// Image sources longer than this many characters are kept out of markup
    pub externalize_threshold: usize,

    /// Number of source characters shown in the preview comment line
    pub preview_chars: usize,

    /// Smallest width (px) a resized image may take
    pub image_min_width: u32,

    /// Largest width (px) a resized image may take
    pub image_max_width: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            view_mode: ViewMode::default(),

            syntax_theme: String::from("base16-ocean.dark"),
            highlight_class_prefix: String::from("hljs-"),

            externalize_threshold: 80,
            preview_chars: 50,
            image_min_width: 100,
            image_max_width: 600,
        }
    }
}

impl Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Smallest accepted externalization threshold.
    pub const MIN_EXTERNALIZE_THRESHOLD: usize = 16;
    /// Largest accepted preview length.
    pub const MAX_PREVIEW_CHARS: usize = 200;
    /// Hard lower bound for any image width.
    pub const MIN_IMAGE_WIDTH: u32 = 16;
    /// Hard upper bound for any image width.
    pub const MAX_IMAGE_WIDTH: u32 = 4096;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// This is useful after loading settings from a file that might have
    /// been manually edited with invalid values.
    pub fn sanitize(&mut self) {
        if self.externalize_threshold < Self::MIN_EXTERNALIZE_THRESHOLD {
            self.externalize_threshold = Self::MIN_EXTERNALIZE_THRESHOLD;
        }

        self.preview_chars = self.preview_chars.clamp(1, Self::MAX_PREVIEW_CHARS);

        self.image_min_width = self
            .image_min_width
            .clamp(Self::MIN_IMAGE_WIDTH, Self::MAX_IMAGE_WIDTH);
        self.image_max_width = self
            .image_max_width
            .clamp(Self::MIN_IMAGE_WIDTH, Self::MAX_IMAGE_WIDTH);
        if self.image_max_width < self.image_min_width {
            std::mem::swap(&mut self.image_min_width, &mut self.image_max_width);
        }

        // Class names must stay valid CSS identifiers
        if !self
            .highlight_class_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            self.highlight_class_prefix = Settings::default().highlight_class_prefix;
        }

        if self.syntax_theme.trim().is_empty() {
            self.syntax_theme = Settings::default().syntax_theme;
        }
    }

    /// Load settings and sanitize them to ensure validity.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.view_mode, ViewMode::Raw);
        assert_eq!(settings.externalize_threshold, 80);
        assert_eq!(settings.preview_chars, 50);
        assert_eq!(settings.image_min_width, 100);
        assert_eq!(settings.image_max_width, 600);
        assert_eq!(settings.highlight_class_prefix, "hljs-");
    }

    #[test]
    fn test_view_mode_toggle() {
        assert_eq!(ViewMode::Raw.toggle(), ViewMode::Rendered);
        assert_eq!(ViewMode::Rendered.toggle(), ViewMode::Raw);
    }

    #[test]
    fn test_view_mode_serialization() {
        let json = serde_json::to_string(&ViewMode::Rendered).unwrap();
        assert_eq!(json, "\"rendered\"");
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"theme":"dark"}"#).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.externalize_threshold, 80);
    }

    #[test]
    fn test_settings_serialization_roundtrip() {
        let settings = Settings {
            theme: Theme::Dark,
            image_max_width: 800,
            ..Settings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, loaded);
    }

    #[test]
    fn test_sanitize_image_bounds() {
        let mut settings = Settings {
            image_min_width: 900,
            image_max_width: 10,
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.image_min_width, Settings::MIN_IMAGE_WIDTH);
        assert_eq!(settings.image_max_width, 900);
    }

    #[test]
    fn test_sanitize_threshold_and_prefix() {
        let mut settings = Settings {
            externalize_threshold: 0,
            preview_chars: 0,
            highlight_class_prefix: "bad prefix\"".to_string(),
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(
            settings.externalize_threshold,
            Settings::MIN_EXTERNALIZE_THRESHOLD
        );
        assert_eq!(settings.preview_chars, 1);
        assert_eq!(settings.highlight_class_prefix, "hljs-");
    }

    #[test]
    fn test_from_json_sanitized() {
        let settings = Settings::from_json_sanitized(r#"{"preview_chars": 5000}"#).unwrap();
        assert_eq!(settings.preview_chars, Settings::MAX_PREVIEW_CHARS);
    }
}
