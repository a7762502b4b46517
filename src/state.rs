//! Editing session state for markcard
//!
//! An [`EditingSession`] holds one logical document in exactly one of two
//! representations, depending on the active [`ViewMode`]:
//! - `Raw`: the markup string is the source of truth
//! - `Rendered`: the structured tree, owned by an [`EditorHost`], is
//!
//! Switching modes converts once and drops the previous representation. The
//! session's [`ImageRegistry`] outlives every switch.

use crate::config::{Settings, ViewMode};
use crate::editor::{EditorHost, WidthBounds};
use crate::markdown::{
    get_highlighter, highlight_html, parse_markup, render_card_html, render_document,
    serialize_document, Document, ImageRegistry,
};
use crate::markdown::syntax::PrefixedTokenizer;
use log::{debug, info, warn};

/// The representation currently being edited.
#[derive(Debug, Clone)]
pub enum SourceOfTruth {
    Markup(String),
    Tree(EditorHost),
}

/// One editing session: the document, its mode, and its image registry.
#[derive(Debug, Clone)]
pub struct EditingSession {
    settings: Settings,
    source: SourceOfTruth,
    registry: ImageRegistry,
}

impl EditingSession {
    /// Start an empty session in the mode configured in `settings`.
    pub fn new(settings: Settings) -> Self {
        Self::with_markup("", settings)
    }

    /// Start a session from markup text, in the mode configured in
    /// `settings`.
    pub fn with_markup(markup: &str, settings: Settings) -> Self {
        let registry =
            ImageRegistry::with_limits(settings.externalize_threshold, settings.preview_chars);
        let start_mode = settings.view_mode;
        let mut session = Self {
            settings,
            source: SourceOfTruth::Markup(markup.to_string()),
            registry,
        };
        if start_mode == ViewMode::Rendered {
            session.switch_mode();
        }
        debug!("Editing session started in {:?} mode", session.view_mode());
        session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn view_mode(&self) -> ViewMode {
        match self.source {
            SourceOfTruth::Markup(_) => ViewMode::Raw,
            SourceOfTruth::Tree(_) => ViewMode::Rendered,
        }
    }

    pub fn registry(&self) -> &ImageRegistry {
        &self.registry
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mode Switching
    // ─────────────────────────────────────────────────────────────────────────

    /// Switch to the other mode, converting the document once.
    pub fn switch_mode(&mut self) -> ViewMode {
        let source = std::mem::replace(&mut self.source, SourceOfTruth::Markup(String::new()));
        self.source = match source {
            SourceOfTruth::Markup(markup) => {
                let doc = parse_markup(&markup);
                SourceOfTruth::Tree(EditorHost::new(doc, WidthBounds::from_settings(&self.settings)))
            }
            SourceOfTruth::Tree(host) => {
                let markup = serialize_document(host.document(), &mut self.registry);
                SourceOfTruth::Markup(markup)
            }
        };
        let mode = self.view_mode();
        info!(
            "Switched to {} mode ({} registered images)",
            mode.label(),
            self.registry.len()
        );
        mode
    }

    /// Switch to `mode` if it is not already active.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> bool {
        if self.view_mode() == mode {
            return false;
        }
        self.switch_mode();
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content Access
    // ─────────────────────────────────────────────────────────────────────────

    /// The markup text, in `Raw` mode.
    pub fn markup(&self) -> Option<&str> {
        match &self.source {
            SourceOfTruth::Markup(markup) => Some(markup),
            SourceOfTruth::Tree(_) => None,
        }
    }

    /// Replace the markup text wholesale. Only valid in `Raw` mode.
    pub fn set_markup(&mut self, text: impl Into<String>) -> bool {
        match &mut self.source {
            SourceOfTruth::Markup(markup) => {
                *markup = text.into();
                true
            }
            SourceOfTruth::Tree(_) => {
                warn!("Ignoring markup update while in Visual mode");
                false
            }
        }
    }

    /// The structured document, in `Rendered` mode.
    pub fn document(&self) -> Option<&Document> {
        match &self.source {
            SourceOfTruth::Tree(host) => Some(host.document()),
            SourceOfTruth::Markup(_) => None,
        }
    }

    /// The editor host, in `Rendered` mode.
    pub fn host_mut(&mut self) -> Option<&mut EditorHost> {
        match &mut self.source {
            SourceOfTruth::Tree(host) => Some(host),
            SourceOfTruth::Markup(_) => None,
        }
    }

    /// Markup for the current content, whatever the mode.
    ///
    /// In `Rendered` mode this serializes the tree, which may register images.
    pub fn export_markup(&mut self) -> String {
        match &self.source {
            SourceOfTruth::Markup(markup) => markup.clone(),
            SourceOfTruth::Tree(host) => serialize_document(host.document(), &mut self.registry),
        }
    }

    /// HTML for the display surface.
    pub fn render_html(&self) -> String {
        match &self.source {
            SourceOfTruth::Markup(markup) => render_card_html(markup, &self.registry, &self.settings),
            SourceOfTruth::Tree(host) => {
                let tokenizer = PrefixedTokenizer {
                    highlighter: get_highlighter(),
                    class_prefix: &self.settings.highlight_class_prefix,
                };
                let html = render_document(host.document(), &self.registry);
                highlight_html(&html, &self.registry, &tokenizer)
            }
        }
    }

    /// End the session's content: empty document, registry cleared.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.source = match self.source {
            SourceOfTruth::Markup(_) => SourceOfTruth::Markup(String::new()),
            SourceOfTruth::Tree(_) => SourceOfTruth::Tree(EditorHost::new(
                Document::default(),
                WidthBounds::from_settings(&self.settings),
            )),
        };
        info!("Editing session reset");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{Block, ImageNode, NodePath};

    fn base64_image(len: usize) -> String {
        let prefix = "data:image/jpeg;base64,";
        format!("{}{}", prefix, "/9j/".repeat(len).chars().take(len - prefix.len()).collect::<String>())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mode Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_session_defaults_to_raw() {
        let session = EditingSession::new(Settings::default());
        assert_eq!(session.view_mode(), ViewMode::Raw);
        assert_eq!(session.markup(), Some(""));
        assert!(session.document().is_none());
    }

    #[test]
    fn test_session_can_start_rendered() {
        let settings = Settings {
            view_mode: ViewMode::Rendered,
            ..Settings::default()
        };
        let session = EditingSession::with_markup("# Hi", settings);
        assert_eq!(session.view_mode(), ViewMode::Rendered);
        assert_eq!(session.document().map(|d| d.blocks.len()), Some(1));
    }

    #[test]
    fn test_switch_roundtrip_short_content() {
        let markup = "# Title\n\n* a\n* b\n\n```go\nfmt.Println(1)\n```";
        let mut session = EditingSession::with_markup(markup, Settings::default());

        assert_eq!(session.switch_mode(), ViewMode::Rendered);
        assert!(session.markup().is_none());
        assert_eq!(session.switch_mode(), ViewMode::Raw);

        assert_eq!(session.markup(), Some(markup));
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_set_view_mode_is_noop_when_active() {
        let mut session = EditingSession::with_markup("x", Settings::default());
        assert!(!session.set_view_mode(ViewMode::Raw));
        assert!(session.set_view_mode(ViewMode::Rendered));
        assert!(!session.set_view_mode(ViewMode::Rendered));
    }

    #[test]
    fn test_set_markup_only_in_raw_mode() {
        let mut session = EditingSession::new(Settings::default());
        assert!(session.set_markup("hello"));
        session.switch_mode();
        assert!(!session.set_markup("ignored"));
        session.switch_mode();
        assert_eq!(session.markup(), Some("hello"));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Image Registry Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_registry_survives_mode_switches() {
        let source = base64_image(200);
        let mut session = EditingSession::new(Settings::default());
        session.switch_mode();

        let host = session.host_mut().unwrap();
        host.apply_edit(|doc| doc.blocks.push(Block::Image(ImageNode::new(source.clone(), "photo"))));

        session.switch_mode();
        let markup = session.markup().unwrap_or_default().to_string();
        assert!(markup.starts_with("![photo](__IMG_1__)\n<!-- __IMG_1__: "));
        assert!(!markup.contains(&source));
        assert_eq!(session.registry().len(), 1);

        session.switch_mode();
        let doc = session.document().unwrap();
        match &doc.blocks[..] {
            [Block::Image(image)] => {
                assert_eq!(image.src, "__IMG_1__");
                assert_eq!(session.registry().resolve(&image.src), source);
            }
            other => panic!("expected one image, got {:?}", other),
        }
        assert!(session.render_html().contains(&source));

        // The tree keeps the identifier, so switching back mints nothing new
        session.switch_mode();
        assert_eq!(session.registry().len(), 1);
    }

    #[test]
    fn test_reset_clears_registry() {
        let mut session = EditingSession::with_markup("", Settings::default());
        session.switch_mode();
        let source = base64_image(120);
        session
            .host_mut()
            .unwrap()
            .apply_edit(|doc| doc.blocks.push(Block::Image(ImageNode::new(source, ""))));
        session.export_markup();
        assert_eq!(session.registry().len(), 1);

        session.reset();
        assert!(session.registry().is_empty());
        assert_eq!(session.document().map(|d| d.blocks.len()), Some(0));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_render_html_in_both_modes() {
        let markup = "## Code\n\n```rust\nlet x = 1;\n```";
        let mut session = EditingSession::with_markup(markup, Settings::default());

        let raw = session.render_html();
        assert!(raw.contains("<h2>Code</h2>"));
        assert!(raw.contains("hljs-"));

        session.switch_mode();
        let visual = session.render_html();
        assert!(visual.starts_with("<h2>Code</h2>\n<pre><code class=\"language-rust\">"));
        assert!(visual.contains("hljs-"));
    }

    #[test]
    fn test_image_resize_in_session_is_rendered() {
        let mut session = EditingSession::with_markup("![a](a.png)", Settings::default());
        session.switch_mode();
        let host = session.host_mut().unwrap();
        let path = NodePath::root(0);
        assert!(host.begin_image_resize(&path, 0.0, Some(300)));
        host.drag_image_resize(-250.0);
        host.end_image_resize();

        assert!(session.render_html().contains("style=\"width: 100px\""));
        // Width does not survive the trip through markup
        session.switch_mode();
        assert_eq!(session.markup(), Some("![a](a.png)"));
    }
}
