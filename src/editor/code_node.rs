//! Language-tagged code node
//!
//! The code node carries a language picker over the fixed [`LANGUAGES`]
//! list. Picking an entry retags the block and leaves its code untouched.
//! A code node that becomes empty is removed by the host's reconciliation
//! pass, see [`is_removable`].

use crate::markdown::{Block, CodeBlock, Language, LanguageOption, LANGUAGES};
use log::debug;

/// One row of the open picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerEntry {
    pub option: LanguageOption,
    pub selected: bool,
}

/// Open/closed state of a code node's language picker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LanguagePicker {
    open: bool,
}

impl LanguagePicker {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Label on the picker button for a block.
    pub fn current_label(code: &CodeBlock) -> &'static str {
        code.language.label()
    }

    /// Picker rows, in list order, with the block's language marked.
    pub fn entries(code: &CodeBlock) -> Vec<PickerEntry> {
        LANGUAGES
            .iter()
            .map(|option| PickerEntry {
                option: *option,
                selected: option.value == code.language.value(),
            })
            .collect()
    }

    /// Apply a picked value and close the picker.
    pub fn select(&mut self, code: &mut CodeBlock, value: &str) -> Language {
        let language = Language::from_tag(value);
        if code.language != language {
            debug!("Code block language {} -> {}", code.language, language);
        }
        code.language = language;
        self.close();
        language
    }
}

/// Removal predicate run by reconciliation: a code block holding no code.
pub fn is_removable(block: &Block) -> bool {
    matches!(block, Block::CodeBlock(code) if code.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_keeps_content() {
        let mut code = CodeBlock::new(Language::PlainText, "a < b");
        let before = code.html.clone();
        let mut picker = LanguagePicker::default();
        picker.toggle();
        assert!(picker.is_open());

        assert_eq!(picker.select(&mut code, "python"), Language::Python);

        assert_eq!(code.language, Language::Python);
        assert_eq!(code.html, before);
        assert!(!picker.is_open());
    }

    #[test]
    fn test_entries_mark_current_language() {
        let code = CodeBlock::new(Language::Rust, "fn x() {}");
        let entries = LanguagePicker::entries(&code);
        assert_eq!(entries.len(), LANGUAGES.len());
        let selected: Vec<&str> = entries
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.option.value)
            .collect();
        assert_eq!(selected, vec!["rust"]);
        assert_eq!(LanguagePicker::current_label(&code), "Rust");
    }

    #[test]
    fn test_unknown_pick_is_plain_text() {
        let mut code = CodeBlock::new(Language::Go, "x");
        let mut picker = LanguagePicker::default();
        assert_eq!(picker.select(&mut code, "cobol"), Language::PlainText);
        assert_eq!(LanguagePicker::current_label(&code), "Plain Text");
    }

    #[test]
    fn test_is_removable() {
        assert!(is_removable(&Block::CodeBlock(CodeBlock::new(Language::Rust, ""))));
        assert!(is_removable(&Block::CodeBlock(CodeBlock::new(Language::Rust, "\n"))));
        assert!(!is_removable(&Block::CodeBlock(CodeBlock::new(Language::Rust, "x"))));
        assert!(!is_removable(&Block::Paragraph(vec![])));
    }
}
