//! Editor host
//!
//! Owns the live [`Document`] of the visual editing mode and routes node
//! interactions (image resizing and deletion, code retagging, text edits) to
//! it. After every edit the host runs one reconciliation pass that removes
//! nodes matching a removal predicate, so the tree is never mutated while an
//! edit is still being applied.

use crate::editor::code_node::{is_removable, LanguagePicker, PickerEntry};
use crate::editor::image_node::{ImageResizer, WidthBounds};
use crate::markdown::{remove_empty_list_items, Block, CodeBlock, Document, ImageNode, Language, NodePath};
use log::{debug, info};

/// Nodes removed by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub code_blocks: usize,
    pub list_items: usize,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.code_blocks == 0 && self.list_items == 0
    }
}

/// The visual editor's document plus the state of its interactive nodes.
#[derive(Debug, Clone)]
pub struct EditorHost {
    document: Document,
    resizer: ImageResizer,
    resizing: Option<NodePath>,
    picker: LanguagePicker,
    picker_target: Option<NodePath>,
}

impl EditorHost {
    /// Host a document. Reconciliation runs once so the first render never
    /// shows removable nodes.
    pub fn new(document: Document, bounds: WidthBounds) -> Self {
        let mut host = Self {
            document,
            resizer: ImageResizer::new(bounds),
            resizing: None,
            picker: LanguagePicker::default(),
            picker_target: None,
        };
        host.reconcile();
        host
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn image_at(&self, path: &NodePath) -> Option<&ImageNode> {
        match self.document.get(path)? {
            Block::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn code_at(&self, path: &NodePath) -> Option<&CodeBlock> {
        match self.document.get(path)? {
            Block::CodeBlock(code) => Some(code),
            _ => None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Image Node
    // ─────────────────────────────────────────────────────────────────────────

    /// Grab the resize handle of the image at `path`.
    ///
    /// Returns `false` when `path` does not address an image.
    pub fn begin_image_resize(
        &mut self,
        path: &NodePath,
        pointer_x: f64,
        rendered_width: Option<u32>,
    ) -> bool {
        let Some(image) = self.image_at(path) else {
            return false;
        };
        let start_width = rendered_width.or(image.width);
        self.resizer.begin(pointer_x, start_width);
        self.resizing = Some(path.clone());
        true
    }

    /// Pointer moved while resizing; the width is committed immediately.
    pub fn drag_image_resize(&mut self, pointer_x: f64) -> Option<u32> {
        let path = self.resizing.clone()?;
        match self.document.get_mut(&path) {
            Some(Block::Image(image)) => self.resizer.drag_to(pointer_x, image),
            _ => {
                self.cancel_resize();
                None
            }
        }
    }

    /// Release the resize handle, returning the final width.
    pub fn end_image_resize(&mut self) -> Option<u32> {
        let path = self.resizing.take()?;
        self.resizer.end();
        let width = self.image_at(&path).and_then(|image| image.width);
        debug!("Image resize finished at {:?}", width);
        width
    }

    fn cancel_resize(&mut self) {
        self.resizer.end();
        self.resizing = None;
    }

    /// Delete the node at `path` right away.
    pub fn delete_node(&mut self, path: &NodePath) -> Option<Block> {
        let removed = self.document.remove(path)?;
        debug!("Deleted {} node at {:?}", removed.kind(), path.0);
        // Paths held for in-flight interactions may now be stale
        self.cancel_resize();
        self.picker_target = None;
        self.picker.close();
        Some(removed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Code Node
    // ─────────────────────────────────────────────────────────────────────────

    /// Open or close the language picker of the code block at `path`.
    pub fn toggle_language_picker(&mut self, path: &NodePath) -> bool {
        if self.code_at(path).is_none() {
            return false;
        }
        if self.picker_target.as_ref() != Some(path) {
            self.picker.close();
            self.picker_target = Some(path.clone());
        }
        self.picker.toggle();
        self.picker.is_open()
    }

    /// Rows of the open picker, if one is open.
    pub fn picker_entries(&self) -> Option<Vec<PickerEntry>> {
        if !self.picker.is_open() {
            return None;
        }
        let path = self.picker_target.as_ref()?;
        self.code_at(path).map(LanguagePicker::entries)
    }

    /// Retag the code block at `path`. The code itself is left as is.
    pub fn set_code_language(&mut self, path: &NodePath, value: &str) -> Option<Language> {
        let Some(Block::CodeBlock(code)) = self.document.get_mut(path) else {
            return None;
        };
        let language = self.picker.select(code, value);
        self.picker_target = None;
        Some(language)
    }

    /// Replace the code of the block at `path`, then reconcile.
    pub fn set_code_text(&mut self, path: &NodePath, text: &str) -> ReconcileReport {
        self.apply_edit(|doc| {
            if let Some(Block::CodeBlock(code)) = doc.get_mut(path) {
                code.set_text(text);
            }
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edit Cycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply one edit to the document, then run reconciliation once.
    pub fn apply_edit<F>(&mut self, edit: F) -> ReconcileReport
    where
        F: FnOnce(&mut Document),
    {
        edit(&mut self.document);
        self.reconcile()
    }

    /// Remove emptied code blocks and empty list items.
    pub fn reconcile(&mut self) -> ReconcileReport {
        let mut doomed = Vec::new();
        self.document.walk(|path, block| {
            if is_removable(block) {
                doomed.push(path.clone());
            }
        });

        // Later paths first so earlier ones stay valid
        let mut report = ReconcileReport::default();
        for path in doomed.iter().rev() {
            if self.document.remove(path).is_some() {
                report.code_blocks += 1;
            }
        }
        report.list_items = remove_empty_list_items(&mut self.document);

        if !report.is_empty() {
            info!(
                "Reconciled document: removed {} empty code blocks, {} empty list items",
                report.code_blocks, report.list_items
            );
            self.cancel_resize();
            self.picker_target = None;
            self.picker.close();
        }
        report
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{parse_markup, Inline, ListItem};

    fn host(markup: &str) -> EditorHost {
        EditorHost::new(parse_markup(markup), WidthBounds::default())
    }

    #[test]
    fn test_resize_image_through_host() {
        let mut host = host("![cat](https://x.test/cat.png)");
        let path = NodePath::root(0);

        assert!(host.begin_image_resize(&path, 400.0, Some(300)));
        assert_eq!(host.drag_image_resize(120.0), Some(100));
        assert_eq!(host.image_at(&path).and_then(|i| i.width), Some(100));
        assert_eq!(host.drag_image_resize(1000.0), Some(600));
        assert_eq!(host.image_at(&path).and_then(|i| i.width), Some(600));
        assert_eq!(host.end_image_resize(), Some(600));
        assert_eq!(host.drag_image_resize(500.0), None);
    }

    #[test]
    fn test_resize_requires_image() {
        let mut host = host("just text");
        assert!(!host.begin_image_resize(&NodePath::root(0), 0.0, None));
        assert_eq!(host.drag_image_resize(10.0), None);
    }

    #[test]
    fn test_delete_image_node() {
        let mut host = host("before\n![a](a.png)\nafter");
        let removed = host.delete_node(&NodePath::root(1));
        assert!(matches!(removed, Some(Block::Image(_))));
        assert_eq!(host.document().blocks.len(), 2);
    }

    #[test]
    fn test_delete_cancels_resize() {
        let mut host = host("![a](a.png)");
        let path = NodePath::root(0);
        assert!(host.begin_image_resize(&path, 0.0, Some(200)));
        host.delete_node(&path);
        assert_eq!(host.drag_image_resize(50.0), None);
    }

    #[test]
    fn test_language_picker_retags_without_touching_code() {
        let mut host = host("```\nx = 1\n```");
        let path = NodePath::root(0);

        assert!(host.toggle_language_picker(&path));
        let entries = host.picker_entries().unwrap_or_default();
        assert!(entries.iter().any(|e| e.selected && e.option.value == "plaintext"));

        assert_eq!(host.set_code_language(&path, "python"), Some(Language::Python));
        let code = host.code_at(&path).unwrap();
        assert_eq!(code.language, Language::Python);
        assert_eq!(code.text(), "x = 1");
        assert!(host.picker_entries().is_none());
    }

    #[test]
    fn test_emptied_code_block_is_removed_on_reconcile() {
        let mut host = host("intro\n```rust\nfn main() {}\n```\noutro");
        let path = NodePath::root(1);

        let report = host.set_code_text(&path, "\n");

        assert_eq!(report.code_blocks, 1);
        assert_eq!(host.document().blocks.len(), 2);
        assert!(host
            .document()
            .blocks
            .iter()
            .all(|b| !matches!(b, Block::CodeBlock(_))));
    }

    #[test]
    fn test_nonempty_code_edit_keeps_block() {
        let mut host = host("```rust\nfn a() {}\n```");
        let report = host.set_code_text(&NodePath::root(0), "fn b() {}");
        assert!(report.is_empty());
        assert_eq!(host.code_at(&NodePath::root(0)).unwrap().text(), "fn b() {}");
    }

    #[test]
    fn test_reconcile_removes_nested_code_and_empty_items() {
        let doc = Document::new(vec![Block::BulletList(vec![
            ListItem {
                blocks: vec![Block::CodeBlock(CodeBlock::new(Language::C, "int x;"))],
            },
            ListItem::paragraph(vec![Inline::text("keep")]),
        ])]);
        let mut host = EditorHost::new(doc, WidthBounds::default());

        let report = host.apply_edit(|doc| {
            if let Some(Block::CodeBlock(code)) = doc.get_mut(&NodePath(vec![0, 0, 0])) {
                code.set_text("");
            }
        });

        assert_eq!(report.code_blocks, 1);
        assert_eq!(report.list_items, 1);
        assert_eq!(
            host.document().blocks,
            vec![Block::BulletList(vec![ListItem::paragraph(vec![Inline::text("keep")])])]
        );
    }

    #[test]
    fn test_new_host_reconciles_initial_document() {
        let host = host("```\n```\ntext");
        assert_eq!(host.document().blocks.len(), 1);
    }
}
