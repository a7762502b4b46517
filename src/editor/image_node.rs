//! Resizable image node
//!
//! Drag-to-resize state machine for block images. While a drag is active,
//! every pointer move recomputes the width from the horizontal displacement
//! and commits it to the node right away.

use crate::config::Settings;
use crate::markdown::ImageNode;
use log::debug;

/// Width assumed when the rendered width of an image is unknown.
pub const DEFAULT_START_WIDTH: u32 = 300;

// ─────────────────────────────────────────────────────────────────────────────
// Width Bounds
// ─────────────────────────────────────────────────────────────────────────────

/// Inclusive pixel range a resized image may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for WidthBounds {
    fn default() -> Self {
        Self { min: 100, max: 600 }
    }
}

impl WidthBounds {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min: settings.image_min_width,
            max: settings.image_max_width,
        }
    }

    /// Clamp a requested width, rounding to whole pixels.
    pub fn clamp(&self, requested: f64) -> u32 {
        let requested = requested.round();
        if requested <= self.min as f64 {
            self.min
        } else if requested >= self.max as f64 {
            self.max
        } else {
            requested as u32
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resizer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging { start_x: f64, start_width: u32 },
}

/// Drag gesture on an image's resize handle.
#[derive(Debug, Clone)]
pub struct ImageResizer {
    bounds: WidthBounds,
    state: DragState,
}

impl Default for ImageResizer {
    fn default() -> Self {
        Self::new(WidthBounds::default())
    }
}

impl ImageResizer {
    pub fn new(bounds: WidthBounds) -> Self {
        Self {
            bounds,
            state: DragState::Idle,
        }
    }

    pub fn bounds(&self) -> WidthBounds {
        self.bounds
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Start a drag at `pointer_x` on an image currently `rendered_width`
    /// pixels wide. `None` falls back to [`DEFAULT_START_WIDTH`].
    pub fn begin(&mut self, pointer_x: f64, rendered_width: Option<u32>) {
        let start_width = rendered_width.unwrap_or(DEFAULT_START_WIDTH);
        debug!("Image resize started at width {}px", start_width);
        self.state = DragState::Dragging {
            start_x: pointer_x,
            start_width,
        };
    }

    /// Pointer moved: commit the clamped width to `image`.
    ///
    /// Returns the committed width, or `None` when no drag is active.
    pub fn drag_to(&mut self, pointer_x: f64, image: &mut ImageNode) -> Option<u32> {
        let DragState::Dragging {
            start_x,
            start_width,
        } = self.state
        else {
            return None;
        };
        let width = self.bounds.clamp(start_width as f64 + (pointer_x - start_x));
        image.width = Some(width);
        Some(width)
    }

    /// Release the handle. Returns whether a drag was active.
    pub fn end(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        self.state = DragState::Idle;
        was_dragging
    }
}

/// Label shown on the width indicator.
pub fn width_label(image: &ImageNode) -> String {
    image.width_css()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_commits_live() {
        let mut image = ImageNode::new("a.png", "a");
        let mut resizer = ImageResizer::default();

        resizer.begin(500.0, Some(300));
        assert_eq!(resizer.drag_to(550.0, &mut image), Some(350));
        assert_eq!(image.width, Some(350));
        assert_eq!(resizer.drag_to(450.0, &mut image), Some(250));
        assert_eq!(image.width, Some(250));
        assert!(resizer.end());
        assert_eq!(image.width, Some(250));
    }

    #[test]
    fn test_drag_clamps_to_bounds() {
        let mut image = ImageNode::new("a.png", "a");
        let mut resizer = ImageResizer::default();

        resizer.begin(500.0, Some(300));
        // 300 - 280 = 20px requested
        assert_eq!(resizer.drag_to(220.0, &mut image), Some(100));
        assert_eq!(image.width, Some(100));
        // 300 + 600 = 900px requested
        assert_eq!(resizer.drag_to(1100.0, &mut image), Some(600));
        assert_eq!(image.width, Some(600));
    }

    #[test]
    fn test_drag_without_begin_does_nothing() {
        let mut image = ImageNode::new("a.png", "a");
        let mut resizer = ImageResizer::default();
        assert_eq!(resizer.drag_to(10.0, &mut image), None);
        assert_eq!(image.width, None);
        assert!(!resizer.end());
    }

    #[test]
    fn test_unknown_rendered_width_uses_default() {
        let mut image = ImageNode::new("a.png", "a");
        let mut resizer = ImageResizer::default();
        resizer.begin(0.0, None);
        assert_eq!(resizer.drag_to(0.0, &mut image), Some(DEFAULT_START_WIDTH));
    }

    #[test]
    fn test_bounds_from_settings() {
        let settings = Settings {
            image_min_width: 50,
            image_max_width: 800,
            ..Settings::default()
        };
        let bounds = WidthBounds::from_settings(&settings);
        assert_eq!(bounds.clamp(20.0), 50);
        assert_eq!(bounds.clamp(900.0), 800);
        assert_eq!(bounds.clamp(333.4), 333);
    }

    #[test]
    fn test_width_label() {
        let mut image = ImageNode::new("a.png", "a");
        assert_eq!(width_label(&image), "100%");
        image.width = Some(120);
        assert_eq!(width_label(&image), "120px");
    }
}
