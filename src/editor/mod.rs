//! Editor module for markcard
//!
//! This module contains the interactive node behaviors of the visual editing
//! mode and the host that owns the live document.

mod code_node;
mod host;
mod image_node;

pub use code_node::{is_removable, LanguagePicker, PickerEntry};
pub use host::{EditorHost, ReconcileReport};
pub use image_node::{width_label, ImageResizer, WidthBounds, DEFAULT_START_WIDTH};
