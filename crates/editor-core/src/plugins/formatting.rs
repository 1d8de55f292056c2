//! Toolbar formatting controls: font family, background color, and the
//! subscript/superscript toggles.
//!
//! Style changes go through [`PATCH_STYLE`], each touching only its own CSS
//! property, so font family and background color compose on the same text.

use crate::bus::{Command, CommandPriority};
use crate::commands::{FORMAT_TEXT, PATCH_STYLE};
use crate::config::ToolbarConfig;
use crate::core::Editor;
use crate::error::CommandError;
use crate::plugin::EditorPlugin;
use crate::style::{self, StylePatch};
use crate::toolbar::{ControlKind, ToolbarControl};

/// `None` clears the font family.
pub const FONT_FAMILY: Command<Option<String>> = Command::new("toolbar.font_family");
/// `None` clears the background color.
pub const BACKGROUND_COLOR: Command<Option<String>> = Command::new("toolbar.background_color");

pub struct ToolbarFormattingPlugin {
    font_families: Vec<String>,
}

impl ToolbarFormattingPlugin {
    pub fn new(font_families: Vec<String>) -> Self {
        Self { font_families }
    }

    pub fn from_config(config: &ToolbarConfig) -> Self {
        Self::new(config.font_families.clone())
    }
}

impl Default for ToolbarFormattingPlugin {
    fn default() -> Self {
        Self::from_config(&ToolbarConfig::default())
    }
}

impl EditorPlugin for ToolbarFormattingPlugin {
    fn id(&self) -> &'static str {
        "toolbar.formatting"
    }

    fn toolbar_controls(&self) -> Vec<ToolbarControl> {
        vec![
            ToolbarControl::new(
                "font_family",
                "Font family",
                FONT_FAMILY.id(),
                ControlKind::Select(self.font_families.clone()),
            ),
            ToolbarControl::new(
                "background_color",
                "Background color",
                BACKGROUND_COLOR.id(),
                ControlKind::ColorPicker,
            ),
            ToolbarControl::new("subscript", "Subscript", FORMAT_TEXT.id(), ControlKind::Toggle),
            ToolbarControl::new(
                "superscript",
                "Superscript",
                FORMAT_TEXT.id(),
                ControlKind::Toggle,
            ),
        ]
    }

    fn register(&mut self, editor: &mut Editor) -> Result<(), CommandError> {
        editor.register_command(FONT_FAMILY, CommandPriority::Editor, |editor, family| {
            editor.dispatch(PATCH_STYLE, style_patch(style::FONT_FAMILY, family.as_deref()))
        })?;
        editor.register_command(BACKGROUND_COLOR, CommandPriority::Editor, |editor, color| {
            editor.dispatch(
                PATCH_STYLE,
                style_patch(style::BACKGROUND_COLOR, color.as_deref()),
            )
        })?;
        Ok(())
    }
}

fn style_patch(property: &str, value: Option<&str>) -> StylePatch {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => StylePatch::new().set(property, value),
        None => StylePatch::new().remove(property),
    }
}
