//! Derived toolbar state.
//!
//! The editor owns one [`ToolbarContext`] and refreshes it after every
//! content or selection change, before update listeners run. Consumers only
//! read it; changes go through commands.

use crate::core::{Editor, node_at_path};
use crate::edits;
use crate::node::{Node, TextFormat, TextNode};
use crate::style::{self, style_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockType {
    #[default]
    Paragraph,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolbarState {
    pub block_type: BlockType,
    pub code_language: Option<String>,
    /// Format bits shared by every selected text leaf.
    pub format: TextFormat,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub font_color: Option<String>,
    pub background_color: Option<String>,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl ToolbarState {
    pub fn derive(editor: &Editor) -> Self {
        let focus = &editor.selection().focus;
        let (block_type, code_language) = match node_at_path(editor.doc(), focus.block_path()) {
            Some(Node::Code(code)) => (BlockType::Code, code.language.clone()),
            _ => (BlockType::Paragraph, None),
        };

        let style = match node_at_path(editor.doc(), &focus.path) {
            Some(Node::Text(text)) => text.style.as_str(),
            _ => "",
        };

        Self {
            block_type,
            code_language,
            format: selected_format(editor),
            font_family: style_value(style, style::FONT_FAMILY),
            font_size: style_value(style, style::FONT_SIZE),
            font_color: style_value(style, style::COLOR),
            background_color: style_value(style, style::BACKGROUND_COLOR),
            can_undo: editor.can_undo(),
            can_redo: editor.can_redo(),
        }
    }

    pub fn is_active(&self, format: TextFormat) -> bool {
        self.format.contains(format)
    }
}

fn selected_format(editor: &Editor) -> TextFormat {
    TextFormat::all()
        .iter()
        .filter(|flag| {
            edits::all_selected_text(editor, &|t: &TextNode| t.format.contains(*flag))
                .unwrap_or(false)
        })
        .fold(TextFormat::empty(), |acc, flag| acc | flag)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    /// A button that toggles a format or state.
    Toggle,
    /// A dropdown over fixed options.
    Select(Vec<String>),
    ColorPicker,
}

/// A toolbar entry contributed by a plugin, bound to the command it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarControl {
    pub id: &'static str,
    pub label: String,
    pub command: &'static str,
    pub kind: ControlKind,
}

impl ToolbarControl {
    pub fn new(
        id: &'static str,
        label: impl Into<String>,
        command: &'static str,
        kind: ControlKind,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            command,
            kind,
        }
    }
}

#[derive(Debug, Default)]
pub struct ToolbarContext {
    state: ToolbarState,
    revision: u64,
    controls: Vec<ToolbarControl>,
}

impl ToolbarContext {
    pub fn state(&self) -> &ToolbarState {
        &self.state
    }

    /// Bumped on every refresh.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn controls(&self) -> &[ToolbarControl] {
        &self.controls
    }

    pub fn control(&self, id: &str) -> Option<&ToolbarControl> {
        self.controls.iter().find(|control| control.id == id)
    }

    pub(crate) fn add_controls(&mut self, controls: Vec<ToolbarControl>) {
        for control in controls {
            if self.control(control.id).is_some() {
                tracing::warn!(control = control.id, "duplicate toolbar control ignored");
                continue;
            }
            self.controls.push(control);
        }
    }

    pub(crate) fn refresh(&mut self, state: ToolbarState) {
        self.state = state;
        self.revision += 1;
    }
}
