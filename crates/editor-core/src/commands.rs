//! Commands provided by the core plugin. Plugin-specific commands live next
//! to their plugin.

use crate::bus::Command;
use crate::node::TextFormat;
use crate::style::StylePatch;

pub const INSERT_TEXT: Command<String> = Command::new("core.insert_text");
pub const INSERT_PARAGRAPH: Command<()> = Command::new("core.insert_paragraph");
pub const UNDO: Command<()> = Command::new("core.undo");
pub const REDO: Command<()> = Command::new("core.redo");
/// Toggles the given format bits on the selection.
pub const FORMAT_TEXT: Command<TextFormat> = Command::new("core.format_text");
pub const PATCH_STYLE: Command<StylePatch> = Command::new("core.patch_style");
