use crate::bus::{Command, CommandPriority};
use crate::core::Editor;
use crate::edits;
use crate::error::CommandError;
use crate::node::{ImageNode, Node, NodeKind};
use crate::plugin::{EditorPlugin, NodeSpec};

pub const INSERT_IMAGE: Command<InsertImage> = Command::new("image.insert");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertImage {
    pub src: String,
    pub alt_text: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

pub struct InlineImagePlugin;

impl EditorPlugin for InlineImagePlugin {
    fn id(&self) -> &'static str {
        "inline_image"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::inline_atomic(NodeKind::InlineImage)]
    }

    fn register(&mut self, editor: &mut Editor) -> Result<(), CommandError> {
        editor.register_command(INSERT_IMAGE, CommandPriority::Editor, |editor, payload| {
            let image = ImageNode::new(payload.src.clone(), payload.alt_text.clone())?
                .with_size(payload.width, payload.height);
            let tx =
                edits::insert_inline_at_caret(editor, Node::InlineImage(image), "command:image.insert")?;
            editor.apply(tx)?;
            Ok(true)
        })?;
        Ok(())
    }
}
