use crate::bus::{Command, CommandPriority};
use crate::core::{Editor, node_at_path};
use crate::error::CommandError;
use crate::node::{CodeNode, Node, NodeKind, ParagraphNode};
use crate::ops::{Op, Transaction};
use crate::plugin::{EditorPlugin, NodeSpec};

/// Turns the focused paragraph into a code block with the given language,
/// or a code block back into a paragraph.
pub const TOGGLE_CODE_BLOCK: Command<Option<String>> = Command::new("code.toggle_block");

pub struct CodePlugin;

impl EditorPlugin for CodePlugin {
    fn id(&self) -> &'static str {
        "code"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block(NodeKind::Code)]
    }

    fn register(&mut self, editor: &mut Editor) -> Result<(), CommandError> {
        editor.register_command(TOGGLE_CODE_BLOCK, CommandPriority::Editor, |editor, language| {
            let tx = toggle_code_block(editor, language.clone())?;
            editor.apply(tx)?;
            Ok(true)
        })?;
        Ok(())
    }
}

fn toggle_code_block(editor: &Editor, language: Option<String>) -> Result<Transaction, CommandError> {
    let block_path = editor.selection().focus.block_path().to_vec();
    if block_path.is_empty() {
        return Err(CommandError::rejected("No active block"));
    }
    let Some(node) = node_at_path(editor.doc(), &block_path).cloned() else {
        return Err(CommandError::rejected("No active block"));
    };

    let next = match node {
        Node::Code(code) => Node::Paragraph(ParagraphNode {
            children: code.children,
            direction: code.direction,
            format: code.format,
            indent: code.indent,
            ..ParagraphNode::new(Vec::new())
        }),
        Node::Paragraph(p) => Node::Code(CodeNode {
            direction: p.direction,
            format: p.format,
            indent: p.indent,
            ..CodeNode::new(language, p.children)
        }),
        _ => return Err(CommandError::rejected("Active block is not a text block")),
    };

    Ok(Transaction::new(Op::replace_node(block_path, next).to_vec())
        .with_selection(editor.selection().clone())
        .source("command:code.toggle_block"))
}
