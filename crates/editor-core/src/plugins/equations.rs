use crate::bus::{Command, CommandPriority};
use crate::core::Editor;
use crate::edits;
use crate::error::CommandError;
use crate::node::{EquationNode, Node, NodeKind};
use crate::plugin::{EditorPlugin, NodeSpec};

pub const INSERT_EQUATION: Command<InsertEquation> = Command::new("equations.insert");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertEquation {
    pub equation: String,
    pub inline: bool,
}

impl InsertEquation {
    pub fn inline(equation: impl Into<String>) -> Self {
        Self {
            equation: equation.into(),
            inline: true,
        }
    }

    pub fn block(equation: impl Into<String>) -> Self {
        Self {
            equation: equation.into(),
            inline: false,
        }
    }
}

pub struct EquationsPlugin;

impl EditorPlugin for EquationsPlugin {
    fn id(&self) -> &'static str {
        "equations"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::inline_atomic(NodeKind::Equation)]
    }

    fn register(&mut self, editor: &mut Editor) -> Result<(), CommandError> {
        editor.register_command(INSERT_EQUATION, CommandPriority::Editor, |editor, payload| {
            let node = EquationNode::new(payload.equation.clone(), payload.inline)?;
            let tx = insert_equation(editor, node)?;
            editor.apply(tx)?;
            Ok(true)
        })?;
        Ok(())
    }
}

/// Inline equations go at a collapsed text caret. Anything else becomes a
/// root-level paragraph holding the equation.
fn insert_equation(
    editor: &Editor,
    node: EquationNode,
) -> Result<crate::ops::Transaction, CommandError> {
    let at_caret = node.inline
        && editor.selection().is_collapsed()
        && edits::focus_text(editor).is_ok();
    if at_caret {
        return edits::insert_inline_at_caret(editor, Node::Equation(node), "command:equations.insert");
    }

    let paragraph = Node::paragraph_with(vec![Node::Equation(node), Node::text("")]);
    edits::insert_block_after_focus(editor, paragraph, "command:equations.insert")
}
