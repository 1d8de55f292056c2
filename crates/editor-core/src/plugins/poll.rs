use crate::bus::{Command, CommandPriority};
use crate::core::Editor;
use crate::edits;
use crate::error::CommandError;
use crate::node::{Node, NodeKind, PollNode};
use crate::ops::{Op, Transaction};
use crate::plugin::{EditorPlugin, NodeSpec};

pub const INSERT_POLL: Command<InsertPoll> = Command::new("poll.insert");
pub const ADD_POLL_OPTION: Command<AddPollOption> = Command::new("poll.add_option");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertPoll {
    pub question: String,
    pub options: Vec<String>,
}

/// Appends an option to the poll at a root-level index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPollOption {
    pub index: usize,
    pub option: String,
}

pub struct PollPlugin;

impl EditorPlugin for PollPlugin {
    fn id(&self) -> &'static str {
        "poll"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec {
            is_atomic: true,
            ..NodeSpec::block(NodeKind::Poll)
        }]
    }

    fn register(&mut self, editor: &mut Editor) -> Result<(), CommandError> {
        // Polls may be saved only with enough options; while editing they
        // can have fewer.
        editor.register_command(INSERT_POLL, CommandPriority::Editor, |editor, payload| {
            let question = payload.question.trim();
            if question.is_empty() {
                return Err(CommandError::InvalidPayload {
                    command: INSERT_POLL.id(),
                    message: "question must not be empty".into(),
                });
            }
            let poll = PollNode::new(question, payload.options.clone());
            let tx = edits::insert_block_after_focus(editor, Node::Poll(poll), "command:poll.insert")?;
            editor.apply(tx)?;
            Ok(true)
        })?;

        editor.register_command(ADD_POLL_OPTION, CommandPriority::Editor, |editor, payload| {
            let option = payload.option.trim();
            if option.is_empty() {
                return Ok(false);
            }
            let Some(Node::Poll(poll)) = editor.doc().children().get(payload.index) else {
                return Err(CommandError::rejected("No poll at the given index"));
            };
            let mut poll = poll.clone();
            poll.options.push(option.to_string());
            let tx = Transaction::new(Op::replace_node(vec![payload.index], Node::Poll(poll)).to_vec())
                .with_selection(editor.selection().clone())
                .source("command:poll.add_option");
            editor.apply(tx)?;
            Ok(true)
        })?;
        Ok(())
    }
}
