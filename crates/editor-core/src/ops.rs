use std::ops::Range;

use crate::node::{Node, TextFormat};
use crate::selection::Selection;

/// Child indices from the root down to a node.
pub type Path = Vec<usize>;

/// A single document mutation. Applying an op yields the op that undoes it.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    InsertText { path: Path, offset: usize, text: String },
    RemoveText { path: Path, range: Range<usize> },
    InsertNode { path: Path, node: Node },
    /// Drops the node and its whole subtree.
    RemoveNode { path: Path },
    SetTextFormat { path: Path, format: TextFormat },
    SetTextStyle { path: Path, style: String },
}

impl Op {
    pub fn replace_node(path: Path, node: Node) -> [Op; 2] {
        [
            Op::RemoveNode { path: path.clone() },
            Op::InsertNode { path, node },
        ]
    }
}

/// Ops applied together, followed by one normalize run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    pub ops: Vec<Op>,
    /// Where the caret goes once the ops are applied. `None` keeps the
    /// selection as the ops moved it.
    pub selection: Option<Selection>,
    /// Who issued the transaction, reported in the update event.
    pub source: Option<String>,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            ..Self::default()
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
