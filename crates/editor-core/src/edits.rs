//! Transaction builders shared by the built-in commands and plugins.

use std::ops::Range;

use crate::core::{Editor, node_at_path};
use crate::error::CommandError;
use crate::node::{Node, TextFormat, TextNode};
use crate::ops::{Op, Path, Transaction};
use crate::selection::{
    Point, Selection, TextBlock, clamp_to_char_boundary, is_point_in_block, point_for_global_offset,
    point_global_offset, text_blocks_in_order, total_inline_len,
};

/// The text leaf under the focus, with the caret clamped into it.
pub(crate) struct FocusText {
    pub(crate) block_path: Path,
    pub(crate) child_ix: usize,
    pub(crate) text: TextNode,
    pub(crate) cursor: usize,
}

impl FocusText {
    pub(crate) fn path(&self) -> Path {
        let mut path = self.block_path.clone();
        path.push(self.child_ix);
        path
    }
}

pub(crate) fn focus_text(editor: &Editor) -> Result<FocusText, CommandError> {
    let focus = &editor.selection().focus;
    let (child_ix, block_path) = focus
        .path
        .split_last()
        .ok_or_else(|| CommandError::rejected("Selection is not in a text node"))?;

    let Some(block) = node_at_path(editor.doc(), block_path).filter(|n| n.is_text_block()) else {
        return Err(CommandError::rejected("Selection is not in a text block"));
    };
    let Some(Node::Text(text)) = block.children().and_then(|c| c.get(*child_ix)) else {
        return Err(CommandError::rejected("Selection is not in a text node"));
    };

    Ok(FocusText {
        block_path: block_path.to_vec(),
        child_ix: *child_ix,
        cursor: clamp_to_char_boundary(&text.text, focus.offset),
        text: text.clone(),
    })
}

pub(crate) fn insert_text(editor: &Editor, text: &str) -> Result<Transaction, CommandError> {
    let sel = editor.selection().clone();
    let (start, end) = sel.ordered();

    if !sel.is_collapsed() && start.path != end.path {
        if let Some(tx) = replace_range_in_block(editor, &start, &end, text) {
            return Ok(tx.source("command:core.insert_text"));
        }
    }

    let mut ops = Vec::new();
    if !sel.is_collapsed() && start.path == end.path {
        ops.push(Op::RemoveText {
            path: start.path.clone(),
            range: start.offset..end.offset,
        });
    }

    let caret = focus_text_at(editor, &start)?;
    let offset = caret.cursor;
    ops.push(Op::InsertText {
        path: caret.path(),
        offset,
        text: text.to_string(),
    });

    Ok(Transaction::new(ops)
        .with_selection(Selection::collapsed(Point::new(
            caret.path(),
            offset + text.len(),
        )))
        .source("command:core.insert_text"))
}

/// Rebuilds the children of the block holding both ends of the range, with
/// the range replaced by `text`. Atomic nodes fully inside the range are
/// dropped. `None` when the ends sit in different blocks.
fn replace_range_in_block(
    editor: &Editor,
    start: &Point,
    end: &Point,
    text: &str,
) -> Option<Transaction> {
    let (start_ix, block_path) = start.path.split_last()?;
    if !is_point_in_block(end, block_path) {
        return None;
    }
    let block = node_at_path(editor.doc(), block_path).filter(|n| n.is_text_block())?;
    let children = block.children()?;
    let end_ix = end.path.last().copied()?;

    let a = point_global_offset(children, *start_ix, start.offset);
    let b = point_global_offset(children, end_ix, end.offset);
    let (from, to) = (a.min(b), a.max(b));

    let mut out: Vec<Node> = Vec::with_capacity(children.len() + 1);
    let mut caret: Option<(usize, usize)> = None;
    let mut node_start = 0usize;
    for node in children {
        let len = node.inline_len();
        let node_end = node_start + len;
        match node {
            Node::Text(leaf) => {
                let lo = clamp_to_char_boundary(&leaf.text, from.saturating_sub(node_start));
                let hi = clamp_to_char_boundary(&leaf.text, to.saturating_sub(node_start));
                if caret.is_none() && node_start <= from && from <= node_end {
                    let mut kept = leaf.text[..lo].to_string();
                    kept.push_str(text);
                    kept.push_str(&leaf.text[hi..]);
                    caret = Some((out.len(), lo + text.len()));
                    out.push(Node::Text(leaf.sibling(kept)));
                } else if hi > lo {
                    let kept = format!("{}{}", &leaf.text[..lo], &leaf.text[hi..]);
                    if !kept.is_empty() {
                        out.push(Node::Text(leaf.sibling(kept)));
                    }
                } else {
                    out.push(node.clone());
                }
            }
            _ if len > 0 && node_start >= from && node_end <= to => {}
            _ => {
                if caret.is_none() && node_start >= from {
                    caret = Some((out.len(), text.len()));
                    out.push(Node::text(text));
                }
                out.push(node.clone());
            }
        }
        node_start = node_end;
    }
    let (caret_ix, caret_offset) = match caret {
        Some(caret) => caret,
        None => {
            out.push(Node::text(text));
            (out.len() - 1, text.len())
        }
    };

    let child_path = |ix: usize| {
        let mut path = block_path.to_vec();
        path.push(ix);
        path
    };
    let mut ops: Vec<Op> = (0..children.len())
        .rev()
        .map(|ix| Op::RemoveNode {
            path: child_path(ix),
        })
        .collect();
    ops.extend(out.into_iter().enumerate().map(|(ix, node)| Op::InsertNode {
        path: child_path(ix),
        node,
    }));

    Some(
        Transaction::new(ops)
            .with_selection(Selection::collapsed(Point::new(child_path(caret_ix), caret_offset))),
    )
}

fn focus_text_at(editor: &Editor, point: &Point) -> Result<FocusText, CommandError> {
    let (child_ix, block_path) = point
        .path
        .split_last()
        .ok_or_else(|| CommandError::rejected("Selection is not in a text node"))?;
    match node_at_path(editor.doc(), &point.path) {
        Some(Node::Text(text)) => Ok(FocusText {
            block_path: block_path.to_vec(),
            child_ix: *child_ix,
            cursor: clamp_to_char_boundary(&text.text, point.offset),
            text: text.clone(),
        }),
        _ => Err(CommandError::rejected("Selection is not in a text node")),
    }
}

/// Splits the focused paragraph at the caret. Inside a code block a line
/// break is inserted instead.
pub(crate) fn split_block(editor: &Editor) -> Result<Transaction, CommandError> {
    let caret = focus_text(editor)?;
    let Some(block) = node_at_path(editor.doc(), &caret.block_path) else {
        return Err(CommandError::rejected("Selection is not in a text block"));
    };
    if matches!(block, Node::Code(_)) {
        return Ok(Transaction::new(vec![Op::InsertText {
            path: caret.path(),
            offset: caret.cursor,
            text: "\n".into(),
        }])
        .with_selection(Selection::collapsed(Point::new(
            caret.path(),
            caret.cursor + 1,
        )))
        .source("command:core.insert_paragraph"));
    }

    let children = block.children().unwrap_or(&[]);
    let (block_ix, parent_path) = caret
        .block_path
        .split_last()
        .ok_or_else(|| CommandError::rejected("Selection is not in a text block"))?;

    let right = caret.text.text.get(caret.cursor..).unwrap_or("").to_string();
    let mut moved: Vec<Node> = vec![Node::Text(caret.text.sibling(right.clone()))];
    moved.extend(children.iter().skip(caret.child_ix + 1).cloned());

    let mut ops = Vec::new();
    if !right.is_empty() {
        ops.push(Op::RemoveText {
            path: caret.path(),
            range: caret.cursor..caret.text.text.len(),
        });
    }
    for ix in (caret.child_ix + 1..children.len()).rev() {
        let mut path = caret.block_path.clone();
        path.push(ix);
        ops.push(Op::RemoveNode { path });
    }

    let mut next_block = parent_path.to_vec();
    next_block.push(block_ix + 1);
    ops.push(Op::InsertNode {
        path: next_block.clone(),
        node: Node::paragraph_with(moved),
    });

    next_block.push(0);
    Ok(Transaction::new(ops)
        .with_selection(Selection::collapsed(Point::new(next_block, 0)))
        .source("command:core.insert_paragraph"))
}

/// Replaces `range` of the text leaf at `path` with an inline node. The
/// caret lands at the start of the trailing text leaf.
pub(crate) fn replace_text_with_inline(
    editor: &Editor,
    path: &[usize],
    range: Range<usize>,
    node: Node,
    source: &str,
) -> Result<Transaction, CommandError> {
    let Some(Node::Text(text)) = node_at_path(editor.doc(), path) else {
        return Err(CommandError::rejected("Target is not a text node"));
    };
    let (child_ix, block_path) = path
        .split_last()
        .ok_or_else(|| CommandError::rejected("Target is not a text node"))?;

    let start = clamp_to_char_boundary(&text.text, range.start);
    let end = clamp_to_char_boundary(&text.text, range.end.max(start));
    let left = text.text.get(..start).unwrap_or("").to_string();
    let right = text.text.get(end..).unwrap_or("").to_string();

    let mut replacement: Vec<Node> = Vec::new();
    let mut inline_ix = *child_ix;
    if !left.is_empty() {
        replacement.push(Node::Text(text.sibling(left)));
        inline_ix += 1;
    }
    replacement.push(node);
    replacement.push(Node::Text(text.sibling(right)));

    let mut ops: Vec<Op> = vec![Op::RemoveNode {
        path: path.to_vec(),
    }];
    for (i, node) in replacement.into_iter().enumerate() {
        let mut path = block_path.to_vec();
        path.push(child_ix + i);
        ops.push(Op::InsertNode { path, node });
    }

    let mut selection_path = block_path.to_vec();
    selection_path.push(inline_ix + 1);
    Ok(Transaction::new(ops)
        .with_selection(Selection::collapsed(Point::new(selection_path, 0)))
        .source(source))
}

pub(crate) fn insert_inline_at_caret(
    editor: &Editor,
    node: Node,
    source: &str,
) -> Result<Transaction, CommandError> {
    if !editor.selection().is_collapsed() {
        return Err(CommandError::rejected("Selection must be collapsed"));
    }
    let caret = focus_text(editor)?;
    replace_text_with_inline(editor, &caret.path(), caret.cursor..caret.cursor, node, source)
}

/// Inserts a block after the root-level block holding the focus, or at the
/// end of the document when there is no focus. The caret moves into the new
/// block when it holds text, otherwise into a paragraph following it.
pub(crate) fn insert_block_after_focus(
    editor: &Editor,
    block: Node,
    source: &str,
) -> Result<Transaction, CommandError> {
    let doc = editor.doc();
    let insert_at = editor
        .selection()
        .focus
        .path
        .first()
        .map(|ix| ix + 1)
        .unwrap_or(doc.children().len())
        .min(doc.children().len());

    let caret_child = block.children().and_then(|children| {
        children
            .iter()
            .rposition(|child| matches!(child, Node::Text(_)))
    });

    let mut ops = vec![Op::InsertNode {
        path: vec![insert_at],
        node: block,
    }];

    let caret = match caret_child {
        Some(child_ix) => Point::new(vec![insert_at, child_ix], 0),
        None => {
            let next_is_text_block = doc
                .children()
                .get(insert_at)
                .is_some_and(Node::is_text_block);
            if !next_is_text_block {
                ops.push(Op::InsertNode {
                    path: vec![insert_at + 1],
                    node: Node::paragraph(""),
                });
            }
            Point::new(vec![insert_at + 1, 0], 0)
        }
    };

    Ok(Transaction::new(ops)
        .with_selection(Selection::collapsed(caret))
        .source(source))
}

/// Sets or clears format bits. Subscript and superscript exclude each other.
pub(crate) fn toggle_format(text: &mut TextNode, format: TextFormat, enable: bool) {
    if !enable {
        text.format.remove(format);
        return;
    }
    if format.contains(TextFormat::SUBSCRIPT) {
        text.format.remove(TextFormat::SUPERSCRIPT);
    }
    if format.contains(TextFormat::SUPERSCRIPT) {
        text.format.remove(TextFormat::SUBSCRIPT);
    }
    text.format.insert(format);
}

struct SelectedBlock<'a> {
    block: TextBlock<'a>,
    start_global: usize,
    end_global: usize,
}

fn selected_blocks<'a>(
    editor: &'a Editor,
    sel: &Selection,
) -> Result<Vec<SelectedBlock<'a>>, CommandError> {
    let (start, end) = sel.ordered();
    let blocks = text_blocks_in_order(editor.doc());

    let position = |point: &Point| {
        blocks
            .iter()
            .position(|b| b.path == point.block_path())
            .ok_or_else(|| CommandError::rejected("Selection is not in a text block"))
    };
    let start_index = position(&start)?;
    let end_index = position(&end)?;
    let (start_index, end_index, start, end) = if start_index <= end_index {
        (start_index, end_index, start, end)
    } else {
        (end_index, start_index, end, start)
    };

    let mut out = Vec::new();
    for (block_index, block) in blocks.into_iter().enumerate() {
        if block_index < start_index || block_index > end_index {
            continue;
        }
        let total = total_inline_len(block.children);
        let start_global = if block_index == start_index {
            point_global_offset(block.children, start.child_index(), start.offset)
        } else {
            0
        };
        let end_global = if block_index == end_index {
            point_global_offset(block.children, end.child_index(), end.offset)
        } else {
            total
        };
        if start_global < end_global {
            out.push(SelectedBlock {
                block,
                start_global,
                end_global,
            });
        }
    }
    Ok(out)
}

/// Whether every text leaf touched by the selection satisfies `pred`. A
/// collapsed selection checks the leaf under the caret.
pub(crate) fn all_selected_text(
    editor: &Editor,
    pred: &dyn Fn(&TextNode) -> bool,
) -> Result<bool, CommandError> {
    let sel = editor.selection().clone();
    if sel.is_collapsed() {
        return Ok(pred(&focus_text(editor)?.text));
    }

    let mut any = false;
    for selected in selected_blocks(editor, &sel)? {
        let mut cursor = 0usize;
        for node in selected.block.children {
            let node_start = cursor;
            cursor += node.inline_len();
            let Node::Text(t) = node else {
                continue;
            };
            if selected.end_global <= node_start || selected.start_global >= cursor {
                continue;
            }
            any = true;
            if !pred(t) {
                return Ok(false);
            }
        }
    }
    Ok(any)
}

/// Rewrites the selected text with `apply`, splitting leaves at the
/// selection edges. A collapsed selection inserts an empty leaf at the caret
/// carrying the new formatting.
pub(crate) fn map_selected_text(
    editor: &Editor,
    apply: &dyn Fn(&mut TextNode),
    source: &str,
) -> Result<Transaction, CommandError> {
    let sel = editor.selection().clone();
    if sel.is_collapsed() {
        return map_text_at_caret(editor, apply, source);
    }

    let mut ops: Vec<Op> = Vec::new();
    let mut new_anchor = sel.anchor.clone();
    let mut new_focus = sel.focus.clone();

    for selected in selected_blocks(editor, &sel)? {
        let block = &selected.block;
        let children = block.children;
        let new_children =
            map_text_in_block(children, selected.start_global, selected.end_global, apply);
        if new_children == children {
            continue;
        }

        for child_ix in (0..children.len()).rev() {
            let mut remove_path = block.path.clone();
            remove_path.push(child_ix);
            ops.push(Op::RemoveNode { path: remove_path });
        }
        for (child_ix, node) in new_children.iter().cloned().enumerate() {
            let mut insert_path = block.path.clone();
            insert_path.push(child_ix);
            ops.push(Op::InsertNode {
                path: insert_path,
                node,
            });
        }

        for point in [&mut new_anchor, &mut new_focus] {
            if is_point_in_block(point, &block.path) {
                let global = point_global_offset(children, point.child_index(), point.offset);
                *point = point_for_global_offset(&block.path, &new_children, global);
            }
        }
    }

    Ok(Transaction::new(ops)
        .with_selection(Selection::new(new_anchor, new_focus))
        .source(source))
}

fn map_text_at_caret(
    editor: &Editor,
    apply: &dyn Fn(&mut TextNode),
    source: &str,
) -> Result<Transaction, CommandError> {
    let caret = focus_text(editor)?;
    let mut mapped = caret.text.clone();
    apply(&mut mapped);

    if caret.text.text.is_empty() {
        let path = caret.path();
        let mut ops = Vec::new();
        if mapped.format != caret.text.format {
            ops.push(Op::SetTextFormat {
                path: path.clone(),
                format: mapped.format,
            });
        }
        if mapped.style != caret.text.style {
            ops.push(Op::SetTextStyle {
                path: path.clone(),
                style: mapped.style,
            });
        }
        return Ok(Transaction::new(ops)
            .with_selection(Selection::collapsed(Point::new(path, 0)))
            .source(source));
    }
    if mapped.same_formatting(&caret.text) {
        return Ok(Transaction::default().source(source));
    }

    let left = caret.text.text.get(..caret.cursor).unwrap_or("").to_string();
    let right = caret.text.text.get(caret.cursor..).unwrap_or("").to_string();

    let mut replacement: Vec<Node> = Vec::new();
    let mut caret_child_ix = caret.child_ix;
    if !left.is_empty() {
        replacement.push(Node::Text(caret.text.sibling(left)));
        caret_child_ix += 1;
    }
    replacement.push(Node::Text(mapped.sibling("")));
    if !right.is_empty() {
        replacement.push(Node::Text(caret.text.sibling(right)));
    }

    let mut ops: Vec<Op> = vec![Op::RemoveNode { path: caret.path() }];
    for (i, node) in replacement.into_iter().enumerate() {
        let mut path = caret.block_path.clone();
        path.push(caret.child_ix + i);
        ops.push(Op::InsertNode { path, node });
    }

    let mut caret_path = caret.block_path.clone();
    caret_path.push(caret_child_ix);
    Ok(Transaction::new(ops)
        .with_selection(Selection::collapsed(Point::new(caret_path, 0)))
        .source(source))
}

fn map_text_in_block(
    children: &[Node],
    start_global: usize,
    end_global: usize,
    apply: &dyn Fn(&mut TextNode),
) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let node_start = cursor;
        cursor += node.inline_len();
        let node_end = cursor;

        let Node::Text(t) = node else {
            out.push(node.clone());
            continue;
        };
        if end_global <= node_start || start_global >= node_end {
            out.push(node.clone());
            continue;
        }

        let sel_start = clamp_to_char_boundary(&t.text, start_global.saturating_sub(node_start));
        let sel_end = clamp_to_char_boundary(&t.text, end_global.saturating_sub(node_start));

        let mut middle = t.sibling(t.text.get(sel_start..sel_end).unwrap_or(""));
        apply(&mut middle);

        let prefix = t.text.get(..sel_start).unwrap_or("");
        let suffix = t.text.get(sel_end..).unwrap_or("");
        if !prefix.is_empty() {
            out.push(Node::Text(t.sibling(prefix)));
        }
        if !middle.text.is_empty() {
            out.push(Node::Text(middle));
        }
        if !suffix.is_empty() {
            out.push(Node::Text(t.sibling(suffix)));
        }
    }

    if !out.iter().any(|n| matches!(n, Node::Text(_))) {
        out.push(Node::text(""));
    }
    out
}
