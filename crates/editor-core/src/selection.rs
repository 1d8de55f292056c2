use serde::{Deserialize, Serialize};

use crate::core::node_at_path;
use crate::node::{Document, Node};
use crate::ops::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }

    /// Path of the block that holds this point's leaf.
    pub fn block_path(&self) -> &[usize] {
        self.path.split_last().map(|(_, p)| p).unwrap_or(&[])
    }

    pub fn child_index(&self) -> usize {
        self.path.last().copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Anchor and focus in document order.
    pub fn ordered(&self) -> (Point, Point) {
        let mut start = self.anchor.clone();
        let mut end = self.focus.clone();

        if start.path == end.path {
            if end.offset < start.offset {
                std::mem::swap(&mut start, &mut end);
            }
            return (start, end);
        }
        if end.path < start.path {
            std::mem::swap(&mut start, &mut end);
        }
        (start, end)
    }
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

pub(crate) fn is_point_in_block(point: &Point, block_path: &[usize]) -> bool {
    point.path.len() == block_path.len() + 1 && point.path.starts_with(block_path)
}

pub(crate) fn total_inline_len(children: &[Node]) -> usize {
    children.iter().map(Node::inline_len).sum()
}

pub(crate) fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    let mut global = 0usize;
    for (ix, node) in children.iter().enumerate() {
        if ix < child_ix {
            global += node.inline_len();
            continue;
        }
        if ix == child_ix {
            global += match node {
                Node::Text(t) => clamp_to_char_boundary(&t.text, offset),
                other => offset.min(other.inline_len()),
            };
        }
        break;
    }
    global
}

pub(crate) fn point_for_global_offset(
    block_path: &[usize],
    children: &[Node],
    global_offset: usize,
) -> Point {
    let at = |child_ix: usize, offset: usize| {
        let mut path = block_path.to_vec();
        path.push(child_ix);
        Point::new(path, offset)
    };

    let mut remaining = global_offset;
    for (child_ix, node) in children.iter().enumerate() {
        match node {
            Node::Text(t) => {
                if remaining < t.text.len() {
                    return at(child_ix, clamp_to_char_boundary(&t.text, remaining));
                }
                if remaining == t.text.len() {
                    if matches!(children.get(child_ix + 1), Some(Node::Text(_))) {
                        return at(child_ix + 1, 0);
                    }
                    return at(child_ix, t.text.len());
                }
                remaining -= t.text.len();
            }
            atomic => {
                let len = atomic.inline_len();
                if remaining <= len {
                    let after = len - remaining;
                    if remaining == 0 || remaining <= after {
                        for (ix, prev) in children.iter().enumerate().take(child_ix).rev() {
                            if let Node::Text(t) = prev {
                                return at(ix, t.text.len());
                            }
                        }
                    }
                    for (ix, next) in children.iter().enumerate().skip(child_ix + 1) {
                        if matches!(next, Node::Text(_)) {
                            return at(ix, 0);
                        }
                    }
                    break;
                }
                remaining -= len;
            }
        }
    }

    for (child_ix, node) in children.iter().enumerate().rev() {
        if let Node::Text(t) = node {
            return at(child_ix, t.text.len());
        }
    }
    at(0, 0)
}

pub(crate) struct TextBlock<'a> {
    pub(crate) path: Path,
    pub(crate) children: &'a [Node],
}

/// Paragraph and code blocks, in document order.
pub(crate) fn text_blocks_in_order(doc: &Document) -> Vec<TextBlock<'_>> {
    fn walk<'a>(nodes: &'a [Node], path: &mut Vec<usize>, out: &mut Vec<TextBlock<'a>>) {
        for (ix, node) in nodes.iter().enumerate() {
            let Some(children) = node.children() else {
                continue;
            };
            path.push(ix);
            if node.is_text_block() {
                out.push(TextBlock {
                    path: path.clone(),
                    children,
                });
            } else {
                walk(children, path, out);
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(doc.children(), &mut Vec::new(), &mut out);
    out
}

pub(crate) fn first_text_point(doc: &Document) -> Option<Point> {
    fn walk(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            let found = match node {
                Node::Text(_) => Some(Point::new(path.clone(), 0)),
                other => other.children().and_then(|c| walk(c, path)),
            };
            path.pop();
            if found.is_some() {
                return found;
            }
        }
        None
    }

    walk(doc.children(), &mut Vec::new())
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children().is_empty() {
        return None;
    }

    fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            let found = match node {
                Node::Text(_) => Some(Point::new(path.clone(), 0)),
                other => other
                    .children()
                    .and_then(|c| first_text_descendant(c, path)),
            };
            path.pop();
            if found.is_some() {
                return found;
            }
        }
        None
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = doc.children();

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point::new(
                    resolved_path,
                    clamp_to_char_boundary(&t.text, point.offset),
                ));
            }
            other => match other.children() {
                Some(next) => children = next,
                None => break,
            },
        }
    }

    match node_at_path(doc, &resolved_path)? {
        Node::Text(t) => Some(Point::new(
            resolved_path,
            clamp_to_char_boundary(&t.text, point.offset),
        )),
        other => {
            let children = other.children()?;
            first_text_descendant(children, &mut resolved_path)
        }
    }
}

/// Maps both ends of a selection onto existing text leaves.
pub(crate) fn normalize_selection(doc: &Document, selection: &Selection) -> Selection {
    let fallback = first_text_point(doc).unwrap_or_else(|| Point::new(vec![0], 0));

    let anchor = normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| fallback.clone())
    });
    let focus =
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

    Selection { anchor, focus }
}

/// Block-relative position of a point, used to carry the caret across
/// rewrites that keep a block's inline length.
#[derive(Debug, Clone)]
pub(crate) struct BlockOffset {
    block_path: Path,
    global: usize,
    total: usize,
}

impl BlockOffset {
    pub(crate) fn capture(doc: &Document, point: &Point) -> Option<Self> {
        let block_path = point.block_path().to_vec();
        let children = node_at_path(doc, &block_path)?.children()?;
        Some(Self {
            global: point_global_offset(children, point.child_index(), point.offset),
            total: total_inline_len(children),
            block_path,
        })
    }

    pub(crate) fn restore(&self, doc: &Document) -> Option<Point> {
        let node = node_at_path(doc, &self.block_path)?;
        if !node.is_text_block() {
            return None;
        }
        let children = node.children()?;
        if total_inline_len(children) != self.total {
            return None;
        }
        Some(point_for_global_offset(
            &self.block_path,
            children,
            self.global,
        ))
    }
}
