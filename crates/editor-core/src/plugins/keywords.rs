//! Automatic keyword highlighting.
//!
//! Whole words from a fixed list are turned into keyword nodes as soon as
//! they appear in paragraph text. A keyword that gets glued to adjacent text
//! (typing straight after it) turns back into plain text.

use std::collections::HashSet;

use crate::config::KeywordsConfig;
use crate::core::node_at_path;
use crate::node::{Document, KeywordNode, Node, NodeKind, TextMode, TextNode};
use crate::ops::Op;
use crate::plugin::{EditorPlugin, NodeSpec, NormalizePass, PluginRegistry};
use crate::selection::text_blocks_in_order;

pub struct KeywordsPlugin {
    words: HashSet<String>,
}

impl KeywordsPlugin {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &KeywordsConfig) -> Self {
        Self::new(&config.words)
    }
}

impl Default for KeywordsPlugin {
    fn default() -> Self {
        Self::from_config(&KeywordsConfig::default())
    }
}

impl EditorPlugin for KeywordsPlugin {
    fn id(&self) -> &'static str {
        "keywords"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::inline_atomic(NodeKind::Keyword)]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(UnwrapGluedKeywords),
            Box::new(ConvertKeywords {
                words: self.words.clone(),
            }),
        ]
    }
}

/// Byte ranges of whole-word matches in `text`.
pub(crate) fn keyword_ranges(text: &str, words: &HashSet<String>) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (ix, c) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                if words.contains(&text[s..ix].to_lowercase()) {
                    out.push((s, ix));
                }
                start = None;
            }
            (false, None) => start = Some(ix),
            _ => {}
        }
    }
    out
}

fn ends_with_word_char(node: &Node) -> bool {
    matches!(node, Node::Text(t) if t.text.chars().next_back().is_some_and(|c| !c.is_whitespace()))
}

fn starts_with_word_char(node: &Node) -> bool {
    matches!(node, Node::Text(t) if t.text.chars().next().is_some_and(|c| !c.is_whitespace()))
}

struct ConvertKeywords {
    words: HashSet<String>,
}

impl NormalizePass for ConvertKeywords {
    fn id(&self) -> &'static str {
        "keywords.convert"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if self.words.is_empty() {
            return Vec::new();
        }

        let mut ops = Vec::new();
        for block in text_blocks_in_order(doc) {
            let Some(Node::Paragraph(_)) = node_at_path(doc, &block.path) else {
                continue;
            };

            // Later children first so earlier paths stay valid.
            for (ix, node) in block.children.iter().enumerate().rev() {
                let Node::Text(text) = node else {
                    continue;
                };
                if text.mode != TextMode::Normal {
                    continue;
                }
                let glued_left = ix
                    .checked_sub(1)
                    .and_then(|prev| block.children.get(prev))
                    .is_some_and(ends_with_word_char);
                let glued_right = block
                    .children
                    .get(ix + 1)
                    .is_some_and(starts_with_word_char);
                let ranges: Vec<(usize, usize)> = keyword_ranges(&text.text, &self.words)
                    .into_iter()
                    .filter(|&(start, end)| {
                        !(glued_left && start == 0) && !(glued_right && end == text.text.len())
                    })
                    .collect();
                if ranges.is_empty() {
                    continue;
                }

                let pieces = split_keywords(text, &ranges);
                let mut path = block.path.clone();
                path.push(ix);
                ops.push(Op::RemoveNode { path: path.clone() });
                for (offset, piece) in pieces.into_iter().enumerate() {
                    let mut piece_path = block.path.clone();
                    piece_path.push(ix + offset);
                    ops.push(Op::InsertNode {
                        path: piece_path,
                        node: piece,
                    });
                }
            }
        }
        ops
    }
}

fn split_keywords(text: &TextNode, ranges: &[(usize, usize)]) -> Vec<Node> {
    let mut pieces = Vec::new();
    let mut cursor = 0usize;
    for &(start, end) in ranges {
        if start > cursor {
            pieces.push(Node::Text(text.sibling(&text.text[cursor..start])));
        }
        match KeywordNode::new(&text.text[start..end]) {
            Ok(mut keyword) => {
                keyword.format = text.format;
                keyword.style = text.style.clone();
                pieces.push(Node::Keyword(keyword));
            }
            Err(_) => pieces.push(Node::Text(text.sibling(&text.text[start..end]))),
        }
        cursor = end;
    }
    // Always leave a text leaf after the last keyword for the caret.
    pieces.push(Node::Text(text.sibling(&text.text[cursor..])));
    pieces
}

struct UnwrapGluedKeywords;

impl NormalizePass for UnwrapGluedKeywords {
    fn id(&self) -> &'static str {
        "keywords.unwrap_glued"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for block in text_blocks_in_order(doc) {
            let children = block.children;
            for (ix, node) in children.iter().enumerate() {
                let Node::Keyword(keyword) = node else {
                    continue;
                };
                let glued_before = ix
                    .checked_sub(1)
                    .and_then(|prev| children.get(prev))
                    .is_some_and(ends_with_word_char);
                let glued_after = children.get(ix + 1).is_some_and(starts_with_word_char);
                if !glued_before && !glued_after {
                    continue;
                }

                let text = TextNode::new(keyword.text.clone())
                    .with_format(keyword.format)
                    .with_style(keyword.style.clone());
                let mut path = block.path.clone();
                path.push(ix);
                ops.extend(Op::replace_node(path, Node::Text(text)));
            }
        }
        ops
    }
}
