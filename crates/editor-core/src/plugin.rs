use std::collections::{HashMap, HashSet};

use crate::bus::CommandPriority;
use crate::commands::{FORMAT_TEXT, INSERT_PARAGRAPH, INSERT_TEXT, PATCH_STYLE, REDO, UNDO};
use crate::core::Editor;
use crate::edits;
use crate::error::{CommandError, PluginError};
use crate::node::{Document, Node, NodeKind, NodeRole, TextNode};
use crate::ops::Op;
use crate::selection::text_blocks_in_order;
use crate::toolbar::ToolbarControl;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub role: NodeRole,
    /// Atomic nodes are never entered by the caret.
    pub is_atomic: bool,
}

impl NodeSpec {
    pub fn block(kind: NodeKind) -> Self {
        Self {
            kind,
            role: NodeRole::Block,
            is_atomic: false,
        }
    }

    pub fn inline_atomic(kind: NodeKind) -> Self {
        Self {
            kind,
            role: NodeRole::Inline,
            is_atomic: true,
        }
    }
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

/// A unit of editor behavior. Every capability is optional.
pub trait EditorPlugin {
    fn id(&self) -> &'static str;

    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }

    fn toolbar_controls(&self) -> Vec<ToolbarControl> {
        Vec::new()
    }

    /// Registers command handlers and per-editor state. Runs once per editor.
    fn register(&mut self, _editor: &mut Editor) -> Result<(), CommandError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<&'static str>,
    plugin_ids: HashSet<&'static str>,
    node_specs: HashMap<NodeKind, NodeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
}

impl PluginRegistry {
    pub fn plugins(&self) -> &[&'static str] {
        &self.plugins
    }

    pub fn contains_plugin(&self, id: &str) -> bool {
        self.plugin_ids.contains(id)
    }

    pub fn node_specs(&self) -> &HashMap<NodeKind, NodeSpec> {
        &self.node_specs
    }

    pub fn node_spec(&self, kind: NodeKind) -> Option<&NodeSpec> {
        self.node_specs.get(&kind)
    }

    pub fn is_known_kind(&self, kind: NodeKind) -> bool {
        self.node_specs.contains_key(&kind)
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    /// Ops of the first pass that has work to do. The editor re-runs the
    /// passes until none of them produce ops.
    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        for pass in &self.normalize_passes {
            let ops = pass.run(doc, self);
            if !ops.is_empty() {
                tracing::trace!(pass = pass.id(), ops = ops.len(), "normalize");
                return ops;
            }
        }
        Vec::new()
    }

    pub(crate) fn add_node_specs(
        &mut self,
        plugin: &'static str,
        specs: Vec<NodeSpec>,
    ) -> Result<(), PluginError> {
        if let Some(spec) = specs
            .iter()
            .find(|spec| self.node_specs.contains_key(&spec.kind))
        {
            return Err(PluginError::DuplicateNodeKind {
                plugin,
                kind: spec.kind,
            });
        }
        for spec in specs {
            self.node_specs.insert(spec.kind, spec);
        }
        Ok(())
    }

    pub(crate) fn add_normalize_passes(&mut self, passes: Vec<Box<dyn NormalizePass>>) {
        self.normalize_passes.extend(passes);
    }

    pub(crate) fn mark_plugin(&mut self, id: &'static str) {
        if self.plugin_ids.insert(id) {
            self.plugins.push(id);
        }
    }
}

/// Text and paragraphs, the structural invariants, and the commands every
/// editor needs. Installed first by [`Editor::new`].
pub(crate) struct CorePlugin;

impl EditorPlugin for CorePlugin {
    fn id(&self) -> &'static str {
        "core"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec {
                kind: NodeKind::Text,
                role: NodeRole::Inline,
                is_atomic: false,
            },
            NodeSpec::block(NodeKind::Paragraph),
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(WrapInlineRootChildren),
            Box::new(EnsureTextBlockHasTextLeaf),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }

    fn register(&mut self, editor: &mut Editor) -> Result<(), CommandError> {
        editor.register_command(INSERT_TEXT, CommandPriority::Editor, |editor, text| {
            if text.is_empty() {
                return Ok(false);
            }
            let tx = edits::insert_text(editor, text)?;
            editor.apply(tx)?;
            Ok(true)
        })?;

        editor.register_command(INSERT_PARAGRAPH, CommandPriority::Editor, |editor, _| {
            let tx = edits::split_block(editor)?;
            editor.apply(tx)?;
            Ok(true)
        })?;

        editor.register_command(UNDO, CommandPriority::Editor, |editor, _| Ok(editor.undo()))?;
        editor.register_command(REDO, CommandPriority::Editor, |editor, _| Ok(editor.redo()))?;

        editor.register_command(FORMAT_TEXT, CommandPriority::Editor, |editor, format| {
            if format.is_empty() {
                return Ok(false);
            }
            let format = *format;
            let enable = !edits::all_selected_text(editor, &|t: &TextNode| t.format.contains(format))?;
            let tx = edits::map_selected_text(
                editor,
                &|text: &mut TextNode| edits::toggle_format(text, format, enable),
                "command:core.format_text",
            )?;
            editor.apply(tx)?;
            Ok(true)
        })?;

        editor.register_command(PATCH_STYLE, CommandPriority::Editor, |editor, patch| {
            if patch.is_empty() {
                return Ok(false);
            }
            let tx = edits::map_selected_text(
                editor,
                &|text: &mut TextNode| text.style = patch.apply(&text.style),
                "command:core.patch_style",
            )?;
            editor.apply(tx)?;
            Ok(true)
        })?;

        Ok(())
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.children().is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

/// Root children must be blocks; stray inline nodes get their own paragraph.
struct WrapInlineRootChildren;

impl NormalizePass for WrapInlineRootChildren {
    fn id(&self) -> &'static str {
        "core.wrap_inline_root_children"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        doc.children()
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.is_block())
            .flat_map(|(ix, node)| Op::replace_node(vec![ix], Node::paragraph_with(vec![node.clone()])))
            .collect()
    }
}

struct EnsureTextBlockHasTextLeaf;

impl NormalizePass for EnsureTextBlockHasTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_text_block_has_text_leaf"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for block in text_blocks_in_order(doc) {
            let has_text = block.children.iter().any(|n| matches!(n, Node::Text(_)));
            if has_text {
                continue;
            }
            // Keep the caret reachable after a trailing atomic node.
            let mut path = block.path.clone();
            path.push(block.children.len());
            ops.push(Op::InsertNode {
                path,
                node: Node::text(""),
            });
        }
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();

        for block in text_blocks_in_order(doc) {
            let children = block.children;
            if children.len() < 2 {
                continue;
            }

            let mut ix = children.len();
            while ix > 0 {
                ix -= 1;
                let Node::Text(right) = &children[ix] else {
                    continue;
                };

                let mut start = ix;
                while start > 0 {
                    let Some(Node::Text(left)) = children.get(start - 1) else {
                        break;
                    };
                    if !left.same_formatting(right) {
                        break;
                    }
                    start -= 1;
                }

                if start == ix {
                    continue;
                }

                let Some(Node::Text(first)) = children.get(start) else {
                    continue;
                };
                let appended: String = children[start + 1..=ix]
                    .iter()
                    .filter_map(|node| match node {
                        Node::Text(t) => Some(t.text.as_str()),
                        _ => None,
                    })
                    .collect();

                if !appended.is_empty() {
                    let mut insert_text_path = block.path.clone();
                    insert_text_path.push(start);
                    ops.push(Op::InsertText {
                        path: insert_text_path,
                        offset: first.text.len(),
                        text: appended,
                    });
                }

                for remove_ix in (start + 1..=ix).rev() {
                    let mut remove_path = block.path.clone();
                    remove_path.push(remove_ix);
                    ops.push(Op::RemoveNode { path: remove_path });
                }

                ix = start;
            }
        }

        ops
    }
}
