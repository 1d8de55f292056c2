use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use crate::bus::{Command, CommandBus, CommandPriority, HandlerId};
use crate::config::EditorConfig;
use crate::error::{ApplyError, CommandError, DocumentError, EditorError, PathError, PluginError};
use crate::node::{Document, Node};
use crate::ops::{Op, Transaction};
use crate::plugin::{CorePlugin, EditorPlugin, PluginRegistry};
use crate::selection::{
    BlockOffset, Point, Selection, clamp_to_char_boundary, first_text_point, normalize_selection,
};
use crate::toolbar::{ToolbarContext, ToolbarState};

#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Selection,
    pub selection_after: Selection,
}

/// Fired once when the outermost update closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateEvent {
    pub content_changed: bool,
    pub selection_changed: bool,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type UpdateListener = Rc<dyn Fn(&Editor, &UpdateEvent)>;

struct PendingUpdate {
    inverse_ops: Vec<Op>,
    selection_before: Selection,
    event: UpdateEvent,
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    registry: PluginRegistry,
    bus: CommandBus,
    toolbar: ToolbarContext,
    config: EditorConfig,
    extensions: HashMap<TypeId, Box<dyn Any>>,
    listeners: Vec<(ListenerId, UpdateListener)>,
    next_listener: u64,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    update_depth: usize,
    pending: Option<PendingUpdate>,
}

impl Editor {
    /// Builds an editor over `doc`, installing the core plugin followed by
    /// `plugins` in order. Nodes whose kind no installed plugin provides are
    /// dropped with a warning.
    pub fn new(
        doc: Document,
        config: EditorConfig,
        plugins: impl IntoIterator<Item = Box<dyn EditorPlugin>>,
    ) -> Result<Self, PluginError> {
        let mut editor = Self {
            doc,
            selection: Selection::collapsed(Point::new(vec![0, 0], 0)),
            registry: PluginRegistry::default(),
            bus: CommandBus::new(),
            toolbar: ToolbarContext::default(),
            config,
            extensions: HashMap::new(),
            listeners: Vec::new(),
            next_listener: 0,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            update_depth: 0,
            pending: None,
        };

        editor.register_plugin(Box::new(CorePlugin))?;
        for plugin in plugins {
            editor.register_plugin(plugin)?;
        }

        let registry = &editor.registry;
        let dropped = editor.doc.retain_kinds(|kind| registry.is_known_kind(kind));
        if dropped > 0 {
            tracing::warn!(dropped, "document contained nodes without a registered plugin");
        }

        if let Some(point) = first_text_point(&editor.doc) {
            editor.selection = Selection::collapsed(point);
        }
        editor.normalize_in_place();
        let state = ToolbarState::derive(&editor);
        editor.toolbar.refresh(state);
        Ok(editor)
    }

    pub fn with_plugins(
        plugins: impl IntoIterator<Item = Box<dyn EditorPlugin>>,
    ) -> Result<Self, PluginError> {
        Self::new(Document::default(), EditorConfig::default(), plugins)
    }

    pub fn from_json(
        json: &str,
        config: EditorConfig,
        plugins: impl IntoIterator<Item = Box<dyn EditorPlugin>>,
    ) -> Result<Self, EditorError> {
        let doc = Document::from_json(json)?;
        Ok(Self::new(doc, config, plugins)?)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        self.doc.to_json()
    }

    pub fn to_html(&self) -> String {
        crate::html::export(&self.doc)
    }

    /// Installs a plugin. Returns `Ok(false)` when a plugin with the same id
    /// is already installed, leaving the editor untouched.
    pub fn register_plugin(&mut self, mut plugin: Box<dyn EditorPlugin>) -> Result<bool, PluginError> {
        let id = plugin.id();
        if self.registry.contains_plugin(id) {
            tracing::debug!(plugin = id, "plugin already registered");
            return Ok(false);
        }

        self.registry.add_node_specs(id, plugin.node_specs())?;
        self.registry.add_normalize_passes(plugin.normalize_passes());
        self.toolbar.add_controls(plugin.toolbar_controls());
        plugin
            .register(self)
            .map_err(|source| PluginError::Register { plugin: id, source })?;
        self.registry.mark_plugin(id);

        tracing::debug!(plugin = id, "registered plugin");
        Ok(true)
    }

    pub fn register_command<P: 'static>(
        &mut self,
        command: Command<P>,
        priority: CommandPriority,
        handler: impl Fn(&mut Editor, &P) -> Result<bool, CommandError> + 'static,
    ) -> Result<HandlerId, CommandError> {
        self.bus.register(command, priority, handler)
    }

    pub fn unregister_command(&mut self, handler: HandlerId) -> bool {
        self.bus.unregister(handler)
    }

    /// Runs the handlers of `command` inside one update. Handler errors are
    /// returned as-is and stop the dispatch.
    pub fn dispatch<P: 'static>(
        &mut self,
        command: Command<P>,
        payload: P,
    ) -> Result<bool, CommandError> {
        let handlers = self.bus.snapshot(command)?;
        if handlers.is_empty() {
            tracing::trace!(command = command.id(), "no handlers");
            return Ok(false);
        }

        tracing::trace!(command = command.id(), handlers = handlers.len(), "dispatch");
        let payload: &dyn Any = &payload;
        self.update(|editor| {
            for handler in &handlers {
                if handler(&mut *editor, payload)? {
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }

    /// Groups every change made by `f` into one undo step and one
    /// notification. Nested calls join the outermost update.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_update();
        let out = f(self);
        self.end_update();
        out
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.update(|editor| {
            let selection = normalize_selection(&editor.doc, &selection);
            if selection != editor.selection {
                editor.selection = selection;
                editor.pending_mut().event.selection_changed = true;
            }
        });
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    pub fn toolbar(&self) -> &ToolbarContext {
        &self.toolbar
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn insert_extension<T: 'static>(&mut self, value: T) -> Option<T> {
        self.extensions
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|prev| prev.downcast::<T>().ok())
            .map(|prev| *prev)
    }

    pub fn extension<T: 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn extension_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
    }

    pub fn on_update(&mut self, listener: impl Fn(&Editor, &UpdateEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn remove_update_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };

        self.update(|editor| {
            let UndoRecord {
                inverse_ops,
                selection_before,
                selection_after,
            } = record;

            let redo_ops = editor.replay(inverse_ops);
            editor.selection = selection_before.clone();
            editor.normalize_in_place();
            editor.mark_history_step();

            editor.redo_stack.push(UndoRecord {
                selection_before,
                selection_after,
                inverse_ops: redo_ops,
            });
        });
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };

        self.update(|editor| {
            let UndoRecord {
                inverse_ops,
                selection_before,
                selection_after,
            } = record;

            let undo_ops = editor.replay(inverse_ops);
            editor.selection = selection_after.clone();
            editor.normalize_in_place();
            editor.mark_history_step();

            editor.undo_stack.push(UndoRecord {
                selection_before,
                selection_after,
                inverse_ops: undo_ops,
            });
        });
        true
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        self.update(|editor| editor.apply_in_update(tx))
    }

    fn apply_in_update(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let selection_before = self.selection.clone();

        let mut inverse_ops: Vec<Op> = Vec::new();
        let mut applied = Ok(());
        for op in tx.ops {
            match self.apply_op(op) {
                Ok(inv) => inverse_ops.push(inv),
                Err(err) => {
                    applied = Err(err);
                    break;
                }
            }
        }
        if applied.is_ok() {
            if let Some(sel) = tx.selection {
                self.selection = sel;
            }
            applied = self.normalize_into(&mut inverse_ops);
        }
        if let Err(err) = applied {
            inverse_ops.reverse();
            self.replay(inverse_ops);
            self.selection = selection_before;
            tracing::debug!(error = %err, "rolled back transaction");
            return Err(err);
        }
        self.normalize_selection_in_place();

        let selection_changed = self.selection != selection_before;
        let pending = self.pending_mut();
        pending.event.content_changed |= !inverse_ops.is_empty();
        pending.event.selection_changed |= selection_changed;
        if let Some(source) = tx.source {
            pending.event.sources.push(source);
        }
        pending.inverse_ops.append(&mut inverse_ops);
        Ok(())
    }

    /// Applies ops in order, stopping at the first failure, and returns their
    /// inverses in replay order.
    fn replay(&mut self, ops: Vec<Op>) -> Vec<Op> {
        let mut inverses: Vec<Op> = Vec::new();
        for op in ops {
            match self.apply_op(op) {
                Ok(inv) => inverses.push(inv),
                Err(err) => {
                    tracing::warn!(error = %err, "history replay stopped early");
                    break;
                }
            }
        }
        inverses.reverse();
        inverses
    }

    fn begin_update(&mut self) {
        if self.update_depth == 0 {
            self.pending = Some(PendingUpdate {
                inverse_ops: Vec::new(),
                selection_before: self.selection.clone(),
                event: UpdateEvent::default(),
            });
        }
        self.update_depth += 1;
    }

    fn end_update(&mut self) {
        self.update_depth = self.update_depth.saturating_sub(1);
        if self.update_depth > 0 {
            return;
        }
        let Some(PendingUpdate {
            mut inverse_ops,
            selection_before,
            event,
        }) = self.pending.take()
        else {
            return;
        };

        if !inverse_ops.is_empty() {
            inverse_ops.reverse();
            self.undo_stack.push(UndoRecord {
                inverse_ops,
                selection_before,
                selection_after: self.selection.clone(),
            });
            self.redo_stack.clear();
            let max_undo = self.config.history.max_undo.max(1);
            if self.undo_stack.len() > max_undo {
                let excess = self.undo_stack.len() - max_undo;
                self.undo_stack.drain(..excess);
            }
        }

        if event.content_changed || event.selection_changed {
            self.notify(event);
        }
    }

    fn pending_mut(&mut self) -> &mut PendingUpdate {
        let selection = &self.selection;
        self.pending.get_or_insert_with(|| PendingUpdate {
            inverse_ops: Vec::new(),
            selection_before: selection.clone(),
            event: UpdateEvent::default(),
        })
    }

    fn mark_history_step(&mut self) {
        let pending = self.pending_mut();
        pending.event.content_changed = true;
        pending.event.selection_changed = true;
    }

    fn notify(&mut self, event: UpdateEvent) {
        let state = ToolbarState::derive(self);
        self.toolbar.refresh(state);

        tracing::debug!(
            content = event.content_changed,
            selection = event.selection_changed,
            revision = self.toolbar.revision(),
            "editor updated"
        );

        let listeners: Vec<UpdateListener> = self
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(self, &event);
        }
    }

    fn normalize_in_place(&mut self) {
        if let Err(err) = self.normalize_into(&mut Vec::new()) {
            tracing::warn!(error = %err, "normalization failed");
        }
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = normalize_selection(&self.doc, &self.selection);
    }

    /// Runs normalize passes until none has work, appending the inverse of
    /// every applied op to `inverse_ops`, including when it fails midway.
    /// At most `max_iterations` rounds may apply ops.
    fn normalize_into(&mut self, inverse_ops: &mut Vec<Op>) -> Result<(), ApplyError> {
        let max_iterations = self.config.normalize.max_iterations.max(1);
        for round in 0..=max_iterations {
            let ops = self.registry.normalize(&self.doc);
            if ops.is_empty() {
                return Ok(());
            }
            if round == max_iterations {
                break;
            }

            let anchor = BlockOffset::capture(&self.doc, &self.selection.anchor);
            let focus = BlockOffset::capture(&self.doc, &self.selection.focus);
            for op in ops {
                inverse_ops.push(self.apply_op(op)?);
            }
            if let Some(point) = anchor.and_then(|a| a.restore(&self.doc)) {
                self.selection.anchor = point;
            }
            if let Some(point) = focus.and_then(|f| f.restore(&self.doc)) {
                self.selection.focus = point;
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }

    fn apply_op(&mut self, op: Op) -> Result<Op, ApplyError> {
        apply_op_to(&mut self.doc, &mut self.selection, op)
    }
}

fn apply_op_to(doc: &mut Document, selection: &mut Selection, op: Op) -> Result<Op, ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
            Ok(Op::RemoveText {
                path,
                range: offset..offset + text.len(),
            })
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start = clamp_to_char_boundary(&text_node.text, range.start);
            let end = clamp_to_char_boundary(&text_node.text, range.end);
            if start >= end {
                return Ok(Op::InsertText {
                    path,
                    offset: start,
                    text: String::new(),
                });
            }
            let removed = text_node.text[start..end].to_string();
            text_node.text.replace_range(start..end, "");
            transform_selection_remove_text(selection, &path, start..end);
            Ok(Op::InsertText {
                path,
                offset: start,
                text: removed,
            })
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            transform_selection_insert_node(selection, &path);
            Ok(Op::RemoveNode { path })
        }
        Op::RemoveNode { path } => {
            let removed = remove_node(doc, &path)?;
            transform_selection_remove_node(selection, &path, &removed, doc);
            Ok(Op::InsertNode {
                path,
                node: removed,
            })
        }
        Op::SetTextFormat { path, format } => {
            let text_node = node_text_mut(doc, &path)?;
            let old = std::mem::replace(&mut text_node.format, format);
            Ok(Op::SetTextFormat { path, format: old })
        }
        Op::SetTextStyle { path, style } => {
            let text_node = node_text_mut(doc, &path)?;
            let old = std::mem::replace(&mut text_node.style, style);
            Ok(Op::SetTextStyle { path, style: old })
        }
    }
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Selection,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path || point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_selection_insert_node(selection: &mut Selection, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(
    selection: &mut Selection,
    path: &[usize],
    removed: &Node,
    doc_after_remove: &Document,
) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    // A removed text leaf whose content was merged into its left sibling keeps
    // the caret at the same visual position.
    let merge_prefix_len = match (removed, index.checked_sub(1)) {
        (Node::Text(removed_text), Some(left_index)) => {
            let mut left_path = parent_path.to_vec();
            left_path.push(left_index);
            match node_at_path(doc_after_remove, &left_path) {
                Some(Node::Text(left_text))
                    if left_text.same_formatting(removed_text)
                        && left_text.text.ends_with(&removed_text.text) =>
                {
                    Some(left_text.text.len().saturating_sub(removed_text.text.len()))
                }
                _ => None,
            }
        }
        _ => None,
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
            continue;
        }
        if ix < index {
            continue;
        }

        point.path.truncate(depth + 1);
        match (merge_prefix_len, removed) {
            (Some(prefix), Node::Text(removed_text)) => {
                point.path[depth] = index - 1;
                point.offset = prefix + point.offset.min(removed_text.text.len());
            }
            _ => {
                point.path[depth] = index.saturating_sub(1);
                point.offset = 0;
            }
        }
    }
}

pub(crate) fn node_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let mut node = doc.children().get(*first)?;
    for &ix in rest {
        node = node.children()?.get(ix)?;
    }
    Some(node)
}

pub(crate) fn children_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a [Node]> {
    if path.is_empty() {
        return Some(doc.children());
    }
    node_at_path(doc, path)?.children()
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| PathError("Empty path".into()))?;

    let len = doc.children().len();
    let mut node = doc
        .children_mut()
        .get_mut(*first)
        .ok_or_else(|| PathError(format!("Path out of bounds at depth 0: {first} >= {len}")))?;

    for (depth, &ix) in rest.iter().enumerate() {
        let children = node
            .children_mut()
            .ok_or_else(|| PathError(format!("Non-container node at depth {depth}")))?;
        let len = children.len();
        node = children.get_mut(ix).ok_or_else(|| {
            PathError(format!(
                "Path out of bounds at depth {}: {ix} >= {len}",
                depth + 1
            ))
        })?;
    }
    Ok(node)
}

fn node_text_mut<'a>(
    doc: &'a mut Document,
    path: &[usize],
) -> Result<&'a mut crate::node::TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        other => Err(PathError(format!(
            "Expected text node, found {}",
            other.kind()
        ))),
    }
}

fn children_mut<'a>(doc: &'a mut Document, parent_path: &[usize]) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(doc.children_mut());
    }
    node_mut(doc, parent_path)?
        .children_mut()
        .ok_or_else(|| PathError("Parent is not a container".into()))
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty insert path".into()))?;

    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty remove path".into()))?;

    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}
