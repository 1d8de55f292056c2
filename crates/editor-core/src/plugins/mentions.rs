//! `@` mentions with debounced, cached suggestion lookup.
//!
//! Lookups are driven by the host: after input it calls [`refresh`], then
//! [`poll`] on its own schedule to collect due requests, performs them (on
//! any executor) and hands the outcome back through [`resolve`]. Hosts that
//! can block simply call [`run_due`], which uses the plugin's
//! [`MentionLookup`]. A request the host gives up on must be handed back
//! through [`cancel`] so the query can be looked up again.

use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::bus::{Command, CommandPriority};
use crate::config::MentionsConfig;
use crate::core::Editor;
use crate::edits;
use crate::error::{CommandError, LookupError};
use crate::node::{MentionNode, Node, NodeKind};
use crate::ops::Path;
use crate::plugin::{EditorPlugin, NodeSpec};

pub const INSERT_MENTION: Command<InsertMention> = Command::new("mentions.insert");

const PUNCTUATION: &str = "\\.,+*?$@|#{}()^-[]/!%'\"~=<>_:;";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertMention {
    pub mention_name: String,
}

pub trait MentionLookup {
    fn search(&self, query: &str) -> Result<Vec<String>, LookupError>;
}

impl<F> MentionLookup for F
where
    F: Fn(&str) -> Result<Vec<String>, LookupError>,
{
    fn search(&self, query: &str) -> Result<Vec<String>, LookupError> {
        self(query)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub token: RequestToken,
    pub query: String,
}

/// The trigger and query typed immediately before the caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionMatch {
    pub path: Path,
    /// Byte range of trigger plus query inside the text leaf.
    pub range: Range<usize>,
    pub query: String,
}

/// Per-editor mention state, stored as an editor extension.
pub struct MentionSession {
    lookup: Rc<dyn MentionLookup>,
    config: MentionsConfig,
    active: Option<MentionMatch>,
    suggestions: Vec<String>,
    cache: HashMap<String, Vec<String>>,
    in_flight: HashMap<String, RequestToken>,
    latest: HashMap<String, RequestToken>,
    due: Option<Instant>,
    next_token: u64,
}

impl MentionSession {
    fn new(lookup: Rc<dyn MentionLookup>, config: MentionsConfig) -> Self {
        Self {
            lookup,
            config,
            active: None,
            suggestions: Vec::new(),
            cache: HashMap::new(),
            in_flight: HashMap::new(),
            latest: HashMap::new(),
            due: None,
            next_token: 0,
        }
    }

    pub fn active(&self) -> Option<&MentionMatch> {
        self.active.as_ref()
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn is_cached(&self, query: &str) -> bool {
        self.cache.contains_key(query)
    }

    pub fn is_in_flight(&self, query: &str) -> bool {
        self.in_flight.contains_key(query)
    }

    /// When the pending lookup for the active query becomes due.
    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    fn set_match(&mut self, found: Option<MentionMatch>, now: Instant) {
        let Some(found) = found else {
            self.clear();
            return;
        };

        let same_query = self
            .active
            .as_ref()
            .is_some_and(|active| active.query == found.query);
        let query = found.query.clone();
        self.active = Some(found);
        if same_query {
            return;
        }

        match self.cache.get(&query) {
            Some(cached) => {
                self.suggestions = cached.clone();
                self.due = None;
            }
            None => {
                self.suggestions.clear();
                self.due = Some(now + Duration::from_millis(self.config.debounce_ms));
            }
        }
    }

    fn clear(&mut self) {
        self.active = None;
        self.suggestions.clear();
        self.due = None;
    }

    fn take_due(&mut self, now: Instant) -> Option<LookupRequest> {
        if self.due.is_none_or(|due| due > now) {
            return None;
        }
        self.due = None;

        let query = self.active.as_ref()?.query.clone();
        if let Some(cached) = self.cache.get(&query) {
            self.suggestions = cached.clone();
            return None;
        }
        if self.in_flight.contains_key(&query) {
            tracing::trace!(%query, "mention lookup already in flight");
            return None;
        }

        let token = RequestToken(self.next_token);
        self.next_token += 1;
        self.in_flight.insert(query.clone(), token);
        self.latest.insert(query.clone(), token);
        Some(LookupRequest { token, query })
    }

    fn cancel(&mut self, request: &LookupRequest, now: Instant) -> bool {
        if self.in_flight.get(&request.query) != Some(&request.token) {
            return false;
        }
        self.in_flight.remove(&request.query);
        if self.latest.get(&request.query) == Some(&request.token) {
            self.latest.remove(&request.query);
        }

        let still_wanted = self
            .active
            .as_ref()
            .is_some_and(|active| active.query == request.query)
            && !self.cache.contains_key(&request.query);
        if still_wanted {
            self.due = Some(now);
        }
        tracing::debug!(query = %request.query, retry = still_wanted, "mention lookup cancelled");
        true
    }

    fn resolve(&mut self, request: &LookupRequest, result: Result<Vec<String>, LookupError>) -> bool {
        if self.in_flight.get(&request.query) == Some(&request.token) {
            self.in_flight.remove(&request.query);
        }

        let results = match result {
            Ok(results) => {
                self.cache.insert(request.query.clone(), results.clone());
                results
            }
            Err(err) => {
                tracing::warn!(query = %request.query, error = %err, "mention lookup failed");
                Vec::new()
            }
        };

        let is_latest = self.latest.get(&request.query) == Some(&request.token);
        let is_active = self
            .active
            .as_ref()
            .is_some_and(|active| active.query == request.query);
        if !is_latest || !is_active {
            tracing::debug!(query = %request.query, "discarding stale mention lookup");
            return false;
        }

        self.suggestions = results;
        true
    }
}

pub struct MentionsPlugin {
    lookup: Rc<dyn MentionLookup>,
}

impl MentionsPlugin {
    pub fn new(lookup: impl MentionLookup + 'static) -> Self {
        Self {
            lookup: Rc::new(lookup),
        }
    }
}

impl EditorPlugin for MentionsPlugin {
    fn id(&self) -> &'static str {
        "mentions"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::inline_atomic(NodeKind::Mention)]
    }

    fn register(&mut self, editor: &mut Editor) -> Result<(), CommandError> {
        let config = editor.config().mentions.clone();
        editor.insert_extension(MentionSession::new(self.lookup.clone(), config));

        editor.register_command(INSERT_MENTION, CommandPriority::Editor, |editor, payload| {
            let node = MentionNode::new(payload.mention_name.clone())?;
            let Some(found) = current_match(editor) else {
                return Ok(false);
            };
            let tx = edits::replace_text_with_inline(
                editor,
                &found.path,
                found.range,
                Node::Mention(node),
                "command:mentions.insert",
            )?;
            editor.apply(tx)?;
            if let Some(session) = editor.extension_mut::<MentionSession>() {
                session.clear();
            }
            Ok(true)
        })?;
        Ok(())
    }
}

pub fn session(editor: &Editor) -> Option<&MentionSession> {
    editor.extension::<MentionSession>()
}

/// Re-reads the query at the caret. A new query schedules a lookup
/// `debounce_ms` after `now`, replacing any pending one.
pub fn refresh(editor: &mut Editor, now: Instant) -> Option<MentionMatch> {
    let found = current_match(editor);
    let session = editor.extension_mut::<MentionSession>()?;
    session.set_match(found.clone(), now);
    found
}

/// The lookup that is due at `now`, if any. Cached and in-flight queries do
/// not produce a request.
pub fn poll(editor: &mut Editor, now: Instant) -> Option<LookupRequest> {
    editor.extension_mut::<MentionSession>()?.take_due(now)
}

/// Delivers a lookup outcome. Returns whether it became the visible
/// suggestion list; superseded requests only fill the cache.
pub fn resolve(
    editor: &mut Editor,
    request: &LookupRequest,
    result: Result<Vec<String>, LookupError>,
) -> bool {
    editor
        .extension_mut::<MentionSession>()
        .is_some_and(|session| session.resolve(request, result))
}

/// Abandons an in-flight request. If its query is still the active one the
/// lookup becomes due again at `now`; a late [`resolve`] for it is stale.
/// Returns false for unknown or already settled requests.
pub fn cancel(editor: &mut Editor, request: &LookupRequest, now: Instant) -> bool {
    editor
        .extension_mut::<MentionSession>()
        .is_some_and(|session| session.cancel(request, now))
}

/// Polls and, when a lookup is due, runs it synchronously.
pub fn run_due(editor: &mut Editor, now: Instant) -> bool {
    let Some(request) = poll(editor, now) else {
        return false;
    };
    let Some(lookup) = session(editor).map(|s| s.lookup.clone()) else {
        return false;
    };
    let result = lookup.search(&request.query);
    resolve(editor, &request, result)
}

pub fn suggestions(editor: &Editor) -> &[String] {
    session(editor).map(MentionSession::suggestions).unwrap_or(&[])
}

/// Inserts the suggestion at `index` in place of the typed query.
pub fn select(editor: &mut Editor, index: usize) -> Result<bool, CommandError> {
    let Some(name) = suggestions(editor).get(index).cloned() else {
        return Ok(false);
    };
    editor.dispatch(INSERT_MENTION, InsertMention { mention_name: name })
}

fn current_match(editor: &Editor) -> Option<MentionMatch> {
    let config = session(editor)?.config.clone();
    if !editor.selection().is_collapsed() {
        return None;
    }
    let caret = edits::focus_text(editor).ok()?;
    let before = caret.text.text.get(..caret.cursor)?;
    let (start, query) = find_trigger(before, config.trigger, config.max_query_len)?;
    Some(MentionMatch {
        path: caret.path(),
        range: start..caret.cursor,
        query,
    })
}

fn is_query_char(c: char, trigger: char) -> bool {
    c != trigger && !c.is_whitespace() && !PUNCTUATION.contains(c)
}

/// Finds `trigger` followed by 1..=`max_len` query characters at the end of
/// `before`. The trigger must open the text or follow whitespace or `(`.
/// Returns the trigger's byte offset and the query.
pub(crate) fn find_trigger(before: &str, trigger: char, max_len: usize) -> Option<(usize, String)> {
    let mut count = 0usize;
    for (ix, c) in before.char_indices().rev() {
        if c == trigger {
            if count == 0 {
                return None;
            }
            let opens = before[..ix]
                .chars()
                .next_back()
                .is_none_or(|prev| prev.is_whitespace() || prev == '(');
            if !opens {
                return None;
            }
            return Some((ix, before[ix + c.len_utf8()..].to_string()));
        }
        if !is_query_char(c, trigger) {
            return None;
        }
        count += 1;
        if count > max_len {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::find_trigger;

    #[test]
    fn trigger_at_start_or_after_whitespace() {
        assert_eq!(find_trigger("@jo", '@', 75), Some((0, "jo".to_string())));
        assert_eq!(find_trigger("Hello @jo", '@', 75), Some((6, "jo".to_string())));
        assert_eq!(find_trigger("(@jo", '@', 75), Some((1, "jo".to_string())));
    }

    #[test]
    fn trigger_inside_word_is_ignored() {
        assert_eq!(find_trigger("mail@jo", '@', 75), None);
    }

    #[test]
    fn query_needs_one_to_max_chars() {
        assert_eq!(find_trigger("Hello @", '@', 75), None);
        assert_eq!(find_trigger("@abcd", '@', 3), None);
        assert_eq!(find_trigger("@abc", '@', 3), Some((0, "abc".to_string())));
    }

    #[test]
    fn whitespace_or_punctuation_ends_query() {
        assert_eq!(find_trigger("@jo ", '@', 75), None);
        assert_eq!(find_trigger("@jo.", '@', 75), None);
        assert_eq!(find_trigger("@jo do", '@', 75), None);
    }

    #[test]
    fn custom_trigger() {
        assert_eq!(find_trigger("hi #tag", '#', 75), Some((3, "tag".to_string())));
    }
}
