//! Prioritized command dispatch.
//!
//! Commands are typed keys: a [`Command<P>`] names a command and fixes the
//! payload type its handlers receive. Handlers run in descending
//! [`CommandPriority`], then in registration order, until one of them claims
//! the command by returning `Ok(true)`.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::core::Editor;
use crate::error::CommandError;

pub struct Command<P> {
    id: &'static str,
    _payload: PhantomData<fn(&P)>,
}

impl<P> Command<P> {
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            _payload: PhantomData,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }
}

impl<P> Clone for Command<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Command<P> {}

impl<P> fmt::Debug for Command<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Command").field(&self.id).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandPriority {
    Low,
    Editor,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId {
    command: &'static str,
    seq: u64,
}

impl HandlerId {
    pub fn command(&self) -> &'static str {
        self.command
    }
}

pub(crate) type ErasedHandler = Rc<dyn Fn(&mut Editor, &dyn Any) -> Result<bool, CommandError>>;

struct HandlerEntry {
    seq: u64,
    priority: CommandPriority,
    handler: ErasedHandler,
}

struct CommandSlot {
    payload: TypeId,
    payload_name: &'static str,
    handlers: Vec<HandlerEntry>,
}

#[derive(Default)]
pub struct CommandBus {
    slots: HashMap<&'static str, CommandSlot>,
    next_seq: u64,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: 'static>(
        &mut self,
        command: Command<P>,
        priority: CommandPriority,
        handler: impl Fn(&mut Editor, &P) -> Result<bool, CommandError> + 'static,
    ) -> Result<HandlerId, CommandError> {
        let slot = self.slots.entry(command.id).or_insert_with(|| CommandSlot {
            payload: TypeId::of::<P>(),
            payload_name: type_name::<P>(),
            handlers: Vec::new(),
        });
        if slot.payload != TypeId::of::<P>() {
            return Err(CommandError::PayloadMismatch {
                command: command.id,
                registered: slot.payload_name,
                requested: type_name::<P>(),
            });
        }

        let id = command.id;
        let erased: ErasedHandler = Rc::new(move |editor: &mut Editor, payload: &dyn Any| {
            let payload =
                payload
                    .downcast_ref::<P>()
                    .ok_or_else(|| CommandError::PayloadMismatch {
                        command: id,
                        registered: type_name::<P>(),
                        requested: "<foreign payload>",
                    })?;
            handler(editor, payload)
        });

        let seq = self.next_seq;
        self.next_seq += 1;

        // Keep handlers sorted by descending priority; a new handler goes
        // after every existing handler of the same or higher tier.
        let at = slot
            .handlers
            .iter()
            .position(|entry| entry.priority < priority)
            .unwrap_or(slot.handlers.len());
        slot.handlers.insert(
            at,
            HandlerEntry {
                seq,
                priority,
                handler: erased,
            },
        );

        tracing::debug!(command = id, ?priority, seq, "registered command handler");
        Ok(HandlerId { command: id, seq })
    }

    pub fn unregister(&mut self, handler: HandlerId) -> bool {
        let Some(slot) = self.slots.get_mut(handler.command) else {
            return false;
        };
        let before = slot.handlers.len();
        slot.handlers.retain(|entry| entry.seq != handler.seq);
        let removed = slot.handlers.len() != before;
        if removed {
            tracing::debug!(command = handler.command, seq = handler.seq, "unregistered command handler");
        }
        removed
    }

    pub fn handler_count(&self, command: &str) -> usize {
        self.slots
            .get(command)
            .map(|slot| slot.handlers.len())
            .unwrap_or(0)
    }

    pub fn has_handlers(&self, command: &str) -> bool {
        self.handler_count(command) > 0
    }

    pub fn command_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots
            .iter()
            .filter(|(_, slot)| !slot.handlers.is_empty())
            .map(|(id, _)| *id)
    }

    /// Handlers for `command` in dispatch order, detached from the bus so
    /// they can run while the editor (and this bus) is mutably borrowed.
    pub(crate) fn snapshot<P: 'static>(
        &self,
        command: Command<P>,
    ) -> Result<Vec<ErasedHandler>, CommandError> {
        let Some(slot) = self.slots.get(command.id) else {
            return Ok(Vec::new());
        };
        if slot.payload != TypeId::of::<P>() {
            return Err(CommandError::PayloadMismatch {
                command: command.id,
                registered: slot.payload_name,
                requested: type_name::<P>(),
            });
        }
        Ok(slot
            .handlers
            .iter()
            .map(|entry| entry.handler.clone())
            .collect())
    }
}
