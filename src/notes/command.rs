use crate::error::NoteError;
use crate::models::NoteId;
use crate::util::is_blank;
use leptos::prelude::*;

/// A mutation against the remote notes table.
#[derive(Clone, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum NoteCommand {
    Add { content: String },
    Update { id: NoteId, content: String },
    Remove { id: NoteId },
}

impl NoteCommand {
    /// Local checks that must pass before any network call.
    pub fn validate(&self) -> Result<(), NoteError> {
        match self {
            NoteCommand::Add { content } | NoteCommand::Update { content, .. }
                if is_blank(content) =>
            {
                Err(NoteError::Validation)
            }
            _ => Ok(()),
        }
    }
}

/// Marks the cache as out of date with the remote store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyTicket {
    /// Store generation when the ticket was issued.
    pub generation: u64,
    pub seq: u64,
}

/// Issues cache-dirty tickets and decides which reconciliation result may be applied.
///
/// Tickets are ordered by issue time. A fetch result is applied only if no newer ticket
/// has already been applied, so the last-issued refresh wins rather than the
/// last-arriving one.
#[derive(Clone, Copy)]
pub struct DirtySignal {
    issued: RwSignal<u64>,
    applied: RwSignal<u64>,
}

impl Default for DirtySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtySignal {
    pub fn new() -> Self {
        Self {
            issued: RwSignal::new(0),
            applied: RwSignal::new(0),
        }
    }

    pub fn mark(&self, generation: u64) -> DirtyTicket {
        self.issued.update(|n| *n += 1);
        DirtyTicket {
            generation,
            seq: self.issued.get_untracked(),
        }
    }

    /// Claims the right to apply a result for `ticket`.
    pub fn accept(&self, ticket: DirtyTicket) -> bool {
        if ticket.seq <= self.applied.get_untracked() {
            return false;
        }
        self.applied.set(ticket.seq);
        true
    }
}
