use super::{NoteRemote, NoteStore};
use crate::error::EditError;
use crate::models::{Note, NoteId};
use leptos::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditState {
    pub target: NoteId,
    pub draft: String,
}

/// The single inline edit in progress, if any.
///
/// `idle -> editing -> idle`, via save or cancel. Beginning a new edit replaces the
/// current one and its draft is lost.
#[derive(Clone, Copy)]
pub struct EditSession {
    state: RwSignal<Option<EditState>>,
    /// Bumped by begin/cancel so a save that lands late cannot close a newer edit.
    epoch: RwSignal<u64>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            state: RwSignal::new(None),
            epoch: RwSignal::new(0),
        }
    }

    pub fn begin(&self, note: &Note) {
        self.epoch.update(|e| *e += 1);
        self.state.set(Some(EditState {
            target: note.id.clone(),
            draft: note.content.clone(),
        }));
    }

    pub fn edit(&self, text: &str) -> Result<(), EditError> {
        if self.state.with_untracked(Option::is_none) {
            return Err(EditError::NotEditing);
        }
        self.state.update(|s| {
            if let Some(s) = s {
                s.draft = text.to_string();
            }
        });
        Ok(())
    }

    /// Commits the draft through [`NoteStore::update`].
    ///
    /// Returns to idle only once the update (and its refresh) succeeded; on failure the
    /// draft is kept so it can be retried or cancelled.
    pub async fn save<R: NoteRemote>(&self, store: &NoteStore<R>) -> Result<(), EditError> {
        let edit = self.state.get_untracked().ok_or(EditError::NotEditing)?;
        let epoch = self.epoch.get_untracked();

        store.update(&edit.target, &edit.draft).await?;

        if self.epoch.get_untracked() == epoch {
            self.state.set(None);
        }
        Ok(())
    }

    pub fn cancel(&self) {
        if self.state.with_untracked(Option::is_some) {
            self.epoch.update(|e| *e += 1);
            self.state.set(None);
        }
    }

    pub fn current(&self) -> Option<EditState> {
        self.state.get_untracked()
    }

    pub fn target(&self) -> Option<NoteId> {
        self.state
            .with_untracked(|s| s.as_ref().map(|s| s.target.clone()))
    }

    pub fn draft(&self) -> Option<String> {
        self.state
            .with_untracked(|s| s.as_ref().map(|s| s.draft.clone()))
    }

    pub fn is_editing(&self, id: &NoteId) -> bool {
        self.state
            .with_untracked(|s| s.as_ref().is_some_and(|s| &s.target == id))
    }

    pub fn watch(&self) -> ReadSignal<Option<EditState>> {
        self.state.read_only()
    }
}
