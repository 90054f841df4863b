//! Owner-scoped notes: the remote boundary, the read-after-write store and the
//! single inline-edit workflow.

mod command;
mod edit;
mod store;

pub use command::{DirtySignal, DirtyTicket, NoteCommand};
pub use edit::{EditSession, EditState};
pub use store::{NoteBinding, NoteStore};

use crate::error::RemoteError;
use crate::models::{Note, NoteId};
use std::future::Future;

/// Boundary to the remote `notes` table.
///
/// Row-level ownership is enforced by the store itself; implementations only scope
/// reads by `user_id`.
pub trait NoteRemote {
    /// All rows owned by `user_id`, newest `created_at` first.
    fn fetch_notes(&self, user_id: &str) -> impl Future<Output = Result<Vec<Note>, RemoteError>>;

    fn insert_note(
        &self,
        user_id: &str,
        content: &str,
    ) -> impl Future<Output = Result<(), RemoteError>>;

    fn update_note(
        &self,
        id: &NoteId,
        content: &str,
    ) -> impl Future<Output = Result<(), RemoteError>>;

    fn delete_note(&self, id: &NoteId) -> impl Future<Output = Result<(), RemoteError>>;
}
