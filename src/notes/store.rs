use super::command::{DirtySignal, DirtyTicket, NoteCommand};
use super::NoteRemote;
use crate::error::NoteError;
use crate::models::{Note, NoteId};
use leptos::prelude::*;
use std::sync::Arc;

/// Which user the cache belongs to, and the generation that binding was made under.
///
/// Signals only, so it is `Copy + Send + Sync` and can be driven from a session
/// listener without holding the remote.
#[derive(Clone, Copy)]
pub struct NoteBinding {
    user: RwSignal<Option<String>>,
    /// Moves forward on every bind/unbind; responses tagged with an older value are stale.
    generation: RwSignal<u64>,
    notes: RwSignal<Vec<Note>>,
}

impl NoteBinding {
    fn new(notes: RwSignal<Vec<Note>>) -> Self {
        Self {
            user: RwSignal::new(None),
            generation: RwSignal::new(0),
            notes,
        }
    }

    /// Returns `true` when this changed the binding.
    pub fn bind(&self, user_id: &str) -> bool {
        if self.user.with_untracked(|u| u.as_deref() == Some(user_id)) {
            return false;
        }
        log::debug!("notes: binding to {user_id}");
        let next = self.generation.get_untracked() + 1;
        self.invalidate(Some(user_id.to_string()), next);
        true
    }

    pub fn unbind(&self) {
        if self.user.with_untracked(Option::is_none) {
            return;
        }
        log::debug!("notes: unbound");
        let next = self.generation.get_untracked() + 1;
        self.invalidate(None, next);
    }

    /// Rebinds to an identity reported by the session tracker under its `generation`.
    ///
    /// Always invalidates. When every rebind comes through here the store generation
    /// equals the tracker's.
    pub fn follow(&self, user_id: Option<&str>, generation: u64) {
        let next = generation.max(self.generation.get_untracked() + 1);
        match user_id {
            Some(user) => log::debug!("notes: following {user} (generation {next})"),
            None => log::debug!("notes: unbound (generation {next})"),
        }
        self.invalidate(user_id.map(str::to_string), next);
    }

    fn invalidate(&self, user: Option<String>, generation: u64) {
        self.generation.set(generation);
        self.user.set(user);
        self.notes.set(vec![]);
    }

    pub fn user(&self) -> Option<String> {
        self.user.get_untracked()
    }

    pub fn generation(&self) -> u64 {
        self.generation.get_untracked()
    }
}

/// The signed-in user's notes, kept as a read-after-write mirror of the remote table.
///
/// Every successful mutation is followed by a full re-fetch that replaces the cache;
/// nothing is patched locally. Mutations are not serialized against each other, but
/// their re-fetches are sequenced through a [`DirtySignal`] and tagged with the binding
/// generation, so results that are older than one already applied, or that belong to a
/// previous user, are discarded.
pub struct NoteStore<R> {
    remote: Arc<R>,
    notes: RwSignal<Vec<Note>>,
    in_flight: RwSignal<usize>,
    binding: NoteBinding,
    dirty: DirtySignal,
}

impl<R> Clone for NoteStore<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            notes: self.notes,
            in_flight: self.in_flight,
            binding: self.binding,
            dirty: self.dirty,
        }
    }
}

impl<R: NoteRemote> NoteStore<R> {
    pub fn new(remote: Arc<R>) -> Self {
        let notes = RwSignal::new(vec![]);
        Self {
            remote,
            notes,
            in_flight: RwSignal::new(0),
            binding: NoteBinding::new(notes),
            dirty: DirtySignal::new(),
        }
    }

    /// Binds the store to `user_id`.
    ///
    /// Returns `true` when this changed the binding; the cache is then cleared and must
    /// be re-derived with [`refresh`](Self::refresh).
    pub fn bind(&self, user_id: &str) -> bool {
        self.binding.bind(user_id)
    }

    /// Drops the binding (sign-out or view teardown). In-flight responses are ignored.
    pub fn unbind(&self) {
        self.binding.unbind()
    }

    /// Handle for rebinding from a session listener.
    pub fn binding(&self) -> NoteBinding {
        self.binding
    }

    pub fn bound_user(&self) -> Option<String> {
        self.binding.user()
    }

    pub fn generation(&self) -> u64 {
        self.binding.generation()
    }

    /// Snapshot of the cached notes, newest first.
    pub fn notes(&self) -> Vec<Note> {
        self.notes.get_untracked()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.with_untracked(Vec::is_empty)
    }

    pub fn loading(&self) -> bool {
        self.in_flight.get_untracked() > 0
    }

    /// Reactive handles for the view layer.
    pub fn watch_notes(&self) -> ReadSignal<Vec<Note>> {
        self.notes.read_only()
    }

    pub fn watch_loading(&self) -> Signal<bool> {
        let in_flight = self.in_flight;
        Signal::derive(move || in_flight.get() > 0)
    }

    /// Re-fetches the bound user's notes and replaces the cache.
    pub async fn refresh(&self) -> Result<(), NoteError> {
        let user = self.bound_user().ok_or(NoteError::NoSession)?;
        let ticket = self.dirty.mark(self.generation());
        self.reconcile(&user, ticket).await
    }

    pub async fn add(&self, content: &str) -> Result<(), NoteError> {
        self.execute(NoteCommand::Add {
            content: content.to_string(),
        })
        .await
    }

    pub async fn update(&self, id: &NoteId, content: &str) -> Result<(), NoteError> {
        self.execute(NoteCommand::Update {
            id: id.clone(),
            content: content.to_string(),
        })
        .await
    }

    pub async fn remove(&self, id: &NoteId) -> Result<(), NoteError> {
        self.execute(NoteCommand::Remove { id: id.clone() }).await
    }

    /// Runs a mutation remotely, then reconciles the cache.
    ///
    /// Validation failures and missing sessions are reported before any network call.
    /// A failed mutation leaves the cache exactly as it was and is not retried.
    pub async fn execute(&self, command: NoteCommand) -> Result<(), NoteError> {
        command.validate()?;
        let user = self.bound_user().ok_or(NoteError::NoSession)?;
        let generation = self.generation();

        let result = match &command {
            NoteCommand::Add { content } => self.remote.insert_note(&user, content).await,
            NoteCommand::Update { id, content } => self.remote.update_note(id, content).await,
            NoteCommand::Remove { id } => self.remote.delete_note(id).await,
        };
        if let Err(e) = result {
            log::error!("notes: {command} failed: {e}");
            return Err(e.into());
        }

        let ticket = self.dirty.mark(generation);
        log::debug!("notes: {command} done, cache dirty (seq {})", ticket.seq);
        self.reconcile(&user, ticket).await
    }

    /// The single reconciliation step: fetch, then apply if the ticket is still current.
    async fn reconcile(&self, user: &str, ticket: DirtyTicket) -> Result<(), NoteError> {
        self.in_flight.update(|n| *n += 1);
        let result = self.remote.fetch_notes(user).await;
        self.in_flight.update(|n| *n = n.saturating_sub(1));

        if ticket.generation != self.generation() {
            log::warn!(
                "notes: discarding response for stale generation {} (now {})",
                ticket.generation,
                self.generation()
            );
            return Ok(());
        }

        let mut notes = match result {
            Ok(notes) => notes,
            Err(e) => {
                log::error!("notes: refresh failed: {e}");
                return Err(e.into());
            }
        };

        if !self.dirty.accept(ticket) {
            log::debug!("notes: refresh seq {} superseded", ticket.seq);
            return Ok(());
        }

        let before = notes.len();
        notes.retain(|n| n.owner_id == user);
        if notes.len() != before {
            log::warn!(
                "notes: dropped {} row(s) not owned by {user}",
                before - notes.len()
            );
        }
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.notes.set(notes);
        Ok(())
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::error::{RemoteError, RemoteErrorKind};
    use crate::testing::{ts, FakeRemote};
    use std::time::Duration;

    fn ids(store: &NoteStore<FakeRemote>) -> Vec<String> {
        store
            .notes()
            .into_iter()
            .map(|n| n.id.as_str().to_string())
            .collect()
    }

    fn seeded() -> (Arc<FakeRemote>, NoteStore<FakeRemote>) {
        let remote = Arc::new(FakeRemote::new());
        remote.seed("1", "a", "u1", ts(1));
        remote.seed("2", "b", "u1", ts(2));
        let store = NoteStore::new(Arc::clone(&remote));
        store.bind("u1");
        (remote, store)
    }

    #[tokio::test]
    async fn test_refresh_orders_newest_first() {
        let (_remote, store) = seeded();
        store.refresh().await.expect("refresh");
        assert_eq!(ids(&store), vec!["2", "1"]);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn test_refresh_replaces_cache_wholesale() {
        let (remote, store) = seeded();
        store.refresh().await.expect("refresh");

        // Another client deletes a row and adds one.
        remote.delete_row("2");
        remote.seed("3", "c", "u1", ts(3));
        store.refresh().await.expect("refresh");

        assert_eq!(ids(&store), vec!["3", "1"]);
    }

    #[tokio::test]
    async fn test_add_then_newest_is_added_content() {
        let (remote, store) = seeded();
        store.refresh().await.expect("refresh");

        store.add("hello").await.expect("add");

        let notes = store.notes();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].content, "hello");
        assert_eq!(notes[0].owner_id, "u1");
        assert_eq!(remote.rows_for("u1"), notes);
    }

    #[tokio::test]
    async fn test_blank_add_makes_no_calls() {
        let (remote, store) = seeded();
        store.refresh().await.expect("refresh");
        let before = store.notes();
        let calls = remote.calls();

        assert_eq!(store.add("").await, Err(NoteError::Validation));
        assert_eq!(store.add("   ").await, Err(NoteError::Validation));

        assert_eq!(remote.calls(), calls);
        assert_eq!(store.notes(), before);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_cache_untouched() {
        let (remote, store) = seeded();
        store.refresh().await.expect("refresh");
        let before = store.notes();

        remote.fail_next(RemoteError::http(403, "permission denied for table notes"));
        let err = store.add("nope").await.expect_err("insert should fail");

        assert_eq!(err.to_string(), "permission denied for table notes");
        assert_eq!(store.notes(), before);
        // No refresh after a failed mutation, and no retry.
        assert_eq!(remote.fetch_calls(), 1);
        assert_eq!(remote.rows_for("u1").len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_list() {
        let (remote, store) = seeded();
        store.refresh().await.expect("refresh");
        let before = store.notes();

        remote.fail_next(RemoteError::malformed("note 9 is missing `content`"));
        let err = store.refresh().await.expect_err("refresh should fail");

        assert!(matches!(err, NoteError::Remote(ref e) if e.kind == RemoteErrorKind::Malformed));
        assert_eq!(store.notes(), before);
    }

    #[tokio::test]
    async fn test_update_and_remove_resync() {
        let (remote, store) = seeded();
        store.refresh().await.expect("refresh");

        store.update(&NoteId::new("1"), "a2").await.expect("update");
        store.remove(&NoteId::new("2")).await.expect("remove");

        let notes = store.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "a2");
        assert_eq!(remote.rows_for("u1"), notes);
    }

    #[tokio::test]
    async fn test_mutation_sequence_mirrors_server() {
        let (remote, store) = seeded();
        store.refresh().await.expect("refresh");

        store.add("c").await.expect("add");
        store.add("d").await.expect("add");
        let newest = store.notes()[0].id.clone();
        store.update(&newest, "d2").await.expect("update");
        store.remove(&NoteId::new("1")).await.expect("remove");

        assert_eq!(store.notes(), remote.rows_for("u1"));
        assert_eq!(store.notes()[0].content, "d2");
    }

    #[tokio::test]
    async fn test_unbound_store_rejects_mutations() {
        let remote = Arc::new(FakeRemote::new());
        let store = NoteStore::new(Arc::clone(&remote));

        assert_eq!(store.add("x").await, Err(NoteError::NoSession));
        assert_eq!(store.refresh().await, Err(NoteError::NoSession));
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_rebind_clears_previous_users_notes() {
        let (remote, store) = seeded();
        remote.seed("7", "theirs", "u2", ts(7));
        store.refresh().await.expect("refresh");
        assert_eq!(store.notes().len(), 2);

        assert!(store.bind("u2"));
        assert!(store.is_empty());
        store.refresh().await.expect("refresh");

        let notes = store.notes();
        assert_eq!(ids(&store), vec!["7"]);
        assert!(notes.iter().all(|n| n.owner_id == "u2"));
        assert!(!store.bind("u2"));
    }

    #[tokio::test]
    async fn test_follow_takes_tracker_generation_and_discards_in_flight() {
        let (remote, store) = seeded();
        remote.seed("7", "theirs", "u2", ts(7));
        remote.delay_fetches(&[Duration::from_millis(20)]);
        let binding = store.binding();

        let (result, ()) = tokio::join!(store.refresh(), async {
            tokio::task::yield_now().await;
            binding.follow(Some("u2"), 5);
        });
        result.expect("stale refresh is not an error");

        assert_eq!(store.generation(), 5);
        assert_eq!(store.bound_user().as_deref(), Some("u2"));
        assert!(store.is_empty());

        // An older tracker generation never moves the store backwards.
        binding.follow(None, 2);
        assert_eq!(store.generation(), 6);
        assert_eq!(store.bound_user(), None);
    }

    #[tokio::test]
    async fn test_foreign_rows_are_dropped() {
        let (remote, store) = seeded();
        remote.leak_rows_from("u2");
        remote.seed("9", "leaked", "u2", ts(9));

        store.refresh().await.expect("refresh");

        assert_eq!(ids(&store), vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_stale_generation_response_is_ignored() {
        let (remote, store) = seeded();
        remote.seed("7", "theirs", "u2", ts(7));
        remote.delay_fetches(&[Duration::from_millis(40)]);

        let (first, second) = tokio::join!(store.refresh(), async {
            tokio::task::yield_now().await;
            store.bind("u2");
            store.refresh().await
        });
        first.expect("stale refresh is not an error");
        second.expect("refresh");

        assert_eq!(ids(&store), vec!["7"]);
    }

    #[tokio::test]
    async fn test_unbind_discards_in_flight_response() {
        let (remote, store) = seeded();
        remote.delay_fetches(&[Duration::from_millis(20)]);

        let (result, ()) = tokio::join!(store.refresh(), async {
            tokio::task::yield_now().await;
            store.unbind();
        });
        result.expect("stale refresh is not an error");

        assert!(store.is_empty());
        assert_eq!(store.bound_user(), None);
    }

    #[tokio::test]
    async fn test_concurrent_mutations_converge_when_first_refresh_lands_last() {
        let (remote, store) = seeded();
        store.refresh().await.expect("refresh");
        // update's refresh is slow, remove's refresh is fast.
        remote.delay_fetches(&[Duration::from_millis(40), Duration::ZERO]);

        let (second, first) = (NoteId::new("2"), NoteId::new("1"));
        let (updated, removed) = tokio::join!(store.update(&second, "b2"), store.remove(&first));
        updated.expect("update");
        removed.expect("remove");

        let notes = store.notes();
        assert_eq!(ids(&store), vec!["2"]);
        assert_eq!(notes[0].content, "b2");
    }

    #[tokio::test]
    async fn test_concurrent_mutations_converge_when_refreshes_land_in_order() {
        let (remote, store) = seeded();
        store.refresh().await.expect("refresh");
        remote.delay_fetches(&[Duration::ZERO, Duration::from_millis(40)]);

        let (second, first) = (NoteId::new("2"), NoteId::new("1"));
        let (updated, removed) = tokio::join!(store.update(&second, "b2"), store.remove(&first));
        updated.expect("update");
        removed.expect("remove");

        let notes = store.notes();
        assert_eq!(ids(&store), vec!["2"]);
        assert_eq!(notes[0].content, "b2");
    }
}
