//! Composition root: session-driven choice between the credential form and the notes.
//!
//! The gate owns one [`SessionTracker`], one [`NoteStore`] and one [`EditSession`], and
//! hands out clones of them to the views. All credential actions go through the gate so
//! the form state (busy flag, provider message) is updated in a single place.

use crate::error::{AuthError, NoteError};
use crate::notes::{EditSession, NoteRemote, NoteStore};
use crate::session::{AuthProvider, SessionState, SessionTracker, SignUpOutcome};
use crate::util::is_blank;
use leptos::prelude::*;
use std::future::Future;
use std::sync::Arc;

pub(crate) const LOGGED_IN_NOTICE: &str = "Logged in successfully";
pub(crate) const SIGNUP_CONFIRM_NOTICE: &str = "Signup successful! Check your email to confirm.";
pub(crate) const SIGNUP_DONE_NOTICE: &str = "Signup successful!";
pub(crate) const RESET_SENT_NOTICE: &str = "Password reset link sent to your email";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateView {
    /// Initial session fetch pending; nothing actionable is shown.
    Loading,
    Unauthenticated,
    Authenticated { user_id: String },
}

impl From<&SessionState> for GateView {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Undetermined => GateView::Loading,
            SessionState::SignedOut => GateView::Unauthenticated,
            SessionState::SignedIn(s) => GateView::Authenticated {
                user_id: s.user_id.clone(),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AuthAction {
    Login,
    Signup,
    ResetPassword,
    Logout,
}

/// State behind the credential-entry view.
#[derive(Clone, Copy)]
pub struct CredentialForm {
    pub email: RwSignal<String>,
    pub password: RwSignal<String>,
    pub busy: RwSignal<bool>,
    /// The provider's message from the last failed action, verbatim.
    pub error: RwSignal<Option<String>>,
    pub notice: RwSignal<Option<String>>,
}

impl Default for CredentialForm {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialForm {
    pub fn new() -> Self {
        Self {
            email: RwSignal::new(String::new()),
            password: RwSignal::new(String::new()),
            busy: RwSignal::new(false),
            error: RwSignal::new(None),
            notice: RwSignal::new(None),
        }
    }

    pub fn can_reset_password(&self) -> bool {
        !self.busy.get_untracked() && !is_blank(&self.email.get_untracked())
    }
}

pub struct AuthGate<A, R> {
    provider: Arc<A>,
    tracker: SessionTracker,
    store: NoteStore<R>,
    edit: EditSession,
    form: CredentialForm,
    /// Store generation whose notes have been requested.
    loaded: RwSignal<Option<u64>>,
}

impl<A, R> Clone for AuthGate<A, R> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            tracker: self.tracker.clone(),
            store: self.store.clone(),
            edit: self.edit,
            form: self.form,
            loaded: self.loaded,
        }
    }
}

impl<A: AuthProvider, R: NoteRemote> AuthGate<A, R> {
    pub fn new(provider: Arc<A>, remote: Arc<R>) -> Self {
        let tracker = SessionTracker::new();
        let store = NoteStore::new(remote);
        let edit = EditSession::new();

        // The cache and the edit are dropped in the same call that changes the identity,
        // before anything can read or write under the previous user.
        let binding = store.binding();
        tracker.on_identity_change(Arc::new(move |user: Option<&str>, generation: u64| {
            binding.follow(user, generation);
            edit.cancel();
        }));

        Self {
            provider,
            tracker,
            store,
            edit,
            form: CredentialForm::new(),
            loaded: RwSignal::new(None),
        }
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn store(&self) -> &NoteStore<R> {
        &self.store
    }

    pub fn edit(&self) -> EditSession {
        self.edit
    }

    pub fn form(&self) -> CredentialForm {
        self.form
    }

    pub fn view(&self) -> GateView {
        GateView::from(&self.tracker.current())
    }

    /// Starts session tracking and mounts the notes for a restored session.
    pub async fn start(&self) -> Result<(), NoteError> {
        self.tracker.start(self.provider.as_ref()).await;
        self.sync_session().await
    }

    /// Tears down: stops listening and ignores whatever is still in flight.
    pub fn stop(&self) {
        self.tracker.stop();
        self.store.unbind();
        self.edit.cancel();
        self.loaded.set(None);
    }

    /// Loads the notes for the current identity once per binding.
    ///
    /// Rebinding already happened synchronously when the tracker changed identity; this
    /// only catches up a store that was unbound by [`stop`](Self::stop) and issues the
    /// initial refresh. Repeated calls for the same binding do nothing.
    pub async fn sync_session(&self) -> Result<(), NoteError> {
        let session = match self.tracker.current() {
            SessionState::Undetermined => return Ok(()),
            SessionState::SignedOut => {
                self.store.unbind();
                return Ok(());
            }
            SessionState::SignedIn(session) => session,
        };

        if !self.tracker.is_listening() {
            // Stopped: nothing may be rebound until the next start.
            return Ok(());
        }

        if self.store.bound_user().as_deref() != Some(session.user_id.as_str()) {
            self.store
                .binding()
                .follow(Some(session.user_id.as_str()), self.tracker.generation());
            self.edit.cancel();
        }

        let generation = self.store.generation();
        if self.loaded.get_untracked() == Some(generation) {
            return Ok(());
        }
        self.loaded.set(Some(generation));

        let result = self.store.refresh().await;
        if result.is_err() && self.loaded.get_untracked() == Some(generation) {
            // Let the next sync retry.
            self.loaded.set(None);
        }
        result
    }

    pub async fn login(&self) -> Result<(), AuthError> {
        let (email, password) = self.credentials();
        self.run(AuthAction::Login, async {
            self.provider.sign_in(&email, &password).await?;
            Ok::<_, AuthError>(Some(LOGGED_IN_NOTICE))
        })
        .await
    }

    pub async fn signup(&self) -> Result<(), AuthError> {
        let (email, password) = self.credentials();
        self.run(AuthAction::Signup, async {
            match self.provider.sign_up(&email, &password).await? {
                SignUpOutcome::PendingConfirmation => Ok::<_, AuthError>(Some(SIGNUP_CONFIRM_NOTICE)),
                SignUpOutcome::SignedIn(_) => Ok(Some(SIGNUP_DONE_NOTICE)),
            }
        })
        .await
    }

    pub async fn reset_password(&self) -> Result<(), AuthError> {
        let email = self.form.email.get_untracked();
        if is_blank(&email) {
            self.form.error.set(Some(AuthError::MissingEmail.to_string()));
            return Err(AuthError::MissingEmail);
        }
        self.run(AuthAction::ResetPassword, async {
            self.provider.request_password_reset(email.trim()).await?;
            Ok::<_, AuthError>(Some(RESET_SENT_NOTICE))
        })
        .await
    }

    /// Signs out through the provider; the view flips once its notification arrives.
    pub async fn logout(&self) {
        log::info!("gate: {}", AuthAction::Logout);
        self.provider.sign_out().await;
        self.form.password.set(String::new());
        self.form.notice.set(None);
        self.form.error.set(None);
    }

    fn credentials(&self) -> (String, String) {
        (
            self.form.email.get_untracked().trim().to_string(),
            self.form.password.get_untracked(),
        )
    }

    async fn run<F>(&self, action: AuthAction, fut: F) -> Result<(), AuthError>
    where
        F: Future<Output = Result<Option<&'static str>, AuthError>>,
    {
        self.form.busy.set(true);
        self.form.error.set(None);
        self.form.notice.set(None);

        let result = fut.await;
        match &result {
            Ok(notice) => {
                log::info!("gate: {action} succeeded");
                self.form.notice.set(notice.map(str::to_string));
            }
            Err(e) => {
                log::warn!("gate: {action} failed: {e}");
                self.form.error.set(Some(e.to_string()));
            }
        }

        self.form.busy.set(false);
        result.map(|_| ())
    }
}
