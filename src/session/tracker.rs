use super::{AuthProvider, SessionEvent, SessionListener, Subscription};
use crate::models::Session;
use leptos::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// The initial session fetch has not resolved yet.
    #[default]
    Undetermined,
    SignedOut,
    SignedIn(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::SignedIn(s) => Some(s),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session().map(|s| s.user_id.as_str())
    }

    pub fn is_determined(&self) -> bool {
        !matches!(self, SessionState::Undetermined)
    }
}

/// Called synchronously with the new user id (or `None` on sign-out) and the tracker
/// generation it was assigned, before the new state becomes observable.
pub type IdentityObserver = Arc<dyn Fn(Option<&str>, u64) + Send + Sync>;

type Observers = Arc<Mutex<Vec<IdentityObserver>>>;

/// Owns the client's view of the authentication session.
///
/// Constructed once at the composition root and shared by clone; there is no ambient
/// session lookup anywhere else.
#[derive(Clone)]
pub struct SessionTracker {
    state: RwSignal<SessionState>,
    /// Bumped every time the signed-in identity changes, sign-out included.
    generation: RwSignal<u64>,
    observers: Observers,
    started: Arc<AtomicBool>,
    subscription: Arc<Mutex<Option<Subscription>>>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            state: RwSignal::new(SessionState::Undetermined),
            generation: RwSignal::new(0),
            observers: Arc::new(Mutex::new(Vec::new())),
            started: Arc::new(AtomicBool::new(false)),
            subscription: Arc::new(Mutex::new(None)),
        }
    }

    /// Fetches the current session once, then follows provider notifications.
    ///
    /// Calling it again while started is a no-op.
    pub async fn start<A: AuthProvider>(&self, provider: &A) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let initial = provider.get_current_session().await;

        // stop() may have run while the fetch was pending.
        if !self.started.load(Ordering::SeqCst) {
            return;
        }
        Self::apply(self.state, self.generation, &self.observers, initial);

        let state = self.state;
        let generation = self.generation;
        let observers = Arc::clone(&self.observers);
        let listener: SessionListener = Arc::new(move |event: &SessionEvent| {
            Self::apply(state, generation, &observers, event.session().cloned());
        });
        let subscription = provider.on_session_change(listener);

        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(subscription);
        }
    }

    /// Registers `observer` for every identity change from here on.
    pub fn on_identity_change(&self, observer: IdentityObserver) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.push(observer);
        }
    }

    /// Deregisters the change listener. The last known state is kept.
    pub fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
        let subscription = self.subscription.lock().ok().and_then(|mut s| s.take());
        if subscription.is_some() {
            log::debug!("session tracker stopped");
        }
    }

    pub fn current(&self) -> SessionState {
        self.state.get_untracked()
    }

    pub fn user_id(&self) -> Option<String> {
        self.state
            .with_untracked(|s| s.user_id().map(str::to_string))
    }

    pub fn generation(&self) -> u64 {
        self.generation.get_untracked()
    }

    /// Reactive handle for views and effects.
    pub fn watch(&self) -> ReadSignal<SessionState> {
        self.state.read_only()
    }

    pub fn is_listening(&self) -> bool {
        self.subscription
            .lock()
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    fn apply(
        state: RwSignal<SessionState>,
        generation: RwSignal<u64>,
        observers: &Observers,
        next: Option<Session>,
    ) {
        let previous_user = state.with_untracked(|s| s.user_id().map(str::to_string));
        let next_user = next.as_ref().map(|s| s.user_id.clone());

        if previous_user != next_user {
            generation.update(|g| *g += 1);
            match &next_user {
                Some(user) => log::info!("session: signed in as {user}"),
                None => log::info!("session: signed out"),
            }

            // Run outside the lock so an observer may register another.
            let current = observers.lock().map(|o| o.clone()).unwrap_or_default();
            let g = generation.get_untracked();
            for observer in current {
                observer(next_user.as_deref(), g);
            }
        }

        state.set(match next {
            Some(session) => SessionState::SignedIn(session),
            None => SessionState::SignedOut,
        });
    }
}
