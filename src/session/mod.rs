//! Authentication session plumbing.
//!
//! [`AuthProvider`] is the boundary to the external auth service. Providers announce
//! session changes through a [`SessionChannel`]; consumers hold a [`Subscription`]
//! that deregisters its listener when dropped.

mod tracker;

pub use tracker::{IdentityObserver, SessionState, SessionTracker};

use crate::error::AuthError;
use crate::models::Session;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
    /// The provider found the session no longer valid (expired or revoked).
    Expired,
}

impl SessionEvent {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionEvent::SignedIn(s) => Some(s),
            SessionEvent::SignedOut | SessionEvent::Expired => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(Session),
    /// Account created; the user has to confirm their email before signing in.
    PendingConfirmation,
}

pub type SessionListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Boundary to the external authentication service.
pub trait AuthProvider {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, AuthError>>;

    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<SignUpOutcome, AuthError>>;

    fn request_password_reset(&self, email: &str) -> impl Future<Output = Result<(), AuthError>>;

    fn sign_out(&self) -> impl Future<Output = ()>;

    fn get_current_session(&self) -> impl Future<Output = Option<Session>>;

    fn on_session_change(&self, listener: SessionListener) -> Subscription;
}

#[derive(Default)]
struct ChannelInner {
    next_id: u64,
    listeners: Vec<(u64, SessionListener)>,
}

/// Fan-out of session events, delivered synchronously in emission order.
#[derive(Clone, Default)]
pub struct SessionChannel {
    inner: Arc<Mutex<ChannelInner>>,
}

impl SessionChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: SessionListener) -> Subscription {
        let id = match self.inner.lock() {
            Ok(mut inner) => {
                inner.next_id += 1;
                let id = inner.next_id;
                inner.listeners.push((id, listener));
                id
            }
            Err(_) => 0,
        };
        Subscription {
            id,
            channel: Arc::downgrade(&self.inner),
        }
    }

    pub fn emit(&self, event: &SessionEvent) {
        // Listeners run outside the lock so they may subscribe or drop subscriptions.
        let listeners: Vec<SessionListener> = match self.inner.lock() {
            Ok(inner) => inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().map(|i| i.listeners.len()).unwrap_or(0)
    }
}

/// Keeps a listener registered; dropping it deregisters.
#[must_use = "dropping a Subscription deregisters its listener"]
pub struct Subscription {
    id: u64,
    channel: Weak<Mutex<ChannelInner>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.channel.upgrade() {
            if let Ok(mut inner) = inner.lock() {
                inner.listeners.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
