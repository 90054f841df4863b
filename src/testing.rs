//! In-memory stand-ins for the auth service and the notes table.

use crate::error::{AuthError, RemoteError};
use crate::models::{Note, NoteId, Session};
use crate::session::{
    AuthProvider, SessionChannel, SessionEvent, SessionListener, SignUpOutcome, Subscription,
};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn session_for(user: &str) -> Session {
    Session {
        user_id: user.to_string(),
        email: Some(format!("{user}@example.com")),
        access_token: format!("token-{user}"),
        refresh_token: None,
        expires_at: None,
    }
}

#[derive(Default)]
struct Table {
    rows: Vec<Note>,
    next_id: u64,
    clock: i64,
    calls: usize,
    fetch_calls: usize,
    fail_next: Option<RemoteError>,
    fetch_delays: VecDeque<Duration>,
    leak_from: Option<String>,
}

impl Table {
    fn take_failure(&mut self) -> Result<(), RemoteError> {
        self.calls += 1;
        match self.fail_next.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Notes table with owner filtering, controllable failures and fetch latency.
///
/// A fetch snapshots the rows when it is issued and answers after its delay, like a
/// server whose response is slow to arrive.
#[derive(Default)]
pub(crate) struct FakeRemote {
    table: Mutex<Table>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, id: &str, content: &str, owner: &str, created_at: DateTime<Utc>) {
        let mut t = self.table.lock().unwrap();
        t.rows.push(Note {
            id: NoteId::new(id),
            content: content.to_string(),
            owner_id: owner.to_string(),
            created_at,
        });
    }

    pub fn delete_row(&self, id: &str) {
        self.table
            .lock()
            .unwrap()
            .rows
            .retain(|n| n.id.as_str() != id);
    }

    pub fn rows_for(&self, owner: &str) -> Vec<Note> {
        let t = self.table.lock().unwrap();
        let mut rows: Vec<Note> = t
            .rows
            .iter()
            .filter(|n| n.owner_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    pub fn fail_next(&self, e: RemoteError) {
        self.table.lock().unwrap().fail_next = Some(e);
    }

    pub fn delay_fetches(&self, delays: &[Duration]) {
        self.table.lock().unwrap().fetch_delays = delays.iter().copied().collect();
    }

    /// Simulates a store whose row-level security lets `owner`'s rows through.
    pub fn leak_rows_from(&self, owner: &str) {
        self.table.lock().unwrap().leak_from = Some(owner.to_string());
    }

    pub fn calls(&self) -> usize {
        self.table.lock().unwrap().calls
    }

    pub fn fetch_calls(&self) -> usize {
        self.table.lock().unwrap().fetch_calls
    }
}

impl crate::notes::NoteRemote for FakeRemote {
    async fn fetch_notes(&self, user_id: &str) -> Result<Vec<Note>, RemoteError> {
        let (snapshot, delay) = {
            let mut t = self.table.lock().unwrap();
            t.fetch_calls += 1;
            t.take_failure()?;
            let leak = t.leak_from.clone();
            let mut rows: Vec<Note> = t
                .rows
                .iter()
                .filter(|n| n.owner_id == user_id || Some(&n.owner_id) == leak.as_ref())
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            (rows, t.fetch_delays.pop_front())
        };
        if let Some(delay) = delay.filter(|d| !d.is_zero()) {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn insert_note(&self, user_id: &str, content: &str) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        let mut t = self.table.lock().unwrap();
        t.take_failure()?;
        t.next_id += 1;
        t.clock += 1;
        let note = Note {
            id: NoteId::new(format!("n{}", t.next_id)),
            content: content.to_string(),
            owner_id: user_id.to_string(),
            created_at: ts(1_000 + t.clock),
        };
        t.rows.push(note);
        Ok(())
    }

    async fn update_note(&self, id: &NoteId, content: &str) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        let mut t = self.table.lock().unwrap();
        t.take_failure()?;
        if let Some(row) = t.rows.iter_mut().find(|n| &n.id == id) {
            row.content = content.to_string();
        }
        Ok(())
    }

    async fn delete_note(&self, id: &NoteId) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        let mut t = self.table.lock().unwrap();
        t.take_failure()?;
        t.rows.retain(|n| &n.id != id);
        Ok(())
    }
}

#[derive(Default)]
struct Accounts {
    /// email -> (password, user id, confirmed)
    users: HashMap<String, (String, String, bool)>,
    stored: Option<Session>,
    require_confirmation: bool,
    current_session_calls: usize,
    reset_requests: Vec<String>,
    sign_outs: usize,
}

/// Auth service that keeps accounts in memory and announces changes like the real one.
#[derive(Default)]
pub(crate) struct FakeAuth {
    accounts: Mutex<Accounts>,
    channel: SessionChannel,
}

impl FakeAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, email: &str, password: &str, user_id: &str) -> Self {
        self.accounts.lock().unwrap().users.insert(
            email.to_string(),
            (password.to_string(), user_id.to_string(), true),
        );
        self
    }

    pub fn requiring_confirmation(self) -> Self {
        self.accounts.lock().unwrap().require_confirmation = true;
        self
    }

    /// A session left over from a previous visit.
    pub fn restore(&self, session: Session) {
        self.accounts.lock().unwrap().stored = Some(session);
    }

    /// Emits an event as if the provider had observed it (expiry, another tab).
    pub fn emit(&self, event: SessionEvent) {
        self.accounts.lock().unwrap().stored = event.session().cloned();
        self.channel.emit(&event);
    }

    pub fn listener_count(&self) -> usize {
        self.channel.listener_count()
    }

    pub fn current_session_calls(&self) -> usize {
        self.accounts.lock().unwrap().current_session_calls
    }

    pub fn reset_requests(&self) -> Vec<String> {
        self.accounts.lock().unwrap().reset_requests.clone()
    }

    pub fn sign_outs(&self) -> usize {
        self.accounts.lock().unwrap().sign_outs
    }
}

impl AuthProvider for FakeAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.users.get(email) {
                Some((pw, user_id, true)) if pw == password => session_for(user_id),
                Some((_, _, false)) => {
                    return Err(AuthError::Rejected("Email not confirmed".to_string()))
                }
                _ => return Err(AuthError::Rejected("Invalid login credentials".to_string())),
            }
        };
        self.emit(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let (user_id, confirm) = {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.users.contains_key(email) {
                return Err(AuthError::Rejected("User already registered".to_string()));
            }
            if password.len() < 6 {
                return Err(AuthError::Rejected(
                    "Password should be at least 6 characters".to_string(),
                ));
            }
            let user_id = format!("user-{}", accounts.users.len() + 1);
            let confirm = accounts.require_confirmation;
            accounts.users.insert(
                email.to_string(),
                (password.to_string(), user_id.clone(), !confirm),
            );
            (user_id, confirm)
        };
        if confirm {
            return Ok(SignUpOutcome::PendingConfirmation);
        }
        let session = session_for(&user_id);
        self.emit(SessionEvent::SignedIn(session.clone()));
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let mut accounts = self.accounts.lock().unwrap();
        if !email.contains('@') {
            return Err(AuthError::Rejected("Unable to validate email address".to_string()));
        }
        accounts.reset_requests.push(email.to_string());
        Ok(())
    }

    async fn sign_out(&self) {
        self.accounts.lock().unwrap().sign_outs += 1;
        self.emit(SessionEvent::SignedOut);
    }

    async fn get_current_session(&self) -> Option<Session> {
        let mut accounts = self.accounts.lock().unwrap();
        accounts.current_session_calls += 1;
        accounts.stored.clone()
    }

    fn on_session_change(&self, listener: SessionListener) -> Subscription {
        self.channel.subscribe(listener)
    }
}
