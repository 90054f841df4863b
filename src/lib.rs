//! Personal notes client: email/password auth against a hosted backend and a
//! per-user list of short text notes with add, inline edit and delete.
//!
//! The reactive core ([`SessionTracker`], [`NoteStore`], [`EditSession`], [`AuthGate`])
//! is plain Rust over Leptos signals and runs natively under test; the Leptos views in
//! `app`/`pages` render it in the browser.

mod api;
mod app;
mod components;
mod config;
mod error;
mod gate;
mod models;
mod notes;
mod pages;
mod session;
mod state;
mod storage;
mod util;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod testing;

pub use api::ApiClient;
pub use app::App;
pub use error::{AuthError, EditError, NoteError, RemoteError, RemoteErrorKind};
pub use gate::{AuthAction, AuthGate, CredentialForm, GateView};
pub use models::{Note, NoteId, Session};
pub use notes::{
    DirtySignal, DirtyTicket, EditSession, EditState, NoteBinding, NoteCommand, NoteRemote,
    NoteStore,
};
pub use session::{
    AuthProvider, IdentityObserver, SessionChannel, SessionEvent, SessionListener, SessionState,
    SessionTracker, SignUpOutcome, Subscription,
};

use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    #[cfg(target_arch = "wasm32")]
    wasm_logger::init(wasm_logger::Config::new(log::Level::Debug));
    mount_to_body(App);
}
