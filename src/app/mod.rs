use crate::pages::AuthGatePage;
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::sync::Arc;

#[component]
pub fn App() -> impl IntoView {
    let state = AppState::new();
    provide_context(AppContext(state.clone()));

    let gate = state.gate.clone();
    spawn_local({
        let gate = gate.clone();
        let client = Arc::clone(&state.api_client);
        async move {
            if let Err(e) = gate.start().await {
                log::error!("initial notes load failed: {e}");
            }
            match client.check_connection().await {
                Ok(rows) => log::info!("backend reachable ({rows} row(s) visible)"),
                Err(e) => log::warn!("backend connection check failed: {e}"),
            }
        }
    });

    // The store is already rebound when the session changes; this loads the notes for
    // each new binding.
    let session = gate.tracker().watch();
    Effect::new({
        let gate = gate.clone();
        move |_| {
            if !session.with(|s| s.is_determined()) {
                return;
            }
            let gate = gate.clone();
            spawn_local(async move {
                if let Err(e) = gate.sync_session().await {
                    log::error!("loading notes failed: {e}");
                }
            });
        }
    });

    on_cleanup(move || gate.stop());

    view! { <AuthGatePage /> }
}
