use crate::models::Session;
use serde::{Deserialize, Serialize};

pub(crate) const SESSION_KEY: &str = "pocketnotes_session";

// Browser builds persist to localStorage. Native builds (unit tests) keep a per-thread
// map so each test starts from an empty store.
#[cfg(target_arch = "wasm32")]
fn read_item(key: &str) -> Option<String> {
    let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten())?;
    storage.get_item(key).ok().flatten()
}

#[cfg(target_arch = "wasm32")]
fn write_item(key: &str, value: &str) {
    if let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) {
        let _ = storage.set_item(key, value);
    }
}

#[cfg(target_arch = "wasm32")]
fn remove_item(key: &str) {
    if let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) {
        let _ = storage.remove_item(key);
    }
}

#[cfg(not(target_arch = "wasm32"))]
thread_local! {
    static MEMORY: std::cell::RefCell<std::collections::HashMap<String, String>> =
        std::cell::RefCell::new(std::collections::HashMap::new());
}

#[cfg(not(target_arch = "wasm32"))]
fn read_item(key: &str) -> Option<String> {
    MEMORY.with(|m| m.borrow().get(key).cloned())
}

#[cfg(not(target_arch = "wasm32"))]
fn write_item(key: &str, value: &str) {
    MEMORY.with(|m| {
        m.borrow_mut().insert(key.to_string(), value.to_string());
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn remove_item(key: &str) {
    MEMORY.with(|m| {
        m.borrow_mut().remove(key);
    });
}

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(key: &str) -> Option<T> {
    let json = read_item(key)?;
    match serde_json::from_str(&json) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("discarding unreadable `{key}` from storage: {e}");
            remove_item(key);
            None
        }
    }
}

pub(crate) fn save_json_to_storage<T: Serialize>(key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => write_item(key, &json),
        Err(e) => log::error!("failed to serialize `{key}`: {e}"),
    }
}

pub(crate) fn load_session_from_storage() -> Option<Session> {
    load_json_from_storage(SESSION_KEY)
}

pub(crate) fn save_session_to_storage(session: &Session) {
    save_json_to_storage(SESSION_KEY, session);
}

pub(crate) fn clear_session_storage() {
    remove_item(SESSION_KEY);
}

#[cfg(test)]
pub(crate) fn write_raw_for_test(key: &str, value: &str) {
    write_item(key, value);
}
