/// Milliseconds since the unix epoch.
///
/// Uses the browser clock on wasm and the system clock on native builds (tests).
pub(crate) fn now_ms() -> i64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now().round() as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

pub(crate) fn now_secs() -> i64 {
    now_ms() / 1000
}

/// True when the text has no visible characters.
pub(crate) fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
