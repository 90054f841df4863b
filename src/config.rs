use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_API_URL: &str = "http://localhost:54321";
pub(crate) const DEFAULT_RESET_REDIRECT_URL: &str = "http://localhost:3000/reset-password";

/// Runtime configuration injected by the host page as `window.ENV`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    pub api_url: String,
    /// Public (anon) key sent as `apikey` on every request.
    pub anon_key: String,
    /// Where the password-reset email link lands.
    pub reset_redirect_url: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            anon_key: String::new(),
            reset_redirect_url: DEFAULT_RESET_REDIRECT_URL.to_string(),
        }
    }
}

impl EnvConfig {
    /// Reads `window.ENV`, falling back to defaults for anything missing.
    ///
    /// Both the upper-case keys (`API_URL`, `ANON_KEY`, `RESET_REDIRECT_URL`) and the
    /// lower-case spellings are accepted; upper-case wins.
    pub fn load() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            let mut config = Self::default();
            let Some(env) = web_sys::window()
                .and_then(|w| w.get("ENV"))
                .filter(|env| !env.is_undefined() && env.is_object())
            else {
                return config;
            };

            let read = |keys: &[&str]| {
                keys.iter().find_map(|k| {
                    js_sys::Reflect::get(&env, &(*k).into())
                        .ok()
                        .and_then(|v| v.as_string())
                })
            };

            if let Some(url) = read(&["API_URL", "api_url"]) {
                config.api_url = url;
            }
            if let Some(key) = read(&["ANON_KEY", "anon_key"]) {
                config.anon_key = key;
            }
            if let Some(url) = read(&["RESET_REDIRECT_URL", "reset_redirect_url"]) {
                config.reset_redirect_url = url;
            }
            config.normalized()
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            Self::default()
        }
    }

    /// Strips trailing slashes so paths can be appended with `format!`.
    pub fn normalized(mut self) -> Self {
        while self.api_url.ends_with('/') {
            self.api_url.pop();
        }
        self
    }
}
