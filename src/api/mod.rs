//! HTTP boundary to the hosted backend: a GoTrue-style auth service under
//! `/auth/v1` and a PostgREST-style table endpoint under `/rest/v1`.
//!
//! [`ApiClient`] implements both [`crate::session::AuthProvider`] and
//! [`crate::notes::NoteRemote`], so one client instance is shared by the tracker and
//! the store.

mod auth;
mod notes;

use crate::config::EnvConfig;
use crate::error::RemoteError;
use crate::models::Session;
use crate::session::{SessionChannel, SessionEvent};
use crate::storage::clear_session_storage;
use serde::Deserialize;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct ApiClient {
    pub(crate) base_url: String,
    anon_key: String,
    reset_redirect_url: String,
    http: reqwest::Client,
    session: Arc<Mutex<Option<Session>>>,
    channel: SessionChannel,
}

impl ApiClient {
    pub(crate) fn from_config(config: EnvConfig) -> Self {
        let config = config.normalized();
        Self {
            base_url: config.api_url,
            anon_key: config.anon_key,
            reset_redirect_url: config.reset_redirect_url,
            http: reqwest::Client::new(),
            session: Arc::new(Mutex::new(None)),
            channel: SessionChannel::new(),
        }
    }

    /// Client configured from `window.ENV` (defaults on native builds).
    pub fn load() -> Self {
        Self::from_config(EnvConfig::load())
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn session(&self) -> Option<Session> {
        self.session.lock().ok().and_then(|s| s.clone())
    }

    pub(crate) fn set_session(&self, session: Option<Session>) {
        if let Ok(mut slot) = self.session.lock() {
            *slot = session;
        }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.channel.emit(&event);
    }

    /// Adds `apikey` and a bearer token: the user's access token when signed in,
    /// otherwise the anon key.
    pub(crate) fn with_auth_headers(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self
            .session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.anon_key.clone());
        req.header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    /// Sends a table request, mapping transport and status failures to [`RemoteError`].
    ///
    /// A 401 means the access token is no longer accepted: the session is dropped and
    /// subscribers are told it expired.
    pub(crate) async fn send_rest(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RemoteError> {
        let res = self
            .with_auth_headers(req)
            .send()
            .await
            .map_err(RemoteError::network)?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        if status.as_u16() == 401 {
            self.expire_session();
            return Err(RemoteError::unauthorized());
        }
        let body = res.text().await.unwrap_or_default();
        Err(RemoteError::http(status.as_u16(), &error_message(&body)))
    }

    fn expire_session(&self) {
        if self.session().is_none() {
            return;
        }
        log::info!("api: access token rejected, dropping session");
        self.set_session(None);
        clear_session_storage();
        self.emit(SessionEvent::Expired);
    }

    /// Issues a minimal read to confirm the backend is reachable.
    ///
    /// Returns how many rows came back (0 or 1).
    pub async fn check_connection(&self) -> Result<usize, RemoteError> {
        let req = self
            .http
            .get(self.url("/rest/v1/notes"))
            .query(&[("select", "id"), ("limit", "1")]);
        let rows: Vec<serde_json::Value> = self
            .send_rest(req)
            .await?
            .json()
            .await
            .map_err(RemoteError::malformed)?;
        Ok(rows.len())
    }
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Picks the human-readable message out of an error body, or returns it as is.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| body.to_string())
}
