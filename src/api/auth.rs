use super::{error_message, ApiClient};
use crate::error::AuthError;
use crate::models::{Session, SessionPayload};
use crate::session::{AuthProvider, SessionEvent, SessionListener, SignUpOutcome, Subscription};
use crate::storage::{clear_session_storage, load_session_from_storage, save_session_to_storage};
use crate::util::now_secs;
use serde::Serialize;

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

impl ApiClient {
    async fn auth_request(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, AuthError> {
        let res = self
            .with_auth_headers(req)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if !status.is_success() {
            let message = error_message(&body);
            if message.trim().is_empty() {
                return Err(AuthError::Rejected(format!("Request failed ({status})")));
            }
            return Err(AuthError::Rejected(message));
        }
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| AuthError::Malformed(e.to_string()))
    }

    fn adopt(&self, payload: serde_json::Value) -> Result<Session, AuthError> {
        let session = serde_json::from_value::<SessionPayload>(payload)
            .map_err(|e| AuthError::Malformed(e.to_string()))?
            .into_session(now_secs())
            .map_err(AuthError::Malformed)?;
        self.set_session(Some(session.clone()));
        save_session_to_storage(&session);
        Ok(session)
    }

    fn establish(&self, payload: serde_json::Value) -> Result<Session, AuthError> {
        let session = self.adopt(payload)?;
        log::info!("api: signed in as {}", session.user_id);
        self.emit(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Trades a refresh token for a new session. Persisted, but not announced.
    ///
    /// Must run without a session in memory so the request carries the anon key rather
    /// than the expired access token.
    async fn renew(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let req = self
            .http
            .post(self.url("/auth/v1/token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshRequest { refresh_token });
        let payload = self.auth_request(req).await?;
        let session = self.adopt(payload)?;
        log::info!("api: session renewed for {}", session.user_id);
        Ok(session)
    }
}

impl AuthProvider for ApiClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let req = self
            .http
            .post(self.url("/auth/v1/token"))
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password });
        let payload = self.auth_request(req).await?;
        self.establish(payload)
    }

    /// A response without an access token means the account still needs its email
    /// confirmed.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let req = self
            .http
            .post(self.url("/auth/v1/signup"))
            .json(&Credentials { email, password });
        let payload = self.auth_request(req).await?;

        let has_token = payload
            .get("access_token")
            .and_then(|t| t.as_str())
            .is_some_and(|t| !t.is_empty());
        if !has_token {
            log::info!("api: signup for {email} awaits confirmation");
            return Ok(SignUpOutcome::PendingConfirmation);
        }
        self.establish(payload).map(SignUpOutcome::SignedIn)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let req = self
            .http
            .post(self.url("/auth/v1/recover"))
            .query(&[("redirect_to", self.reset_redirect_url.as_str())])
            .json(&RecoverRequest { email });
        self.auth_request(req).await?;
        Ok(())
    }

    /// Always ends signed out locally, even if the server call fails.
    async fn sign_out(&self) {
        if self.session().is_some() {
            let req = self.http.post(self.url("/auth/v1/logout"));
            if let Err(e) = self.auth_request(req).await {
                log::warn!("api: logout request failed: {e}");
            }
        }
        self.set_session(None);
        clear_session_storage();
        log::info!("api: signed out");
        self.emit(SessionEvent::SignedOut);
    }

    /// The in-memory session, else one persisted by a previous visit. An expired
    /// session is renewed with its refresh token when it has one, otherwise discarded.
    async fn get_current_session(&self) -> Option<Session> {
        let session = self.session().or_else(load_session_from_storage)?;
        if !session.is_expired(now_secs()) {
            self.set_session(Some(session.clone()));
            return Some(session);
        }

        self.set_session(None);
        if let Some(token) = session.refresh_token.as_deref() {
            match self.renew(token).await {
                Ok(renewed) => return Some(renewed),
                Err(e) => log::warn!("api: session renewal failed: {e}"),
            }
        }
        log::info!("api: stored session expired");
        clear_session_storage();
        None
    }

    fn on_session_change(&self, listener: SessionListener) -> Subscription {
        self.channel.subscribe(listener)
    }
}
