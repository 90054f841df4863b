use crate::error::RemoteError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated identity bound to the client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Session {
    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now_secs)
    }
}

/// Server-assigned note identifier. Opaque to the client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub content: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

/// A `notes` row exactly as the store returns it.
///
/// Every field is optional here so a missing column is reported as a malformed
/// response instead of a generic decode failure.
#[derive(Deserialize, Clone, Debug, Default)]
pub(crate) struct NoteRow {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Tables keyed by `uuid` return strings, `bigserial` tables return numbers.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum RawId {
    Text(String),
    Number(i64),
}

impl TryFrom<NoteRow> for Note {
    type Error = RemoteError;

    fn try_from(row: NoteRow) -> Result<Self, Self::Error> {
        let id = match row.id {
            Some(RawId::Text(s)) if !s.trim().is_empty() => s,
            Some(RawId::Number(n)) => n.to_string(),
            _ => return Err(RemoteError::malformed("note row is missing `id`")),
        };
        let content = row
            .content
            .ok_or_else(|| RemoteError::malformed(format!("note {id} is missing `content`")))?;
        let owner_id = row
            .user_id
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| RemoteError::malformed(format!("note {id} is missing `user_id`")))?;
        let created_at = row
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or_else(|| {
                RemoteError::malformed(format!("note {id} has no valid `created_at`"))
            })?;

        Ok(Note {
            id: NoteId(id),
            content,
            owner_id,
            created_at,
        })
    }
}

/// Accepts `timestamptz` (RFC 3339) and zone-less `timestamp` columns, the latter read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Token response from the auth service (sign-in, or sign-up without confirmation).
#[derive(Deserialize, Clone, Debug)]
pub(crate) struct SessionPayload {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: UserPayload,
}

#[derive(Deserialize, Clone, Debug)]
pub(crate) struct UserPayload {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl SessionPayload {
    pub fn into_session(self, now_secs: i64) -> Result<Session, String> {
        if self.access_token.trim().is_empty() {
            return Err("empty access token".to_string());
        }
        if self.user.id.trim().is_empty() {
            return Err("empty user id".to_string());
        }
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now_secs + secs));

        Ok(Session {
            user_id: self.user.id,
            email: self.user.email,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}
