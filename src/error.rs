//! Error taxonomy shared by the session, notes and gate layers.
//!
//! Every error is returned to the call site that issued the operation; nothing here
//! is broadcast globally.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Unauthorized,
    Network,
    Http,
    /// The response did not have the expected shape.
    Malformed,
}

/// A failed read or write against the remote notes store.
///
/// The message is passed through unmodified so the view can show it verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn network(e: impl std::fmt::Display) -> Self {
        Self {
            kind: RemoteErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub fn malformed(e: impl std::fmt::Display) -> Self {
        Self {
            kind: RemoteErrorKind::Malformed,
            message: e.to_string(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            kind: RemoteErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    pub fn http(status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("Request failed ({status})")
        } else {
            body.to_string()
        };
        Self {
            kind: RemoteErrorKind::Http,
            message,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("Note content cannot be empty")]
    Validation,
    #[error("No signed-in user")]
    NoSession,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Credential rejection or a failed auth request.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The provider refused the request; carries its message verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Transport(String),
    #[error("Unexpected auth response: {0}")]
    Malformed(String),
    #[error("Enter your email first")]
    MissingEmail,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("No note is being edited")]
    NotEditing,
    #[error(transparent)]
    Save(#[from] NoteError),
}
