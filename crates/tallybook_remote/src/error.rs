//! Error types for remote document access.

use thiserror::Error;

use crate::document::Revision;

/// Failure below HTTP semantics: nothing usable came back.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Remote document errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Non-success status that has no more specific meaning
    #[error("HTTP {status} from {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// The store rejected a write because its revision moved on
    #[error("Revision conflict on {path}: write was based on {}", describe_revision(.expected))]
    Conflict {
        path: String,
        expected: Option<Revision>,
    },

    /// A revision exists but its content could not be read. Writing on top of
    /// it would replace the whole document.
    #[error("{path} exists at revision {revision} but its content is unavailable")]
    MissingContent { path: String, revision: Revision },

    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("Invalid document location: {0}")]
    InvalidLocation(String),

    #[error("Credentials unavailable: {0}")]
    Credentials(String),
}

impl RemoteError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict { .. })
    }

    pub(crate) fn invalid_response(url: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::InvalidResponse {
            url: url.into(),
            message: message.into(),
        }
    }
}

fn describe_revision(revision: &Option<Revision>) -> String {
    match revision {
        Some(revision) => format!("revision {}", revision),
        None => "no revision (create)".to_string(),
    }
}
