//! Error types for the record store.

use std::fmt;
use std::path::PathBuf;

use tallybook_remote::RemoteError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Step of a read-modify-write cycle that touches the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendPhase {
    ReadingContent,
    ReadingRevision,
    ReadingSnapshot,
    Writing,
}

impl fmt::Display for AppendPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppendPhase::ReadingContent => "reading content",
            AppendPhase::ReadingRevision => "reading revision",
            AppendPhase::ReadingSnapshot => "reading snapshot",
            AppendPhase::Writing => "writing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport or protocol failure; retrying the same call may succeed.
    #[error("Remote store failed while {phase} {location}: {source}")]
    Remote {
        phase: AppendPhase,
        location: String,
        #[source]
        source: RemoteError,
    },

    /// Another writer committed first. Re-run the whole cycle to retry.
    #[error("Write to {location} conflicted after {attempts} attempt(s)")]
    Conflict {
        location: String,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read config file {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Phase that failed, for remote errors.
    pub fn phase(&self) -> Option<AppendPhase> {
        match self {
            StoreError::Remote { phase, .. } => Some(*phase),
            StoreError::Conflict { .. } => Some(AppendPhase::Writing),
            _ => None,
        }
    }
}
