//! Document identity, revision markers, and the store contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RemoteError;

/// Opaque marker for one stored version of a document (a blob SHA on GitHub).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content and revision observed together.
///
/// `revision` is `None` when the document does not exist yet; `content` is
/// then empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub content: String,
    pub revision: Option<Revision>,
}

/// Where a document lives: repository coordinates plus a path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentLocation {
    pub owner: String,
    pub repo: String,
    pub path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

impl DocumentLocation {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            path: path.into(),
            branch: default_branch(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Path split into non-empty segments.
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|segment| !segment.is_empty())
    }

    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.owner.trim().is_empty() {
            return Err(RemoteError::InvalidLocation("owner is empty".to_string()));
        }
        if self.repo.trim().is_empty() {
            return Err(RemoteError::InvalidLocation("repo is empty".to_string()));
        }
        if self.path_segments().next().is_none() {
            return Err(RemoteError::InvalidLocation("path is empty".to_string()));
        }
        if self.branch.trim().is_empty() {
            return Err(RemoteError::InvalidLocation("branch is empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}:{}", self.owner, self.repo, self.branch, self.path)
    }
}

/// Key → {content, revision} store with revision-checked writes.
///
/// `write` must fail with [`RemoteError::Conflict`] unless `revision` equals
/// the store's current revision at commit time, or both are absent (create).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Current raw content, or `None` if the raw host has no such document.
    ///
    /// `None` is not proof the document is absent: a raw host can lag behind
    /// commits or refuse to serve private repositories.
    async fn fetch_raw(&self, location: &DocumentLocation) -> Result<Option<String>, RemoteError>;

    /// Current revision, or `None` if the document does not exist.
    async fn fetch_revision(
        &self,
        location: &DocumentLocation,
    ) -> Result<Option<Revision>, RemoteError>;

    /// Replace the content, conditioned on `revision`. Returns the new revision.
    async fn write(
        &self,
        location: &DocumentLocation,
        content: &str,
        revision: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, RemoteError>;

    /// Content and revision together.
    ///
    /// The default issues the two reads independently, so a commit landing
    /// between them goes unnoticed. Stores that can answer both in one call
    /// should override this.
    async fn fetch_snapshot(&self, location: &DocumentLocation) -> Result<Snapshot, RemoteError> {
        let content = self.fetch_raw(location).await?;
        let revision = self.fetch_revision(location).await?;
        match (content, revision) {
            (None, Some(revision)) => Err(RemoteError::MissingContent {
                path: location.path.clone(),
                revision,
            }),
            (content, revision) => Ok(Snapshot {
                content: content.unwrap_or_default(),
                revision,
            }),
        }
    }
}
