//! In-memory document store
//!
//! Applies the same conditional-write rules as the GitHub contents API without
//! any network. Used by tests and by embedders that want a local store.
//!
//! Test hooks:
//! - [`MemoryDocumentStore::commit_before_next_write`] lands a competing commit
//!   between a caller's reads and its write
//! - [`MemoryDocumentStore::set_offline`] turns every call into a transport error
//! - [`MemoryDocumentStore::set_revision_reads_failing`] fails only revision reads
//! - [`MemoryDocumentStore::set_raw_hidden`] makes raw reads report the document
//!   missing, as a lagging raw host does
//! - [`MemoryDocumentStore::writes`] and [`MemoryDocumentStore::read_counts`]
//!   expose what callers did

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::document::{DocumentLocation, DocumentStore, Revision, Snapshot};
use crate::error::{RemoteError, TransportError};

/// One call to [`DocumentStore::write`], accepted or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub location: DocumentLocation,
    pub content: String,
    pub revision: Option<Revision>,
    pub message: String,
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadCounts {
    pub raw: usize,
    pub revision: usize,
    pub snapshot: usize,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    content: String,
    revision: Revision,
}

#[derive(Debug, Default)]
struct State {
    documents: HashMap<DocumentLocation, StoredDocument>,
    pending_commits: VecDeque<(DocumentLocation, String)>,
    writes: Vec<WriteCall>,
    reads: ReadCounts,
    commits: u64,
    offline: bool,
    revision_reads_failing: bool,
    raw_hidden: bool,
}

impl State {
    fn commit(&mut self, location: &DocumentLocation, content: String) -> Revision {
        self.commits += 1;
        let revision = revision_for(self.commits, &content);
        self.documents.insert(
            location.clone(),
            StoredDocument {
                content,
                revision: revision.clone(),
            },
        );
        revision
    }

    fn check_online(&self, location: &DocumentLocation) -> Result<(), RemoteError> {
        if self.offline {
            return Err(unreachable_error(location));
        }
        Ok(())
    }
}

/// Shared handle; clones see the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<State>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document.
    pub fn with_document(self, location: &DocumentLocation, content: impl Into<String>) -> Self {
        self.put(location, content);
        self
    }

    /// Commit unconditionally, as another writer would.
    pub fn put(&self, location: &DocumentLocation, content: impl Into<String>) -> Revision {
        self.lock().commit(location, content.into())
    }

    pub fn content(&self, location: &DocumentLocation) -> Option<String> {
        self.lock()
            .documents
            .get(location)
            .map(|doc| doc.content.clone())
    }

    pub fn revision(&self, location: &DocumentLocation) -> Option<Revision> {
        self.lock()
            .documents
            .get(location)
            .map(|doc| doc.revision.clone())
    }

    /// Queue a competing commit applied just before the next write to `location`.
    pub fn commit_before_next_write(&self, location: &DocumentLocation, content: impl Into<String>) {
        self.lock()
            .pending_commits
            .push_back((location.clone(), content.into()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn set_revision_reads_failing(&self, failing: bool) {
        self.lock().revision_reads_failing = failing;
    }

    pub fn set_raw_hidden(&self, hidden: bool) {
        self.lock().raw_hidden = hidden;
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.lock().writes.clone()
    }

    pub fn read_counts(&self) -> ReadCounts {
        self.lock().reads
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn fetch_raw(&self, location: &DocumentLocation) -> Result<Option<String>, RemoteError> {
        let mut state = self.lock();
        state.check_online(location)?;
        state.reads.raw += 1;
        if state.raw_hidden {
            return Ok(None);
        }
        Ok(state.documents.get(location).map(|doc| doc.content.clone()))
    }

    async fn fetch_revision(
        &self,
        location: &DocumentLocation,
    ) -> Result<Option<Revision>, RemoteError> {
        let mut state = self.lock();
        state.check_online(location)?;
        if state.revision_reads_failing {
            return Err(unreachable_error(location));
        }
        state.reads.revision += 1;
        Ok(state.documents.get(location).map(|doc| doc.revision.clone()))
    }

    async fn write(
        &self,
        location: &DocumentLocation,
        content: &str,
        revision: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, RemoteError> {
        let mut state = self.lock();
        state.check_online(location)?;

        if let Some(index) = state
            .pending_commits
            .iter()
            .position(|(pending, _)| pending == location)
        {
            if let Some((pending_location, pending_content)) = state.pending_commits.remove(index) {
                let competing = state.commit(&pending_location, pending_content);
                debug!("Competing commit landed on {} at {}", location, competing);
            }
        }

        let current = state.documents.get(location).map(|doc| &doc.revision);
        let accepted = current == revision;

        state.writes.push(WriteCall {
            location: location.clone(),
            content: content.to_string(),
            revision: revision.cloned(),
            message: message.to_string(),
            accepted,
        });

        if !accepted {
            return Err(RemoteError::Conflict {
                path: location.path.clone(),
                expected: revision.cloned(),
            });
        }

        Ok(state.commit(location, content.to_string()))
    }

    async fn fetch_snapshot(&self, location: &DocumentLocation) -> Result<Snapshot, RemoteError> {
        let mut state = self.lock();
        state.check_online(location)?;
        state.reads.snapshot += 1;
        Ok(match state.documents.get(location) {
            Some(doc) => Snapshot {
                content: doc.content.clone(),
                revision: Some(doc.revision.clone()),
            },
            None => Snapshot {
                content: String::new(),
                revision: None,
            },
        })
    }
}

fn unreachable_error(location: &DocumentLocation) -> RemoteError {
    TransportError::Request {
        url: format!("memory://{}", location),
        message: "store is offline".to_string(),
    }
    .into()
}

/// Content hash salted with the commit counter, so rewriting identical
/// content still produces a new revision.
fn revision_for(commit: u64, content: &str) -> Revision {
    let mut hasher = Sha256::new();
    hasher.update(commit.to_be_bytes());
    hasher.update(content.as_bytes());
    Revision::new(hex::encode(hasher.finalize()))
}
