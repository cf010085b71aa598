//! Read-modify-write over a remote CSV document.

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use tallybook_csv::{decode_with, encode, Record};
use tallybook_remote::{DocumentStore, RemoteError, Revision};

use crate::config::{ReadMode, StoreConfig};
use crate::error::{AppendPhase, Result, StoreError};
use crate::expense::Expense;

/// A decoded document as read at the start of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub records: Vec<Record>,
    pub revision: Option<Revision>,
    pub raw: String,
}

/// A successful append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Revision the write produced
    pub revision: Revision,
    /// Revision the write was conditioned on (`None` when it created the document)
    pub previous: Option<Revision>,
    /// Cycles run, including the successful one
    pub attempts: u32,
    /// Records in the document after the append
    pub records: usize,
}

pub struct RecordStore<S> {
    documents: S,
    config: StoreConfig,
}

impl<S: DocumentStore> RecordStore<S> {
    pub fn new(documents: S, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { documents, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// All records, read from the raw content. A missing document has none.
    pub async fn load_all(&self) -> Result<Vec<Record>> {
        let location = &self.config.location;
        let raw = self
            .documents
            .fetch_raw(location)
            .await
            .map_err(|e| self.remote_error(AppendPhase::ReadingContent, e))?;
        Ok(raw
            .map(|raw| decode_with(&raw, self.config.quote_mode))
            .unwrap_or_default())
    }

    /// Like [`load_all`](Self::load_all), but a failed read yields no records.
    pub async fn load_all_or_empty(&self) -> Vec<Record> {
        match self.load_all().await {
            Ok(records) => records,
            Err(err) => {
                warn!("Loading {} failed, continuing with no records: {}", self.config.location, err);
                Vec::new()
            }
        }
    }

    /// Content and revision for one cycle, per the configured [`ReadMode`].
    ///
    /// In `Split` mode, a raw read that finds nothing while a revision exists
    /// is retried as a snapshot read. Writing an empty document over that
    /// revision would erase every existing row.
    pub async fn fetch_document(&self) -> Result<Document> {
        let location = &self.config.location;
        let (raw, revision) = match self.config.read_mode {
            ReadMode::Split => {
                let raw = self
                    .documents
                    .fetch_raw(location)
                    .await
                    .map_err(|e| self.remote_error(AppendPhase::ReadingContent, e))?;
                let revision = self
                    .documents
                    .fetch_revision(location)
                    .await
                    .map_err(|e| self.remote_error(AppendPhase::ReadingRevision, e))?;
                match (raw, revision) {
                    (None, Some(revision)) => {
                        warn!(
                            "Raw read of {} found nothing but revision {} exists; reading a snapshot",
                            location, revision
                        );
                        self.fetch_snapshot().await?
                    }
                    (raw, revision) => (raw.unwrap_or_default(), revision),
                }
            }
            ReadMode::Snapshot => self.fetch_snapshot().await?,
        };

        let records = decode_with(&raw, self.config.quote_mode);
        debug!(
            "Read {} records from {} at {:?}",
            records.len(),
            location,
            revision.as_ref().map(Revision::as_str)
        );
        Ok(Document {
            records,
            revision,
            raw,
        })
    }

    /// Append `record` and write the document back, conditioned on the
    /// revision seen when it was read.
    ///
    /// A conflict re-runs the whole cycle while `max_attempts` allows; any
    /// other failure is returned immediately.
    pub async fn append_and_save(&self, record: Record) -> Result<Commit> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.append_once(&record, attempt).await {
                Err(err) if err.is_conflict() && attempt < max_attempts => {
                    warn!(
                        "Attempt {}/{} to append to {} lost a race; re-reading",
                        attempt, max_attempts, self.config.location
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Append one expense using the configured parties.
    pub async fn add_expense(&self, expense: &Expense) -> Result<Commit> {
        self.append_and_save(expense.to_record(&self.config.parties))
            .await
    }

    async fn fetch_snapshot(&self) -> Result<(String, Option<Revision>)> {
        let snapshot = self
            .documents
            .fetch_snapshot(&self.config.location)
            .await
            .map_err(|e| self.remote_error(AppendPhase::ReadingSnapshot, e))?;
        Ok((snapshot.content, snapshot.revision))
    }

    async fn append_once(&self, record: &Record, attempt: u32) -> Result<Commit> {
        let location = &self.config.location;
        let Document {
            mut records,
            revision,
            ..
        } = self.fetch_document().await?;

        if let Some(header) = records.first() {
            let dropped: Vec<&str> = record
                .columns()
                .filter(|column| !header.contains_column(column))
                .collect();
            if !dropped.is_empty() {
                warn!(
                    "Columns {:?} are not in the header of {} and will not be written",
                    dropped, location
                );
            }
        }

        records.push(record.clone());
        let content = encode(&records);
        let message = self.commit_message();

        match self
            .documents
            .write(location, &content, revision.as_ref(), &message)
            .await
        {
            Ok(new_revision) => {
                info!(
                    "Appended record to {} ({} records, revision {})",
                    location,
                    records.len(),
                    new_revision
                );
                Ok(Commit {
                    revision: new_revision,
                    previous: revision,
                    attempts: attempt,
                    records: records.len(),
                })
            }
            Err(err) if err.is_conflict() => Err(StoreError::Conflict {
                location: location.to_string(),
                attempts: attempt,
                source: err,
            }),
            Err(err) => Err(self.remote_error(AppendPhase::Writing, err)),
        }
    }

    fn commit_message(&self) -> String {
        format!(
            "{} - {}",
            self.config.commit_message,
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    fn remote_error(&self, phase: AppendPhase, source: RemoteError) -> StoreError {
        StoreError::Remote {
            phase,
            location: self.config.location.to_string(),
            source,
        }
    }
}
