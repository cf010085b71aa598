//! Tallybook record store
//!
//! Loads expense records from a CSV document held in a remote store and
//! appends to it with a revision-checked write. Each append is one
//! read-modify-write cycle:
//!
//! ```text
//! Idle → ReadingContent → ReadingRevision → Mutating → Writing → Committed | Conflicted | Failed
//! ```
//!
//! Nothing is cached between calls. A conflict is reported to the caller
//! unless `max_attempts` allows the cycle to be re-run.

pub mod config;
pub mod error;
pub mod expense;
pub mod record_store;

pub use config::{ReadMode, StoreConfig};
pub use error::{AppendPhase, Result, StoreError};
pub use expense::{expense_columns, Expense};
pub use record_store::{Commit, Document, RecordStore};

pub use tallybook_csv::{QuoteMode, Record};
pub use tallybook_remote::{DocumentLocation, DocumentStore, Revision};
