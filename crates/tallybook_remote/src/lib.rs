//! Tallybook remote document access
//!
//! Provides:
//! - **DocumentStore**: read raw content, read the revision marker, and write
//!   content conditioned on a revision marker
//! - **GithubContentsClient**: `DocumentStore` over the GitHub contents API
//! - **MemoryDocumentStore**: in-process store with the same conditional-write rules
//! - **HttpTransport**: the injected HTTP seam (`ReqwestTransport` by default)
//!
//! Credentials come from a [`SecretProvider`] and are attached to metadata
//! reads and writes only. The raw read is always unauthenticated.

pub mod credentials;
pub mod document;
pub mod error;
pub mod github;
pub mod memory;
pub mod transport;

pub use credentials::{Credentials, EnvSecretProvider, SecretProvider, StaticSecretProvider};
pub use document::{DocumentLocation, DocumentStore, Revision, Snapshot};
pub use error::{RemoteError, TransportError};
pub use github::{GithubContentsClient, GithubEndpoints};
pub use memory::{MemoryDocumentStore, ReadCounts, WriteCall};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
