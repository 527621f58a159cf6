//! Storage seams used by the document orchestrator.
//!
//! The orchestrator never talks to SQLite or an object store directly. It
//! reads document metadata through a [`DocumentStore`] and downloads bytes
//! through a [`BlobStore`]. Tests substitute in-memory implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐      ┌────────────────────┐
//! │  DocumentStore    │      │     BlobStore      │
//! │  SQLite records   │      │   fs / S3 objects  │
//! └─────────┬─────────┘      └─────────┬──────────┘
//!           │ DocumentRecord           │ bytes
//!           └────────────┬─────────────┘
//!                        ▼
//!             DocumentOrchestrator::process()
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use intake_harness::blob_fs::FsBlobStore;
//! use intake_harness::traits::BlobStore;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new("./data/blobs"));
//! let bytes = blobs.download("owner-1/brochure.pdf").await?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use async_trait::async_trait;

use crate::models::DocumentRecord;

// ═══════════════════════════════════════════════════════════════════════
// Blob Store Trait
// ═══════════════════════════════════════════════════════════════════════

/// Byte storage for uploaded documents, addressed by key.
///
/// Keys are `/`-separated relative paths such as `owner-1/brochure.pdf`.
/// Implementations decide how a key maps to their own namespace (a
/// directory tree, a bucket prefix).
///
/// # Example
///
/// ```rust
/// use anyhow::{bail, Result};
/// use async_trait::async_trait;
/// use intake_harness::traits::BlobStore;
///
/// pub struct EmptyStore;
///
/// #[async_trait]
/// impl BlobStore for EmptyStore {
///     fn name(&self) -> &str { "empty" }
///
///     async fn download(&self, key: &str) -> Result<Vec<u8>> {
///         bail!("no object at '{}'", key)
///     }
///
///     async fn upload(&self, _key: &str, _bytes: &[u8]) -> Result<()> {
///         bail!("read-only store")
///     }
/// }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Backend identifier used in logs (`"fs"`, `"s3"`).
    fn name(&self) -> &str;

    /// Fetch the whole object at `key`. A missing object is an error.
    async fn download(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `bytes` at `key`, replacing any existing object.
    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════
// Document Store Trait
// ═══════════════════════════════════════════════════════════════════════

/// Metadata records for uploaded documents.
///
/// The extraction pipeline only reads records. [`register`](DocumentStore::register)
/// exists for the upload path (`intake documents add`).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Records owned by `owner_id`.
    ///
    /// With an empty `ids` slice, every record of the owner is returned,
    /// newest first. Otherwise only the listed ids are returned, in the
    /// order given; ids that are unknown or belong to another owner are
    /// silently absent.
    async fn documents_for(&self, owner_id: &str, ids: &[String]) -> Result<Vec<DocumentRecord>>;

    /// Insert or replace a record.
    async fn register(&self, record: &DocumentRecord) -> Result<()>;
}
