//! Data models used throughout Intake Harness.
//!
//! The extraction data model lives in `intake-harness-core` and is
//! re-exported here so application code has a single import path.

pub use intake_harness_core::models::{
    Confidence, DocumentRecord, ExtractedText, FailureReason, PrefillEntity, PrefillField,
    SourceName, SourceOutcome, SourceStatus,
};

use serde::Serialize;

/// A document row as listed back to the owner.
#[derive(Debug, Clone, Serialize)]
pub struct StoredDocument {
    #[serde(flatten)]
    pub record: DocumentRecord,
    pub created_at: i64,
}
