//! Document orchestrator: stored uploads to one bounded text block.
//!
//! # Pipeline
//!
//! ```text
//! DocumentStore ──▶ first N records ──▶ BlobStore download ──▶ extract ──▶ digest
//!                                         (primary key,         (by
//!                                          one alternate)        extension)
//! ```
//!
//! Every document is handled independently. A document whose blob cannot
//! be found or whose content yields nothing is recorded as skipped; the
//! batch only comes back empty when no document contributed anything.

use std::sync::Arc;

use anyhow::Result;
use intake_harness_core::error::ExtractError;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::extract::{extract_document, TextQuality};
use crate::models::{DocumentRecord, FailureReason};
use crate::storage::candidate_keys;
use crate::traits::{BlobStore, DocumentStore};

/// A document that contributed no text, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub document_id: String,
    pub file_name: String,
    pub reason: FailureReason,
}

/// Concatenated text of the documents that could be read.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDigest {
    /// `--- file_name ---` headed blocks, in processing order.
    pub text: String,
    /// Ids of the documents whose text is in `text`.
    pub contributed: Vec<String>,
    pub skipped: Vec<SkippedDocument>,
    /// How many contributed blocks are placeholders (scanned PDF, image).
    pub placeholders: usize,
}

pub struct DocumentOrchestrator {
    records: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    max_documents: usize,
}

impl DocumentOrchestrator {
    pub fn new(
        records: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        max_documents: usize,
    ) -> Self {
        Self {
            records,
            blobs,
            max_documents,
        }
    }

    /// Read up to `max_documents` of the owner's documents.
    ///
    /// `document_ids` empty means "the owner's most recent documents".
    /// Processing stops early once the accumulated text exceeds
    /// `max_chars`; the aggregator applies the hard cut afterwards.
    pub async fn process(
        &self,
        document_ids: &[String],
        owner_id: &str,
        max_chars: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<DocumentDigest>> {
        let mut records = self.records.documents_for(owner_id, document_ids).await?;
        records.truncate(self.max_documents);
        if records.is_empty() {
            debug!(owner_id, requested = document_ids.len(), "no documents to process");
            return Ok(None);
        }

        let mut blocks = Vec::new();
        let mut contributed = Vec::new();
        let mut skipped = Vec::new();
        let mut placeholders = 0usize;
        let mut total_chars = 0usize;

        for record in &records {
            if cancel.is_cancelled() {
                debug!(owner_id, "document processing cancelled");
                break;
            }

            let outcome = match self.download(record, cancel).await {
                Ok(bytes) => extract_document(&record.file_name, &bytes).map_err(|e| {
                    warn!(
                        document_id = %record.id,
                        file_name = %record.file_name,
                        error = %e,
                        "document skipped"
                    );
                    extract_reason(&e)
                }),
                Err(reason) => Err(reason),
            };

            let doc = match outcome {
                Ok(doc) => doc,
                Err(reason) => {
                    skipped.push(SkippedDocument {
                        document_id: record.id.clone(),
                        file_name: record.file_name.clone(),
                        reason,
                    });
                    continue;
                }
            };

            if doc.quality == TextQuality::Placeholder {
                placeholders += 1;
            }
            let block = format!("--- {} ---\n{}", record.file_name, doc.text);
            total_chars += block.chars().count();
            blocks.push(block);
            contributed.push(record.id.clone());

            if total_chars > max_chars {
                debug!(owner_id, total_chars, max_chars, "document budget reached");
                break;
            }
        }

        info!(
            owner_id,
            contributed = contributed.len(),
            skipped = skipped.len(),
            placeholders,
            "documents processed"
        );

        if blocks.is_empty() {
            return Ok(None);
        }
        Ok(Some(DocumentDigest {
            text: blocks.join("\n\n"),
            contributed,
            skipped,
            placeholders,
        }))
    }

    /// Primary key first, then exactly one alternate.
    async fn download(
        &self,
        record: &DocumentRecord,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<u8>, FailureReason> {
        for key in candidate_keys(record) {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FailureReason::Cancelled),
                attempt = self.blobs.download(&key) => attempt,
            };
            match attempt {
                Ok(bytes) => return Ok(bytes),
                Err(e) => warn!(
                    document_id = %record.id,
                    store = self.blobs.name(),
                    key = %key,
                    error = %e,
                    "blob download failed"
                ),
            }
        }
        Err(FailureReason::Network)
    }
}

fn extract_reason(err: &ExtractError) -> FailureReason {
    match err {
        ExtractError::Empty => FailureReason::Empty,
        ExtractError::UnsupportedType(_) | ExtractError::Zip(_) => FailureReason::Extraction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryRecords(Vec<DocumentRecord>);

    #[async_trait]
    impl DocumentStore for MemoryRecords {
        async fn documents_for(
            &self,
            owner_id: &str,
            ids: &[String],
        ) -> Result<Vec<DocumentRecord>> {
            Ok(self
                .0
                .iter()
                .filter(|r| r.owner_id == owner_id)
                .filter(|r| ids.is_empty() || ids.contains(&r.id))
                .cloned()
                .collect())
        }

        async fn register(&self, _record: &DocumentRecord) -> Result<()> {
            anyhow::bail!("read-only")
        }
    }

    #[derive(Default)]
    struct MemoryBlobs {
        objects: HashMap<String, Vec<u8>>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlobStore for MemoryBlobs {
        fn name(&self) -> &str {
            "memory"
        }

        async fn download(&self, key: &str) -> Result<Vec<u8>> {
            self.requested.lock().unwrap().push(key.to_string());
            self.objects
                .get(key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no object at {key}"))
        }

        async fn upload(&self, _key: &str, _bytes: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    fn record(id: &str, file_name: &str, storage_ref: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.into(),
            owner_id: "o1".into(),
            file_name: file_name.into(),
            storage_ref: storage_ref.into(),
            declared_type: None,
        }
    }

    fn orchestrator(
        records: Vec<DocumentRecord>,
        objects: &[(&str, &[u8])],
        max_documents: usize,
    ) -> (DocumentOrchestrator, Arc<MemoryBlobs>) {
        let blobs = Arc::new(MemoryBlobs {
            objects: objects
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_vec()))
                .collect(),
            ..Default::default()
        });
        let orch = DocumentOrchestrator::new(
            Arc::new(MemoryRecords(records)),
            blobs.clone(),
            max_documents,
        );
        (orch, blobs)
    }

    #[tokio::test]
    async fn concatenates_in_order_and_skips_failures() {
        let (orch, _) = orchestrator(
            vec![
                record("a", "bio.txt", "o1/bio.txt"),
                record("b", "perdu.txt", "o1/perdu.txt"),
                record("c", "offres.md", "o1/offres.md"),
            ],
            &[("o1/bio.txt", &b"Je suis naturopathe."[..]), ("o1/offres.md", &b"# Bilan"[..])],
            5,
        );
        let digest = orch
            .process(&[], "o1", 5000, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            digest.text,
            "--- bio.txt ---\nJe suis naturopathe.\n\n--- offres.md ---\n# Bilan"
        );
        assert_eq!(digest.contributed, vec!["a", "c"]);
        assert_eq!(digest.skipped.len(), 1);
        assert_eq!(digest.skipped[0].document_id, "b");
        assert_eq!(digest.skipped[0].reason, FailureReason::Network);
    }

    #[tokio::test]
    async fn alternate_key_tried_exactly_once() {
        let (orch, blobs) = orchestrator(
            vec![record("a", "bio.txt", "documents/legacy/abc")],
            &[("legacy/abc", &b"Texte retrouve"[..])],
            5,
        );
        let digest = orch
            .process(&[], "o1", 5000, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert!(digest.text.ends_with("Texte retrouve"));
        assert_eq!(
            *blobs.requested.lock().unwrap(),
            vec!["documents/legacy/abc", "legacy/abc"]
        );
    }

    #[tokio::test]
    async fn primary_key_hit_skips_alternate() {
        let (orch, blobs) = orchestrator(
            vec![record("a", "bio.txt", "documents/o1/bio.txt")],
            &[("documents/o1/bio.txt", &b"Texte principal"[..])],
            5,
        );
        orch.process(&[], "o1", 5000, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*blobs.requested.lock().unwrap(), vec!["documents/o1/bio.txt"]);
    }

    #[tokio::test]
    async fn stops_once_budget_exceeded() {
        let long = "x".repeat(40);
        let (orch, blobs) = orchestrator(
            vec![
                record("a", "a.txt", "o1/a.txt"),
                record("b", "b.txt", "o1/b.txt"),
                record("c", "c.txt", "o1/c.txt"),
            ],
            &[
                ("o1/a.txt", long.as_bytes()),
                ("o1/b.txt", long.as_bytes()),
                ("o1/c.txt", long.as_bytes()),
            ],
            5,
        );
        let digest = orch
            .process(&[], "o1", 60, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(digest.contributed, vec!["a", "b"]);
        assert_eq!(blobs.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn document_count_is_bounded() {
        let records: Vec<_> = (0..8)
            .map(|i| record(&format!("d{i}"), &format!("{i}.txt"), &format!("o1/{i}.txt")))
            .collect();
        let keys: Vec<String> = (0..8).map(|i| format!("o1/{i}.txt")).collect();
        let objects: Vec<(&str, &[u8])> =
            keys.iter().map(|k| (k.as_str(), &b"contenu"[..])).collect();
        let (orch, _) = orchestrator(records, &objects, 5);
        let digest = orch
            .process(&[], "o1", 5000, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(digest.contributed.len(), 5);
    }

    #[tokio::test]
    async fn none_when_every_document_fails() {
        let (orch, _) = orchestrator(
            vec![
                record("a", "vide.txt", "o1/vide.txt"),
                record("b", "table.xlsx", "o1/table.xlsx"),
            ],
            &[("o1/vide.txt", &b"   "[..]), ("o1/table.xlsx", &b"PK"[..])],
            5,
        );
        let out = orch
            .process(&[], "o1", 5000, &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.is_none());

        let (orch, _) = orchestrator(Vec::new(), &[], 5);
        let out = orch
            .process(&[], "o1", 5000, &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn placeholders_count_as_contributions() {
        let (orch, _) = orchestrator(
            vec![record("a", "scan.pdf", "o1/scan.pdf")],
            &[("o1/scan.pdf", &b"%PDF-1.4\n1 0 obj << >> stream\n\x89\x01\x02\nendstream"[..])],
            5,
        );
        let digest = orch
            .process(&[], "o1", 5000, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(digest.placeholders, 1);
        assert!(digest.text.contains("PDF scanné"));
    }

    #[tokio::test]
    async fn cancelled_before_start_yields_nothing() {
        let (orch, blobs) = orchestrator(
            vec![record("a", "bio.txt", "o1/bio.txt")],
            &[("o1/bio.txt", &b"Bonjour"[..])],
            5,
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(orch.process(&[], "o1", 5000, &cancel).await.unwrap().is_none());
        assert!(blobs.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn process_future_is_send() {
        fn assert_send<T: Send>(_: T) {}
        let (orch, _) = orchestrator(Vec::new(), &[], 5);
        assert_send(orch.process(&[], "o1", 100, &CancellationToken::new()));
    }
}
