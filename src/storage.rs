//! Blob key conventions and backend selection.

use anyhow::Result;
use std::sync::Arc;

use crate::blob_fs::FsBlobStore;
use crate::blob_s3::S3BlobStore;
use crate::config::Config;
use crate::models::DocumentRecord;
use crate::traits::BlobStore;

/// Bucket name some upload paths write into `storage_ref`.
const BUCKET_PREFIX: &str = "documents/";

/// Keys to try for a record, primary first, at most one alternate.
///
/// The primary key is `storage_ref` as stored. The alternate is the same
/// reference without a leading `documents/` bucket segment when it has one,
/// otherwise the `{owner_id}/{file_name}` convention.
pub fn candidate_keys(record: &DocumentRecord) -> Vec<String> {
    let primary = record.storage_ref.trim().to_string();
    let alternate = match primary.strip_prefix(BUCKET_PREFIX) {
        Some(stripped) => stripped.to_string(),
        None => format!("{}/{}", record.owner_id, record.file_name),
    };

    let mut keys = Vec::with_capacity(2);
    if !primary.is_empty() {
        keys.push(primary);
    }
    if !keys.contains(&alternate) {
        keys.push(alternate);
    }
    keys
}

/// Blob key for a newly uploaded file.
pub fn upload_key(owner_id: &str, file_name: &str) -> String {
    format!("{}/{}", owner_id, file_name)
}

pub fn build_blob_store(config: &Config) -> Result<Arc<dyn BlobStore>> {
    match config.storage.backend.as_str() {
        "fs" => Ok(Arc::new(FsBlobStore::new(config.storage.root.clone()))),
        "s3" => Ok(Arc::new(S3BlobStore::from_config(&config.storage)?)),
        other => anyhow::bail!("Unknown storage backend: '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(storage_ref: &str) -> DocumentRecord {
        DocumentRecord {
            id: "d1".into(),
            owner_id: "owner-1".into(),
            file_name: "offre.pdf".into(),
            storage_ref: storage_ref.into(),
            declared_type: None,
        }
    }

    #[test]
    fn alternate_is_owner_convention() {
        assert_eq!(
            candidate_keys(&record("uploads/abc123.pdf")),
            vec!["uploads/abc123.pdf", "owner-1/offre.pdf"]
        );
    }

    #[test]
    fn bucket_prefix_is_stripped_for_alternate() {
        assert_eq!(
            candidate_keys(&record("documents/owner-1/offre.pdf")),
            vec!["documents/owner-1/offre.pdf", "owner-1/offre.pdf"]
        );
    }

    #[test]
    fn no_duplicate_when_primary_is_conventional() {
        assert_eq!(candidate_keys(&record("owner-1/offre.pdf")), vec!["owner-1/offre.pdf"]);
        assert_eq!(candidate_keys(&record("  ")), vec!["owner-1/offre.pdf"]);
    }

    #[test]
    fn fs_backend_by_default() {
        let store = build_blob_store(&Config::minimal()).unwrap();
        assert_eq!(store.name(), "fs");
    }
}
