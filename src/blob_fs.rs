//! Filesystem blob store.
//!
//! Keys map to paths under a root directory. Absolute keys and keys with
//! `..` or other non-plain components are rejected before any I/O.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::traits::BlobStore;

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if key.trim().is_empty() {
            bail!("empty blob key");
        }
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            bail!("blob key '{}' must be a plain relative path", key);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read blob: {}", path.display()))
    }

    async fn upload(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write blob: {}", path.display()))
    }
}
