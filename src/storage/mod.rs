//! Object-storage seam for re-hosted media.
//!
//! The bucket is private: references are opaque `storage://bucket/path`
//! strings, resolved to short-lived signed URLs by the rendering layer,
//! never public URLs.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// Opaque pointer to an object in private storage. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    bucket: String,
    path: String,
}

impl MediaReference {
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parse a `storage://bucket/path` string back into a reference.
    pub fn parse(raw: &str) -> Result<Self> {
        let rest = raw
            .strip_prefix("storage://")
            .with_context(|| format!("not a storage reference: {}", raw))?;
        let (bucket, path) = rest
            .split_once('/')
            .with_context(|| format!("storage reference missing path: {}", raw))?;
        if bucket.is_empty() || path.is_empty() {
            bail!("storage reference missing bucket or path: {}", raw);
        }
        Ok(Self::new(bucket, path))
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage://{}/{}", self.bucket, self.path)
    }
}

/// Where re-hosted media bytes land. The hosted store implements this the
/// same way the filesystem bucket below does.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn bucket(&self) -> &str;

    /// Store bytes under `path` within the bucket. Overwrites silently —
    /// paths are timestamp+random and never reused.
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<()>;
}

/// Filesystem-backed bucket under a configured root directory.
pub struct FsBucketStorage {
    bucket: String,
    root: PathBuf,
}

impl FsBucketStorage {
    pub fn new(bucket: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.into(),
            root: root.into(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() {
            bail!("empty object path");
        }
        // Relative traversal would escape the bucket root
        if path.split('/').any(|c| c.is_empty() || c == "." || c == "..") {
            bail!("invalid object path: {}", path);
        }
        Ok(self.root.join(self.bucket.as_str()).join(path))
    }
}

#[async_trait]
impl ObjectStorage for FsBucketStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("failed to write {}", target.display()))?;
        Ok(())
    }
}
