// src/store.rs
//! Storage for the published document: a single blob under a well-known
//! key. Read once at the start of a cycle, replaced once at the end.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stored body, or `None` if nothing was published yet.
    async fn load(&self) -> Result<Option<String>>;
    /// Replace the stored body.
    async fn save(&self, body: &str) -> Result<()>;
    fn key(&self) -> &str;
}

/// `<dir>/<key>` on the local filesystem. Writes go to a sibling temp file
/// that is then renamed over the target, so readers never see a torn file.
pub struct FileStore {
    dir: PathBuf,
    key: String,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.key)
    }

    fn tmp_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.tmp", self.key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl DocumentStore for FileStore {
    async fn load(&self) -> Result<Option<String>> {
        let path = self.path();
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn save(&self, body: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        let path = self.path();
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    fn key(&self) -> &str {
        &self.key
    }
}
