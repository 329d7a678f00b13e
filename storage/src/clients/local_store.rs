use async_trait::async_trait;
use errors::FixtureResult;
use fixture_core::ObjectStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Object store backed by a local directory; object paths are relative to
/// the root.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, path: &str, contents: Vec<u8>) -> FixtureResult<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(target, contents).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> FixtureResult<Option<Vec<u8>>> {
        match fs::read(self.resolve(path)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into())
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> FixtureResult<()> {
        let target = self.resolve(prefix);
        let result = match fs::metadata(&target).await {
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(&target).await,
            Ok(_) => fs::remove_file(&target).await,
            Err(e) => Err(e)
        };
        match result {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(())
        }
    }
}
