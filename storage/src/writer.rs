//! Uploads table data below object store locations.

use crate::delimited;
use dashmap::DashMap;
use errors::FixtureResult;
use fixture_core::{ObjectStore, TableDataSource};
use std::sync::Arc;
use tracing::{debug, instrument};

pub const DATA_FILE: &str = "data";
pub const REVISION_FILE: &str = "_revision";

/// Writes data files and remembers their revisions, so shared data whose
/// content did not change is uploaded once.
pub struct RevisionedDataWriter {
    store: Arc<dyn ObjectStore>,
    revisions: DashMap<String, String>
}

impl RevisionedDataWriter {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            revisions: DashMap::new()
        }
    }

    /// Uploads `source` to `location` unless the stored revision matches.
    /// Returns whether an upload happened.
    #[instrument(skip(self, source))]
    pub async fn ensure_data(&self, location: &str, source: &dyn TableDataSource) -> FixtureResult<bool> {
        if !source.has_data() {
            return Ok(false);
        }
        let revision = source.revision()?;
        if self.revisions.get(location).is_some_and(|known| *known == revision) {
            return Ok(false);
        }

        let marker = format!("{location}/{REVISION_FILE}");
        let stored = self.store.get(&marker).await?;
        if stored.as_deref() == Some(revision.as_bytes()) {
            debug!(location, "data already uploaded with current revision");
            self.revisions.insert(location.to_string(), revision);
            return Ok(false);
        }

        self.store.delete_prefix(location).await?;
        self.write_data(location, source).await?;
        self.store.put(&marker, revision.clone().into_bytes()).await?;
        self.revisions.insert(location.to_string(), revision);
        Ok(true)
    }

    /// Uploads `source` to `location` unconditionally.
    pub async fn write_data(&self, location: &str, source: &dyn TableDataSource) -> FixtureResult<()> {
        let contents = delimited::render(source)?;
        debug!(location, bytes = contents.len(), "uploading table data");
        self.store
            .put(&format!("{location}/{DATA_FILE}"), contents)
            .await
    }

    pub async fn delete(&self, location: &str) -> FixtureResult<()> {
        self.revisions.remove(location);
        self.store.delete_prefix(location).await
    }
}
