use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tracing::{error, info};

use crate::counter::{store::CounterStore, CounterRecord};
use crate::errors::StoreError;
use crate::storage::json_record_store::JsonRecordStore;

/// File-backed visit counter.
/// Keeps `{"count": N}` persisted as JSON, replaced atomically on every increment.
#[derive(Clone)]
pub struct FileCounterStore {
    store: Arc<JsonRecordStore<CounterRecord>>,
}

impl FileCounterStore {
    /// Bind to the given file path without touching the disk.
    pub(crate) fn new<P: Into<PathBuf>>(path: P, io_timeout: Duration) -> Arc<Self> {
        Arc::new(Self { store: Arc::new(JsonRecordStore::new(path, io_timeout)) })
    }

    /// Bind to the path and initialize the record. Creates the file if missing.
    ///
    /// Increments are serialized per instance, so a process must keep exactly
    /// one open store per record path and share it through the returned `Arc`.
    pub async fn open<P: Into<PathBuf>>(path: P, io_timeout: Duration) -> Result<Arc<Self>, StoreError> {
        let store = Self::new(path, io_timeout);
        store.initialize().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }
}

#[async_trait::async_trait]
impl CounterStore for FileCounterStore {
    async fn initialize(&self) -> Result<u64, StoreError> {
        let record = self.store.load_or_init(CounterRecord::default).await.map_err(|e| {
            error!(path = %self.path().display(), error = %e, "counter record initialization failed");
            e
        })?;
        info!(path = %self.path().display(), count = record.count, "counter record ready");
        Ok(record.count)
    }

    async fn increment(&self) -> Result<u64, StoreError> {
        let record = self
            .store
            .update(|current| {
                current.incremented().ok_or_else(|| {
                    StoreError::StorageUnavailable(format!("counter overflow at {}", current.count))
                })
            })
            .await?;
        Ok(record.count)
    }

    async fn read(&self) -> Result<u64, StoreError> {
        Ok(self.store.load().await?.count)
    }
}
