use std::{
    ffi::OsString,
    future::Future,
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs,
    io::AsyncWriteExt,
    sync::Mutex,
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::errors::StoreError;

/// Location of a record and of the sibling file used for atomic replacement.
#[derive(Debug)]
struct RecordPaths {
    file: PathBuf,
    tmp: PathBuf,
}

impl RecordPaths {
    fn new(file: PathBuf) -> Self {
        let mut name = file.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        let tmp = file.with_file_name(name);
        Self { file, tmp }
    }
}

/// Single JSON record persisted in one file.
///
/// Every operation runs under one mutex, so a read-modify-write through
/// [`JsonRecordStore::update`] is never interleaved with another operation on
/// the same store. Writes go to `<file>.tmp`, are synced, then renamed over the
/// record: a crash leaves either the old or the new record on disk.
///
/// Each operation runs in its own task holding the lock. `io_timeout` bounds
/// the lock wait and the read phase: a caller that gives up there gets
/// [`StoreError::StorageUnavailable`] and the task drops out without writing.
/// Once a write has started the caller waits for its real outcome.
pub struct JsonRecordStore<T> {
    paths: Arc<RecordPaths>,
    lock: Arc<Mutex<()>>,
    io_timeout: Duration,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonRecordStore<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Bind the store to a path. No I/O happens until the first operation.
    pub fn new<P: Into<PathBuf>>(path: P, io_timeout: Duration) -> Self {
        Self {
            paths: Arc::new(RecordPaths::new(path.into())),
            lock: Arc::new(Mutex::new(())),
            io_timeout,
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.paths.file
    }

    /// Take the store lock directly, stalling every operation until dropped.
    #[cfg(test)]
    pub(crate) async fn hold_lock(&self) -> tokio::sync::OwnedMutexGuard<()> {
        Arc::clone(&self.lock).lock_owned().await
    }

    /// Read the record, creating it from `initial` if the file does not exist.
    ///
    /// An existing record that fails to decode is reported, never overwritten.
    pub async fn load_or_init<F>(&self, initial: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        self.run_locked("initialize", |paths, gate| async move {
            match fs::read(&paths.file).await {
                Ok(bytes) => decode(&paths.file, &bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    if let Some(parent) = paths.file.parent().filter(|p| !p.as_os_str().is_empty()) {
                        fs::create_dir_all(parent)
                            .await
                            .map_err(|e| io_error("create directory for", &paths.file, e))?;
                    }
                    let record = initial();
                    gate.begin_commit()?;
                    write_atomic(&paths, &encode(&paths.file, &record)?).await?;
                    info!(path = %paths.file.display(), "created record");
                    Ok(record)
                }
                Err(e) => Err(io_error("read", &paths.file, e)),
            }
        })
        .await
    }

    /// Read the current record from disk.
    pub async fn load(&self) -> Result<T, StoreError> {
        self.run_locked("read", |paths, _gate| async move { read_record(&paths).await }).await
    }

    /// Read, transform and persist the record as one serialized step; returns the stored value.
    ///
    /// If `f` fails or the write fails the file keeps its previous content.
    pub async fn update<F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(T) -> Result<T, StoreError> + Send + 'static,
    {
        self.run_locked("update", |paths, gate| async move {
            let current = read_record::<T>(&paths).await?;
            let next = f(current)?;
            gate.begin_commit()?;
            write_atomic(&paths, &encode(&paths.file, &next)?).await?;
            Ok(next)
        })
        .await
    }

    async fn run_locked<R, F, Fut>(&self, op: &'static str, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(Arc<RecordPaths>, Arc<OpGate>) -> Fut,
        Fut: Future<Output = Result<R, StoreError>> + Send + 'static,
        R: Send + 'static,
    {
        let lock = Arc::clone(&self.lock);
        let gate = Arc::new(OpGate::default());
        let fut = f(Arc::clone(&self.paths), Arc::clone(&gate));
        let task_gate = Arc::clone(&gate);
        let mut task = tokio::spawn(async move {
            let _guard = lock.lock_owned().await;
            if !task_gate.start() {
                return Err(StoreError::StorageUnavailable(format!("{op} abandoned before it started")));
            }
            fut.await
        });

        let joined = match timeout(self.io_timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) if gate.abandon() => {
                warn!(op, path = %self.paths.file.display(), timeout_ms = self.io_timeout.as_millis() as u64, "storage operation timed out");
                return Err(StoreError::StorageUnavailable(format!(
                    "{op} of {} timed out after {} ms",
                    self.paths.file.display(),
                    self.io_timeout.as_millis()
                )));
            }
            Err(_) => {
                debug!(op, path = %self.paths.file.display(), "deadline passed mid-write, waiting for commit");
                task.await
            }
        };
        joined.map_err(|join| StoreError::StorageUnavailable(format!("{op} task failed: {join}")))?
    }
}

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const COMMITTING: u8 = 2;
const ABANDONED: u8 = 3;

/// Hand-off between a caller waiting on an operation and the task running it.
///
/// The caller may abandon the operation until the task reaches its write; from
/// then on the write runs to completion and its result is reported.
#[derive(Debug, Default)]
struct OpGate(AtomicU8);

impl OpGate {
    /// Called with the lock held. `false` means the caller already gave up.
    fn start(&self) -> bool {
        self.0
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Last point at which the operation can be dropped without touching the file.
    fn begin_commit(&self) -> Result<(), StoreError> {
        self.0
            .compare_exchange(RUNNING, COMMITTING, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| StoreError::StorageUnavailable("operation abandoned before write".into()))
    }

    /// `true` if the operation will not write; `false` if a write is under way.
    fn abandon(&self) -> bool {
        let mut state = self.0.load(Ordering::Acquire);
        loop {
            match state {
                PENDING | RUNNING => match self.0.compare_exchange(
                    state,
                    ABANDONED,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return true,
                    Err(now) => state = now,
                },
                COMMITTING => return false,
                _ => return true,
            }
        }
    }
}

async fn read_record<T: DeserializeOwned>(paths: &RecordPaths) -> Result<T, StoreError> {
    let bytes = fs::read(&paths.file).await.map_err(|e| io_error("read", &paths.file, e))?;
    decode(&paths.file, &bytes)
}

fn decode<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::MalformedRecord(format!("{}: {e}", path.display())))
}

fn encode<T: Serialize>(path: &Path, record: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(record)
        .map_err(|e| StoreError::StorageUnavailable(format!("encode {}: {e}", path.display())))
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> StoreError {
    StoreError::StorageUnavailable(format!("{action} {}: {e}", path.display()))
}

async fn write_atomic(paths: &RecordPaths, bytes: &[u8]) -> Result<(), StoreError> {
    let res = async {
        let mut file = fs::File::create(&paths.tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&paths.tmp, &paths.file).await
    }
    .await;

    if let Err(e) = res {
        let _ = fs::remove_file(&paths.tmp).await;
        return Err(io_error("write", &paths.file, e));
    }
    sync_parent_dir(&paths.file).await;
    debug!(path = %paths.file.display(), bytes = bytes.len(), "record committed");
    Ok(())
}

/// Persist the rename itself; failure only weakens durability, so it is logged.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let res = async { fs::File::open(dir).await?.sync_all().await }.await;
    if let Err(e) = res {
        debug!(dir = %dir.display(), error = %e, "directory sync skipped");
    }
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) {}
