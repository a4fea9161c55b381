use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use snip_core::error::{Result, StorageError};
use snip_core::{BackendKind, ShortId, UrlRecord, UrlRepository};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// One line of the storage file.
///
/// Saves write `{uuid, short_url, original_url}`. Soft deletes append the
/// same shape with `is_deleted: true`, which replay applies to the record
/// already indexed under `short_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileRecord {
    uuid: String,
    short_url: String,
    original_url: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_deleted: bool,
}

impl FileRecord {
    fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)
            .map_err(|e| StorageError::WriteFailed(format!("failed to encode record: {e}")))?;
        line.push('\n');
        Ok(line)
    }
}

#[derive(Debug)]
struct Entry {
    uuid: String,
    original_url: String,
    deleted: bool,
}

impl Entry {
    fn to_record(&self, short_id: &ShortId) -> UrlRecord {
        UrlRecord {
            id: Some(self.uuid.clone()),
            short_id: short_id.clone(),
            original_url: self.original_url.clone(),
            deleted: self.deleted,
        }
    }
}

#[derive(Debug)]
struct State {
    file: File,
    index: HashMap<ShortId, Entry>,
    /// File length up to the end of the last acknowledged write.
    committed_len: u64,
}

impl State {
    fn append(&mut self, payload: &str) -> Result<()> {
        let len = self
            .file
            .metadata()
            .map_err(|e| StorageError::WriteFailed(format!("failed to stat storage file: {e}")))?
            .len();

        // Anything past the committed length is a fragment of an earlier
        // failed write. Start a fresh line so this record decodes on its own.
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        if len != self.committed_len {
            warn!(expected = self.committed_len, found = len, "storage file has a torn tail");
            bytes.push(b'\n');
        }
        bytes.extend_from_slice(payload.as_bytes());

        match self.file.write_all(&bytes).and_then(|()| self.file.flush()) {
            Ok(()) => {
                self.committed_len = len + bytes.len() as u64;
                Ok(())
            }
            Err(e) => {
                if let Err(truncate) = self.file.set_len(len) {
                    warn!(error = %truncate, "failed to roll back partial append");
                }
                Err(StorageError::WriteFailed(format!("failed to append record: {e}")))
            }
        }
    }

    fn insert(&mut self, short_id: &ShortId, original_url: &str) -> Result<()> {
        if self.index.contains_key(short_id) {
            return Err(StorageError::Conflict(short_id.to_string()));
        }
        if self.index.values().any(|e| e.original_url == original_url) {
            return Err(StorageError::Conflict(original_url.to_owned()));
        }

        let record = FileRecord {
            uuid: Uuid::new_v4().to_string(),
            short_url: short_id.to_string(),
            original_url: original_url.to_owned(),
            is_deleted: false,
        };
        // The index only learns about the record once it is on disk.
        self.append(&record.to_line()?)?;
        self.index.insert(
            short_id.clone(),
            Entry {
                uuid: record.uuid,
                original_url: record.original_url,
                deleted: false,
            },
        );
        Ok(())
    }

    /// Appends tombstones for the live records among `short_ids` and returns
    /// how many were marked.
    fn soft_delete(&mut self, short_ids: &[ShortId]) -> Result<usize> {
        let mut payload = String::new();
        let mut marked: Vec<&ShortId> = Vec::new();
        for short_id in short_ids {
            let Some(entry) = self.index.get(short_id) else {
                continue;
            };
            if entry.deleted || marked.contains(&short_id) {
                continue;
            }
            let tombstone = FileRecord {
                uuid: entry.uuid.clone(),
                short_url: short_id.to_string(),
                original_url: entry.original_url.clone(),
                is_deleted: true,
            };
            payload.push_str(&tombstone.to_line()?);
            marked.push(short_id);
        }

        if marked.is_empty() {
            return Ok(0);
        }

        self.append(&payload)?;
        for short_id in &marked {
            if let Some(entry) = self.index.get_mut(*short_id) {
                entry.deleted = true;
            }
        }
        Ok(marked.len())
    }
}

/// Append-only file implementation of [`UrlRepository`].
///
/// Every successful save appends one JSON line to the file. An in-memory
/// index is rebuilt from the file on open and kept in step with every write,
/// so reads never touch the disk. Looking up by original URL scans the whole
/// index, which is fine for small datasets only.
///
/// Disk I/O runs on tokio's blocking pool, never on a runtime worker.
/// [`FileRepository::open`] is the exception: it reads the whole file
/// synchronously and is meant to be called once at startup.
#[derive(Debug)]
pub struct FileRepository {
    path: PathBuf,
    state: Arc<Mutex<State>>,
}

impl FileRepository {
    /// Opens the storage file, creating it if missing, and replays its
    /// records into the index.
    ///
    /// Lines that cannot be decoded are skipped with a warning; a torn final
    /// line after a crash is the usual cause.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (index, torn_tail) = Self::replay(&path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                StorageError::Unavailable(format!(
                    "failed to open storage file {}: {e}",
                    path.display()
                ))
            })?;

        // Terminate a torn final line so the next record starts on its own.
        if torn_tail {
            file.write_all(b"\n").map_err(|e| {
                StorageError::Unavailable(format!(
                    "failed to repair storage file {}: {e}",
                    path.display()
                ))
            })?;
        }

        let committed_len = file
            .metadata()
            .map_err(|e| {
                StorageError::Unavailable(format!(
                    "failed to stat storage file {}: {e}",
                    path.display()
                ))
            })?
            .len();

        info!(path = %path.display(), records = index.len(), "opened file storage");

        Ok(Self {
            path,
            state: Arc::new(Mutex::new(State {
                file,
                index,
                committed_len,
            })),
        })
    }

    /// Path of the underlying storage file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replay(path: &Path) -> Result<(HashMap<ShortId, Entry>, bool)> {
        let mut index = HashMap::new();

        let contents = match std::fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((index, false)),
            Err(e) => {
                return Err(StorageError::Unavailable(format!(
                    "failed to read storage file {}: {e}",
                    path.display()
                )))
            }
        };

        for (line_no, line) in contents.split(|b| *b == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let record: FileRecord = match serde_json::from_slice(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "skipping undecodable storage line");
                    continue;
                }
            };

            let short_id = ShortId::new(record.short_url);
            if record.is_deleted {
                if let Some(entry) = index.get_mut(&short_id) {
                    entry.deleted = true;
                }
                continue;
            }

            index.insert(
                short_id,
                Entry {
                    uuid: record.uuid,
                    original_url: record.original_url,
                    deleted: false,
                },
            );
        }

        let torn_tail = contents.last().is_some_and(|b| *b != b'\n');
        debug!(path = %path.display(), records = index.len(), "replayed storage file");
        Ok((index, torn_tail))
    }

    /// Runs `op` against the locked state on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut State) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || op(&mut *state.lock()))
            .await
            .map_err(|e| StorageError::WriteFailed(format!("file storage task failed: {e}")))?
    }
}

#[async_trait]
impl UrlRepository for FileRepository {
    async fn save_one(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        let short_id = short_id.clone();
        let original_url = original_url.to_owned();
        self.blocking(move |state| state.insert(&short_id, &original_url))
            .await
    }

    async fn save_batch_item(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        self.save_one(short_id, original_url).await
    }

    async fn lookup_by_short_id(&self, short_id: &ShortId) -> Result<Option<UrlRecord>> {
        let state = self.state.lock();
        Ok(state.index.get(short_id).map(|e| e.to_record(short_id)))
    }

    async fn lookup_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let state = self.state.lock();
        trace!(records = state.index.len(), "scanning file index by original url");
        Ok(state
            .index
            .iter()
            .find(|(_, e)| e.original_url == original_url)
            .map(|(id, e)| e.to_record(id)))
    }

    async fn health_check(&self) -> Result<()> {
        let path = self.path.clone();
        self.blocking(move |state| {
            state.file.metadata().map(|_| ()).map_err(|e| {
                StorageError::Unavailable(format!(
                    "storage file {} is not accessible: {e}",
                    path.display()
                ))
            })
        })
        .await
    }

    async fn batch_soft_delete(&self, short_ids: &[ShortId]) -> Result<()> {
        if short_ids.is_empty() {
            return Ok(());
        }

        let short_ids = short_ids.to_vec();
        let marked = self
            .blocking(move |state| state.soft_delete(&short_ids))
            .await?;
        if marked > 0 {
            debug!(count = marked, "soft-deleted records in file storage");
        }
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::File
    }

    async fn close(&self) {
        let synced = self
            .blocking(|state| {
                state
                    .file
                    .sync_all()
                    .map_err(|e| StorageError::WriteFailed(e.to_string()))
            })
            .await;
        if let Err(e) = synced {
            warn!(path = %self.path.display(), error = %e, "failed to sync storage file on close");
        }
    }
}
