//! Per-date attendance stores.
//!
//! All durable state lives in one flat data directory, one set of files per
//! attendance date:
//!
//! - `MM-DD-YYYY.log`: event log, identifiers confirmed delivered.
//! - `MM-DD-YYYY.log.failed`: pending queue, identifiers awaiting delivery.
//! - `MM-DD-YYYY.log.failed.lock`: reconciliation lock token (existence-only).
//! - `MM-DD-YYYY.log.failed.new`: staging file for atomic queue replacement.
//!
//! Files are newline-delimited decimal identifiers. A single store-wide
//! mutex serializes every append so that concurrent submission tasks can
//! never interleave partial lines.

pub mod event_log;
pub mod pending;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::prelude::*;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::date::AttendanceDate;
use crate::error::{AppendFileSnafu, CreateDirSnafu, ReadFileSnafu, StoreError};
use crate::types::PersonId;

/// Suffix of event log files.
const EVENT_LOG_SUFFIX: &str = ".log";
/// Suffix of pending queue files, relative to the event log name.
const PENDING_SUFFIX: &str = ".failed";
/// Suffix of reconciliation lock tokens, relative to the pending queue name.
const LOCK_SUFFIX: &str = ".lock";
/// Suffix of replacement staging files, relative to the pending queue name.
const STAGING_SUFFIX: &str = ".new";

/// Reference-counted handle to a [`LogStore`].
pub type LogStoreRef = Arc<LogStore>;

/// Handle to the on-disk attendance stores for one data directory.
pub struct LogStore {
    root: PathBuf,
    /// Serializes every append to every store file.
    append_lock: Mutex<()>,
}

impl LogStore {
    /// Open a store rooted at `root`, creating the directory if absent.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .context(CreateDirSnafu { path: &root })?;
        Ok(Self {
            root,
            append_lock: Mutex::new(()),
        })
    }

    /// The data directory this store is rooted at.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the event log for `date`.
    pub fn event_log_path(&self, date: AttendanceDate) -> PathBuf {
        self.root
            .join(format!("{}{}", date.file_stem(), EVENT_LOG_SUFFIX))
    }

    /// Path of the pending queue for `date`.
    pub fn pending_path(&self, date: AttendanceDate) -> PathBuf {
        let mut name = self.event_log_path(date).into_os_string();
        name.push(PENDING_SUFFIX);
        name.into()
    }

    /// Path of the reconciliation lock token for `date`.
    pub fn lock_token_path(&self, date: AttendanceDate) -> PathBuf {
        let mut name = self.pending_path(date).into_os_string();
        name.push(LOCK_SUFFIX);
        name.into()
    }

    /// Path of the replacement staging file for `date`.
    pub fn staging_path(&self, date: AttendanceDate) -> PathBuf {
        let mut name = self.pending_path(date).into_os_string();
        name.push(STAGING_SUFFIX);
        name.into()
    }

    /// Acquire the store-wide append lock.
    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.append_lock.lock().await
    }

    /// Append one identifier line to `path`, creating the file if absent.
    ///
    /// Callers must hold the append lock.
    pub(crate) async fn append_unlocked(
        &self,
        path: &Path,
        id: PersonId,
    ) -> Result<(), StoreError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context(AppendFileSnafu { path })?;
        file.write_all(format!("{id}\n").as_bytes())
            .await
            .context(AppendFileSnafu { path })?;
        file.flush().await.context(AppendFileSnafu { path })?;
        Ok(())
    }

    /// Read every identifier line from `path`, in file order.
    ///
    /// An absent file reads as empty. Lines that do not parse as a person
    /// identifier are skipped with a warning rather than lost into success.
    pub(crate) async fn read_ids(&self, path: &Path) -> Result<Vec<PersonId>, StoreError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            other => other.context(ReadFileSnafu { path })?,
        };

        let mut ids = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match PersonId::parse(line) {
                Ok(id) => ids.push(id),
                Err(_) => {
                    warn!(path = %path.display(), line, "skipping malformed store line");
                }
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date() -> AttendanceDate {
        AttendanceDate::new(3, 1, 2024).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_data_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("logs");
        assert!(!root.exists());

        LogStore::open(&root).await.unwrap();
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_store_paths_share_stem() {
        let temp = TempDir::new().unwrap();
        let store = LogStore::open(temp.path()).await.unwrap();

        let log = store.event_log_path(date());
        assert!(log.ends_with("03-01-2024.log"));
        assert!(store.pending_path(date()).ends_with("03-01-2024.log.failed"));
        assert!(
            store
                .lock_token_path(date())
                .ends_with("03-01-2024.log.failed.lock")
        );
        assert!(
            store
                .staging_path(date())
                .ends_with("03-01-2024.log.failed.new")
        );
    }

    #[tokio::test]
    async fn test_read_ids_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = LogStore::open(temp.path()).await.unwrap();

        let ids = store.read_ids(&store.event_log_path(date())).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_read_ids_skips_malformed_lines() {
        let temp = TempDir::new().unwrap();
        let store = LogStore::open(temp.path()).await.unwrap();
        let path = store.event_log_path(date());

        std::fs::write(&path, "123456789\nnot-an-id\n\n987654321\n").unwrap();

        let ids = store.read_ids(&path).await.unwrap();
        assert_eq!(
            ids,
            vec![
                PersonId::parse("123456789").unwrap(),
                PersonId::parse("987654321").unwrap(),
            ]
        );
    }
}
