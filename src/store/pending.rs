//! Pending queue operations: the per-date record of undelivered identifiers.
//!
//! Unlike the event log, the pending queue allows repeats (each occurrence
//! is one failed attempt) and is rewritten wholesale during reconciliation.
//! Entries are only ever removed by [`LogStore::replace`] or
//! [`LogStore::clear`], never by [`LogStore::drain`], so a crash in the
//! middle of a reconciliation pass cannot lose queued identifiers.

use snafu::prelude::*;
use tracing::warn;

use crate::date::AttendanceDate;
use crate::error::{ListDirSnafu, RemoveFileSnafu, ReplaceFileSnafu, StoreError, WriteStagingSnafu};
use crate::store::{EVENT_LOG_SUFFIX, LogStore, PENDING_SUFFIX};
use crate::types::PersonId;

impl LogStore {
    /// Append `id` to the pending queue for `date`.
    pub async fn enqueue(&self, date: AttendanceDate, id: PersonId) -> Result<(), StoreError> {
        let path = self.pending_path(date);
        let _guard = self.lock().await;
        self.append_unlocked(&path, id).await
    }

    /// Read all queued identifiers for `date` in enqueue order, without
    /// removing them.
    pub async fn drain(&self, date: AttendanceDate) -> Result<Vec<PersonId>, StoreError> {
        let path = self.pending_path(date);
        let _guard = self.lock().await;
        self.read_ids(&path).await
    }

    /// Atomically overwrite the pending queue for `date` with exactly `ids`.
    ///
    /// The replacement is written to a staging file and renamed over the
    /// queue, so the queue is never observed half-written: a crash before
    /// the rename leaves the original content fully intact.
    pub async fn replace(
        &self,
        date: AttendanceDate,
        ids: &[PersonId],
    ) -> Result<(), StoreError> {
        let staging = self.staging_path(date);
        let path = self.pending_path(date);

        let mut contents = String::new();
        for id in ids {
            contents.push_str(&id.to_string());
            contents.push('\n');
        }

        let _guard = self.lock().await;
        tokio::fs::write(&staging, contents)
            .await
            .context(WriteStagingSnafu { path: &staging })?;
        tokio::fs::rename(&staging, &path)
            .await
            .context(ReplaceFileSnafu { path: &path })?;
        Ok(())
    }

    /// Remove the pending queue file for `date` entirely.
    pub async fn clear(&self, date: AttendanceDate) -> Result<(), StoreError> {
        let path = self.pending_path(date);
        let _guard = self.lock().await;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other.context(RemoveFileSnafu { path }),
        }
    }

    /// Every date that currently has a pending queue file.
    ///
    /// Drives the explicit all-dates reconciliation sweep. Stray files whose
    /// stem does not parse as a date are skipped with a warning.
    pub async fn dates_with_pending(&self) -> Result<Vec<AttendanceDate>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .context(ListDirSnafu { path: &self.root })?;

        let mut dates = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .context(ListDirSnafu { path: &self.root })?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(log_name) = name.strip_suffix(PENDING_SUFFIX) else {
                continue;
            };
            let Some(stem) = log_name.strip_suffix(EVENT_LOG_SUFFIX) else {
                continue;
            };
            match AttendanceDate::parse_stem(stem) {
                Ok(date) => dates.push(date),
                Err(_) => {
                    warn!(file = name, "skipping pending queue with unparseable date");
                }
            }
        }

        // Directory order is platform-dependent; sweep oldest first.
        dates.sort_by_key(|d| (d.year(), d.month(), d.day()));
        Ok(dates)
    }
}
