//! Event log operations: the per-date record of delivered identifiers.
//!
//! An identifier appears in a date's event log at most once. The duplicate
//! scan and the append in [`LogStore::record`] run as one critical section
//! under the store-wide lock, so two concurrent submissions for the same
//! identifier cannot both append.

use std::path::Path;

use tracing::debug;

use crate::date::AttendanceDate;
use crate::error::StoreError;
use crate::store::LogStore;
use crate::types::PersonId;

impl LogStore {
    /// True iff `id` is already recorded as delivered for `date`.
    ///
    /// A missing event log reads as "not recorded", not as an error. The
    /// scan is linear; per-day cardinality is bounded by daily attendance
    /// volume, so no index is kept.
    pub async fn is_recorded(
        &self,
        date: AttendanceDate,
        id: PersonId,
    ) -> Result<bool, StoreError> {
        let path = self.event_log_path(date);
        self.contains(&path, id).await
    }

    /// Record `id` as delivered for `date`.
    ///
    /// Returns `true` if the identifier was newly appended, `false` if it
    /// was already present. Check and append run under the same lock
    /// acquisition, so the at-most-once-per-date invariant holds even when
    /// two submissions for the same identifier race.
    pub async fn record(&self, date: AttendanceDate, id: PersonId) -> Result<bool, StoreError> {
        let path = self.event_log_path(date);
        let _guard = self.lock().await;

        if self.contains(&path, id).await? {
            debug!(%id, date = %date.file_stem(), "identifier already recorded");
            return Ok(false);
        }
        self.append_unlocked(&path, id).await?;
        Ok(true)
    }

    async fn contains(&self, path: &Path, id: PersonId) -> Result<bool, StoreError> {
        Ok(self.read_ids(path).await?.contains(&id))
    }
}
