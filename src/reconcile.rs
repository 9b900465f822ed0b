//! Pending-queue reconciliation.
//!
//! A reconciliation pass replays one date's pending queue against the
//! remote service and rebuilds the queue from only the identifiers that
//! still fail. Passes for the same date are mutually exclusive across the
//! whole host, not just this process: the pass holds a lock token file next
//! to the queue, and a second pass that observes the token no-ops. The
//! token is filesystem-based on purpose, so the auto-trigger after a live
//! success and an explicit operator sweep cannot interleave their
//! read-modify-replace cycles.
//!
//! This is a single-host design. A distributed deployment would need a real
//! distributed lock or a single-owner queue consumer; that is a known
//! scaling boundary, not a defect.

use std::sync::Arc;

use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::client::{ServiceRef, SubmitOutcome};
use crate::date::AttendanceDate;
use crate::emit;
use crate::error::{LockTokenSnafu, StoreError};
use crate::metrics::events::{PendingReplayed, ReconcilePass};
use crate::store::LogStoreRef;

/// Result of one reconciliation pass for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Another pass holds this date's lock token; nothing was done.
    Skipped,
    /// The pending queue was absent or empty.
    Empty,
    /// Every queued identifier was resolved; the queue file is gone.
    Drained { uploaded: usize },
    /// Some identifiers still fail; the queue was rebuilt from them.
    Partial { uploaded: usize, remaining: usize },
}

impl ReconcileOutcome {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Skipped => "skipped",
            ReconcileOutcome::Empty => "empty",
            ReconcileOutcome::Drained { .. } => "drained",
            ReconcileOutcome::Partial { .. } => "partial",
        }
    }
}

/// Replays pending queues against the remote service.
pub struct Reconciler {
    store: LogStoreRef,
    service: ServiceRef,
}

impl Reconciler {
    pub fn new(store: LogStoreRef, service: ServiceRef) -> Arc<Self> {
        Arc::new(Self { store, service })
    }

    /// Run one reconciliation pass for `date`.
    ///
    /// The lock token is released on every exit path past acquisition,
    /// including replay errors.
    pub async fn reconcile(&self, date: AttendanceDate) -> Result<ReconcileOutcome, StoreError> {
        if !self.acquire_token(date).await? {
            debug!(date = %date.file_stem(), "reconciliation already in progress");
            emit!(ReconcilePass {
                outcome: ReconcileOutcome::Skipped.label()
            });
            return Ok(ReconcileOutcome::Skipped);
        }

        let outcome = self.run_locked(date).await;
        let released = self.release_token(date).await;

        let outcome = outcome?;
        released?;

        emit!(ReconcilePass {
            outcome: outcome.label()
        });
        Ok(outcome)
    }

    /// Sweep every date that currently has a pending queue.
    ///
    /// One date's failure never aborts the sweep of its siblings; failed
    /// dates are logged and skipped.
    pub async fn reconcile_all(
        &self,
    ) -> Result<Vec<(AttendanceDate, ReconcileOutcome)>, StoreError> {
        let dates = self.store.dates_with_pending().await?;
        if dates.is_empty() {
            info!("there are no pending IDs");
            return Ok(Vec::new());
        }

        info!(dates = dates.len(), "preparing to upload all pending IDs");
        let mut results = Vec::new();
        for date in dates {
            match self.reconcile(date).await {
                Ok(outcome) => results.push((date, outcome)),
                Err(e) => {
                    warn!(date = %date, error = %e, "reconciliation failed for date");
                }
            }
        }
        Ok(results)
    }

    /// Create the lock token for `date`.
    ///
    /// Returns `false` if the token already exists, meaning another pass
    /// owns this date.
    async fn acquire_token(&self, date: AttendanceDate) -> Result<bool, StoreError> {
        let path = self.store.lock_token_path(date);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(source) => Err(source).context(LockTokenSnafu { path }),
        }
    }

    async fn release_token(&self, date: AttendanceDate) -> Result<(), StoreError> {
        let path = self.store.lock_token_path(date);
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other.context(LockTokenSnafu { path }),
        }
    }

    /// The drain/replay/rebuild cycle, run while holding the lock token.
    async fn run_locked(&self, date: AttendanceDate) -> Result<ReconcileOutcome, StoreError> {
        let pending = self.store.drain(date).await?;
        if pending.is_empty() {
            return Ok(ReconcileOutcome::Empty);
        }

        info!(count = pending.len(), "preparing to upload pending IDs ({date})");
        emit!(PendingReplayed {
            count: pending.len() as u64
        });

        // Identifiers that still fail accumulate here rather than in the
        // live queue, so concurrent new enqueues are not interleaved into
        // the rebuild.
        let mut still_failing = Vec::new();
        let mut uploaded = 0usize;

        for id in pending {
            match self.service.submit(id, date).await {
                SubmitOutcome::Unreachable => still_failing.push(id),
                SubmitOutcome::Accepted(_) => {
                    self.store.record(date, id).await?;
                    uploaded += 1;
                }
                SubmitOutcome::Rejected(message) => {
                    // The service has seen and refused this event; replaying
                    // it again would repeat the same refusal.
                    warn!(%id, %message, "identifier rejected during reconciliation");
                }
            }
        }

        if still_failing.is_empty() {
            self.store.clear(date).await?;
            info!("successfully uploaded all pending IDs ({date})");
            Ok(ReconcileOutcome::Drained { uploaded })
        } else {
            let remaining = still_failing.len();
            self.store.replace(date, &still_failing).await?;
            warn!(remaining, "failed to upload all pending IDs ({date})");
            Ok(ReconcileOutcome::Partial {
                uploaded,
                remaining,
            })
        }
    }
}
