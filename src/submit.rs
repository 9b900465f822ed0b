//! Asynchronous submission pipeline.
//!
//! Every captured event is submitted on its own spawned task so the
//! operator can keep scanning while a slow network call is in flight. A
//! semaphore bounds total in-flight submissions; no ordering is guaranteed
//! across identifiers. The outcome of each attempt routes the identifier to
//! the event log (delivered), the pending queue (unreachable), or nowhere
//! (rejected by the service).

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::client::{ServiceRef, SubmitOutcome};
use crate::date::AttendanceDate;
use crate::diagnostics::DiagnosticsRef;
use crate::emit;
use crate::error::StoreError;
use crate::metrics::events::{EventEnqueued, EventRecorded, EventSubmitted};
use crate::reconcile::Reconciler;
use crate::store::LogStoreRef;
use crate::types::PersonId;

/// How one submission was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    /// The identifier was already in the date's event log; no network call
    /// was made.
    AlreadyRecorded,
    /// Delivered and recorded in the event log.
    Recorded,
    /// Not delivered; queued for later reconciliation.
    Queued,
    /// Refused by the service; neither recorded nor queued.
    Rejected(String),
}

/// Dispatches captured events to the remote service.
///
/// Owns the set of in-flight submission tasks; [`Dispatcher::drain`] must
/// run before the process exits so no submission is abandoned by a clean
/// shutdown.
pub struct Dispatcher {
    inner: Arc<Inner>,
    tasks: JoinSet<()>,
}

struct Inner {
    store: LogStoreRef,
    service: ServiceRef,
    reconciler: Arc<Reconciler>,
    diagnostics: DiagnosticsRef,
    /// Deliberate offline mode: never touch the network, queue everything.
    offline: bool,
    permits: Semaphore,
}

impl Dispatcher {
    pub fn new(
        store: LogStoreRef,
        service: ServiceRef,
        reconciler: Arc<Reconciler>,
        diagnostics: DiagnosticsRef,
        offline: bool,
        max_in_flight: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                service,
                reconciler,
                diagnostics,
                offline,
                permits: Semaphore::new(max_in_flight),
            }),
            tasks: JoinSet::new(),
        }
    }

    /// Submit one event on its own task and return immediately.
    pub fn spawn(&mut self, date: AttendanceDate, id: PersonId) {
        let inner = self.inner.clone();
        self.tasks.spawn(async move {
            let _permit = inner
                .permits
                .acquire()
                .await
                .expect("submission semaphore closed");
            if let Err(e) = inner.submit(date, id).await {
                error!(%id, error = %e, "submission failed");
                inner.diagnostics.report("submit", &e).await;
            }
        });
    }

    /// Submit one event inline and report how it was resolved.
    pub async fn submit_now(
        &self,
        date: AttendanceDate,
        id: PersonId,
    ) -> Result<SubmitStatus, StoreError> {
        self.inner.submit(date, id).await
    }

    /// Wait for every in-flight submission to finish.
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "submission task panicked");
            }
        }
    }

    /// Number of submissions not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }
}

impl Inner {
    async fn submit(&self, date: AttendanceDate, id: PersonId) -> Result<SubmitStatus, StoreError> {
        // Duplicate guard: an already-recorded identifier is rejected
        // before any network call.
        if self.store.is_recorded(date, id).await? {
            info!(%id, "{id} already scanned in ({date})");
            return Ok(SubmitStatus::AlreadyRecorded);
        }

        if self.offline {
            self.store.enqueue(date, id).await?;
            emit!(EventEnqueued);
            info!(%id, "offline: queued {id} for later upload ({date})");
            return Ok(SubmitStatus::Queued);
        }

        let outcome = self.service.submit(id, date).await;
        emit!(EventSubmitted {
            outcome: outcome.label()
        });

        match outcome {
            SubmitOutcome::Unreachable => {
                warn!(%id, "could not contact server; queued {id} for later upload");
                self.store.enqueue(date, id).await?;
                emit!(EventEnqueued);
                Ok(SubmitStatus::Queued)
            }
            SubmitOutcome::Rejected(message) => {
                warn!(%id, "{message}");
                Ok(SubmitStatus::Rejected(message))
            }
            SubmitOutcome::Accepted(message) => {
                self.store.record(date, id).await?;
                emit!(EventRecorded);
                info!(%id, "{message}");

                // One success implies connectivity is back; flush any
                // backlog for this date. A reconciliation failure must not
                // taint the submission, which is already recorded.
                if let Err(e) = self.reconciler.reconcile(date).await {
                    error!(error = %e, "post-success reconciliation failed");
                    self.diagnostics.report("reconcile", &e).await;
                }

                Ok(SubmitStatus::Recorded)
            }
        }
    }
}
