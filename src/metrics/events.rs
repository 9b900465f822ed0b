//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in the submission
//! pipeline or the reconciliation engine.

use metrics::counter;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when a live submission completes, however it went.
pub struct EventSubmitted {
    /// Outcome label: "accepted", "rejected" or "unreachable".
    pub outcome: &'static str,
}

impl InternalEvent for EventSubmitted {
    fn emit(self) {
        trace!(outcome = self.outcome, "Event submitted");
        counter!("rollcall_events_submitted_total", "outcome" => self.outcome).increment(1);
    }
}

/// Event emitted when an identifier is appended to a pending queue.
pub struct EventEnqueued;

impl InternalEvent for EventEnqueued {
    fn emit(self) {
        trace!("Event enqueued");
        counter!("rollcall_events_enqueued_total").increment(1);
    }
}

/// Event emitted when an identifier is recorded as delivered.
pub struct EventRecorded;

impl InternalEvent for EventRecorded {
    fn emit(self) {
        trace!("Event recorded");
        counter!("rollcall_events_recorded_total").increment(1);
    }
}

/// Event emitted when a reconciliation pass finishes.
pub struct ReconcilePass {
    /// Outcome label: "skipped", "empty", "drained" or "partial".
    pub outcome: &'static str,
}

impl InternalEvent for ReconcilePass {
    fn emit(self) {
        trace!(outcome = self.outcome, "Reconciliation pass");
        counter!("rollcall_reconcile_passes_total", "outcome" => self.outcome).increment(1);
    }
}

/// Event emitted for identifiers replayed during reconciliation.
pub struct PendingReplayed {
    pub count: u64,
}

impl InternalEvent for PendingReplayed {
    fn emit(self) {
        trace!(count = self.count, "Pending identifiers replayed");
        counter!("rollcall_pending_replayed_total").increment(self.count);
    }
}
