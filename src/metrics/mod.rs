//! Metrics infrastructure for rollcall.
//!
//! Events are emitted through the `metrics` facade; a process that wants to
//! export them installs a recorder, everything else gets no-ops.

pub mod events;

/// Emit an internal event as a metric.
///
/// Calls [`events::InternalEvent::emit`] on the given event, recording the
/// corresponding counter.
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
