//! Rollcall: offline-resilient attendance scanner.
//!
//! This crate handles:
//! - Per-date append-only event logs of delivered attendance events
//! - Per-date pending queues for events that failed remote submission
//! - An asynchronous submission pipeline with a duplicate guard
//! - Lock-token-guarded reconciliation that replays pending queues
//! - A thin interactive capture session and one-shot report commands

pub mod client;
pub mod config;
pub mod date;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod reconcile;
pub mod roster;
pub mod session;
pub mod store;
pub mod submit;
pub mod types;

// Re-export commonly used items
pub use client::{AttendanceService, HttpService, ServiceRef, SubmitOutcome};
pub use config::Config;
pub use date::AttendanceDate;
pub use diagnostics::{Diagnostics, DiagnosticsRef};
pub use error::{AppError, ConfigError, RosterError, StoreError};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use roster::{Resolution, Roster};
pub use session::Session;
pub use store::{LogStore, LogStoreRef};
pub use submit::{Dispatcher, SubmitStatus};
pub use types::PersonId;
