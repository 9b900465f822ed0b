//! Shared test fixtures: a scripted remote service and component wiring.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use rollcall::{
    AttendanceDate, AttendanceService, Diagnostics, Dispatcher, LogStore, LogStoreRef, PersonId,
    Reconciler, ServiceRef, SubmitOutcome,
};

pub fn id(s: &str) -> PersonId {
    PersonId::parse(s).unwrap()
}

pub fn date() -> AttendanceDate {
    AttendanceDate::new(3, 1, 2024).unwrap()
}

/// Scripted stand-in for the remote service.
///
/// Returns a per-identifier scripted outcome, falling back to a default,
/// and records every call so tests can assert that no network call was
/// made.
pub struct ScriptedService {
    outcomes: Mutex<HashMap<PersonId, SubmitOutcome>>,
    default: SubmitOutcome,
    calls: Mutex<Vec<PersonId>>,
}

impl ScriptedService {
    pub fn new(default: SubmitOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(HashMap::new()),
            default,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// A service that accepts everything.
    pub fn accepting() -> Arc<Self> {
        Self::new(SubmitOutcome::Accepted("OK".to_string()))
    }

    /// A service that cannot be reached at all.
    pub fn unreachable() -> Arc<Self> {
        Self::new(SubmitOutcome::Unreachable)
    }

    /// Script the outcome for one identifier.
    pub fn script(&self, id: PersonId, outcome: SubmitOutcome) {
        self.outcomes.lock().unwrap().insert(id, outcome);
    }

    /// Every identifier submitted so far, in call order.
    pub fn calls(&self) -> Vec<PersonId> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AttendanceService for ScriptedService {
    async fn submit(&self, id: PersonId, _date: AttendanceDate) -> SubmitOutcome {
        self.calls.lock().unwrap().push(id);
        self.outcomes
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Wire a store, reconciler and dispatcher over a temp directory.
pub async fn wire(
    temp: &TempDir,
    service: ServiceRef,
    offline: bool,
) -> (LogStoreRef, Arc<Reconciler>, Dispatcher) {
    let store = Arc::new(LogStore::open(temp.path()).await.unwrap());
    let diagnostics = Diagnostics::new(temp.path().join("error.ndjson"));
    let reconciler = Reconciler::new(store.clone(), service.clone());
    let dispatcher = Dispatcher::new(
        store.clone(),
        service,
        reconciler.clone(),
        diagnostics,
        offline,
        8,
    );
    (store, reconciler, dispatcher)
}
