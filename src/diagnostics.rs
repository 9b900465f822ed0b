//! Diagnostic log for contained faults.
//!
//! Unexpected internal faults during operator-facing actions are appended
//! here as NDJSON records and surfaced as a generic notice; the interactive
//! session itself never terminates because of them. Reporting is
//! best-effort: a fault while writing the fault log is logged and dropped.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::error;

/// Reference-counted handle to a [`Diagnostics`] sink.
pub type DiagnosticsRef = Arc<Diagnostics>;

/// One contained fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultRecord {
    /// The operator-facing action that faulted.
    pub action: String,
    /// Rendered error chain.
    pub error: String,
    /// When the fault was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Append-only NDJSON sink for contained faults.
pub struct Diagnostics {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Diagnostics {
    pub fn new(path: impl Into<PathBuf>) -> DiagnosticsRef {
        Arc::new(Self {
            path: path.into(),
            lock: Mutex::new(()),
        })
    }

    /// Append one fault record.
    pub async fn report(&self, action: &str, fault: &(dyn std::fmt::Display + Send + Sync)) {
        let record = FaultRecord {
            action: action.to_string(),
            error: fault.to_string(),
            timestamp: Utc::now(),
        };

        let mut line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                error!(action, error = %e, "failed to serialize fault record");
                return;
            }
        };
        line.push('\n');

        let _guard = self.lock.lock().await;
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = result {
            error!(action, error = %e, "failed to append fault record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_report_appends_parseable_ndjson() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("error.ndjson");
        let diagnostics = Diagnostics::new(&path);

        diagnostics.report("scan", &"boom").await;
        diagnostics.report("reconcile", &"bust").await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let records: Vec<FaultRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, "scan");
        assert_eq!(records[0].error, "boom");
        assert_eq!(records[1].action, "reconcile");
    }
}
