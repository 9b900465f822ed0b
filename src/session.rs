//! Interactive capture session and one-shot operator actions.
//!
//! The capture loop reads scanner input line by line: nine digits are a
//! barcode, anything else is resolved against the roster by prefix. Every
//! accepted capture is handed to the submission pipeline on its own task so
//! scanning never waits on the network. Faults inside a single action are
//! contained: recorded in the diagnostic log, reported as a generic notice,
//! and the session keeps running.

use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use crate::client::{ERROR_MARKER, HttpService};
use crate::config::Config;
use crate::date::AttendanceDate;
use crate::diagnostics::DiagnosticsRef;
use crate::error::{AppError, SaveOutputSnafu};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::roster::{Resolution, Roster};
use crate::store::LogStoreRef;
use crate::submit::Dispatcher;
use crate::types::PersonId;

/// One capture accepted from scanner input.
enum Captured {
    Barcode(PersonId),
    Named { name: String, id: PersonId },
}

impl Captured {
    fn id(&self) -> PersonId {
        match self {
            Captured::Barcode(id) => *id,
            Captured::Named { id, .. } => *id,
        }
    }

    /// How the capture is named in operator notices.
    fn label(&self) -> String {
        match self {
            Captured::Barcode(id) => id.to_string(),
            Captured::Named { name, .. } => name.clone(),
        }
    }
}

/// Operator session: owns the components built from one configuration.
pub struct Session {
    config: Config,
    store: LogStoreRef,
    service: Arc<HttpService>,
    dispatcher: Dispatcher,
    reconciler: Arc<Reconciler>,
    diagnostics: DiagnosticsRef,
}

impl Session {
    pub fn new(
        config: Config,
        store: LogStoreRef,
        service: Arc<HttpService>,
        dispatcher: Dispatcher,
        reconciler: Arc<Reconciler>,
        diagnostics: DiagnosticsRef,
    ) -> Self {
        Self {
            config,
            store,
            service,
            dispatcher,
            reconciler,
            diagnostics,
        }
    }

    /// Run the line-oriented capture loop for `date`.
    ///
    /// Returns when the operator types `back`, input reaches EOF, or an
    /// interrupt arrives; in every case outstanding submissions are drained
    /// before returning.
    pub async fn scan(&mut self, date: AttendanceDate) -> Result<(), AppError> {
        let roster = match Roster::load_or_fetch(&self.config.roster_path, &self.service).await {
            Ok(roster) => Some(roster),
            Err(e) => {
                warn!(error = %e, "roster unavailable; scanning by id only");
                self.diagnostics.report("roster", &e).await;
                None
            }
        };

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Taking attendance for {date}");
        if self.config.offline {
            println!("Running in offline mode");
        }
        println!("Enter \"back\" to go back");

        loop {
            prompt("Enter name or id: ");
            let line = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    break;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => line,
                    _ => break,
                },
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if input == "back" {
                break;
            }

            let Some(captured) = self.capture(input, roster.as_ref(), &mut lines).await else {
                continue;
            };

            match self.store.is_recorded(date, captured.id()).await {
                Ok(true) => {
                    println!("{} already scanned in", captured.label());
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    self.fault("scan", &e).await;
                    continue;
                }
            }

            match &captured {
                Captured::Barcode(id) => println!("Got barcode: {id}"),
                Captured::Named { name, id } => println!("Got {name} - {id}"),
            }
            self.dispatcher.spawn(date, captured.id());
        }

        let in_flight = self.dispatcher.in_flight();
        if in_flight > 0 {
            println!("Waiting for {in_flight} in-flight submission(s)");
        }
        self.dispatcher.drain().await;
        Ok(())
    }

    /// Turn one input line into a capture, prompting for disambiguation
    /// when a name prefix matches several roster entries.
    async fn capture(
        &self,
        input: &str,
        roster: Option<&Roster>,
        lines: &mut Lines<BufReader<Stdin>>,
    ) -> Option<Captured> {
        if input.bytes().all(|b| b.is_ascii_digit()) {
            return match PersonId::parse(input) {
                Ok(id) => Some(Captured::Barcode(id)),
                Err(_) => {
                    println!("Invalid barcode");
                    None
                }
            };
        }

        let Some(roster) = roster else {
            println!("Student not found");
            return None;
        };

        match roster.resolve(input) {
            Resolution::NotFound => {
                println!("Student not found");
                None
            }
            Resolution::One { name, id } => Some(Captured::Named { name, id }),
            Resolution::Many(candidates) => {
                println!("Multiple candidates found:");
                for (index, (name, _)) in candidates.iter().enumerate() {
                    println!("[{}] {name}", index + 1);
                }
                prompt(&format!("[1-{}] ", candidates.len()));

                let choice = lines.next_line().await.ok().flatten()?;
                let selected = choice
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|&n| (1..=candidates.len()).contains(&n));
                match selected {
                    Some(n) => {
                        let (name, id) = candidates[n - 1].clone();
                        Some(Captured::Named { name, id })
                    }
                    None => {
                        println!("Invalid selection");
                        None
                    }
                }
            }
        }
    }

    /// Replay every pending queue and summarize per date.
    pub async fn upload_pending(&self) -> Result<(), AppError> {
        let results = self.reconciler.reconcile_all().await?;
        if results.is_empty() {
            println!("There are no pending IDs");
            return Ok(());
        }

        for (date, outcome) in results {
            match outcome {
                ReconcileOutcome::Drained { uploaded } => {
                    println!("Successfully uploaded all pending IDs ({date}): {uploaded} uploaded");
                }
                ReconcileOutcome::Partial {
                    uploaded,
                    remaining,
                } => {
                    println!(
                        "Failed to upload all pending IDs ({date}): {uploaded} uploaded, {remaining} still pending"
                    );
                }
                ReconcileOutcome::Skipped => {
                    println!("Reconciliation already in progress ({date})");
                }
                ReconcileOutcome::Empty => {}
            }
        }
        Ok(())
    }

    /// Show every recorded attendance event (saved to the output file).
    pub async fn show_all(&self) -> Result<(), AppError> {
        let body = self.service.dump_all().await;
        self.present(body, Some(self.config.output_path.as_path()))
    }

    /// Show attendance for one day (saved to the output file).
    pub async fn show_day(&self, date: AttendanceDate) -> Result<(), AppError> {
        let body = self.service.dump_day(date).await;
        self.present(body, Some(self.config.output_path.as_path()))
    }

    /// Show attendance history for one person (saved to `<id>.log`).
    pub async fn show_student(&self, id: PersonId) -> Result<(), AppError> {
        let body = self.service.dump_student(id).await;
        self.present(body, Some(Path::new(&format!("{id}.log"))))
    }

    /// Export attendance data as CSV.
    pub async fn export(&self, month: Option<u32>, out: Option<PathBuf>) -> Result<(), AppError> {
        let body = self.service.export_csv(month).await;
        let path = out.unwrap_or_else(|| {
            let mut path = self.config.output_path.clone().into_os_string();
            path.push(".csv");
            path.into()
        });
        self.present(body, Some(&path))
    }

    /// Show the percentage of meetings attended by one person.
    pub async fn percentage(&self, id: PersonId) -> Result<(), AppError> {
        let body = self.service.percentage(id).await;
        self.present(body, None)
    }

    /// Delete one recorded event on the server.
    pub async fn delete(&self, id: PersonId, date: AttendanceDate) -> Result<(), AppError> {
        let body = self.service.delete_event(id, date).await;
        self.present(body, None)
    }

    /// Drop all remote attendance data, prompting unless pre-confirmed.
    pub async fn drop_database(&self, confirmed: bool) -> Result<(), AppError> {
        if !confirmed {
            prompt("Are you sure you want to delete all the data? (y/n) ");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let answer = lines.next_line().await.ok().flatten().unwrap_or_default();
            if !answer.trim().eq_ignore_ascii_case("y") {
                println!("Aborting");
                return Ok(());
            }
        }

        println!("Clearing the database...");
        let body = self.service.drop_database().await;
        self.present(body, None)
    }

    /// Surface a one-shot response: contact failures and remote errors are
    /// printed, anything else is printed or saved.
    fn present(&self, body: String, save_to: Option<&Path>) -> Result<(), AppError> {
        if body.is_empty() {
            println!("ERROR: Could not contact server");
        } else if body.contains(ERROR_MARKER) {
            println!("{body}");
        } else if let Some(path) = save_to {
            std::fs::write(path, body).context(SaveOutputSnafu { path })?;
            println!("Output saved to file {}", path.display());
        } else {
            println!("{body}");
        }
        Ok(())
    }

    /// Contain one fault: record it and tell the operator something went
    /// wrong, without ending the session.
    async fn fault(&self, action: &str, error: &(dyn fmt::Display + Send + Sync)) {
        self.diagnostics.report(action, error).await;
        println!("Something went wrong!");
    }
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}
