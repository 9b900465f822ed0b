//! Remote attendance service contract and HTTP implementation.
//!
//! The service speaks a plain-text request/response protocol: every call is
//! a form POST and the body that comes back is the whole answer. The core
//! consumes exactly three shapes of body, captured by [`SubmitOutcome`]:
//! empty means the service could not be contacted, a body carrying the
//! error marker means the service rejected the event, anything else means
//! success. Transport failures fold into the empty shape rather than into a
//! crate error.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::date::AttendanceDate;
use crate::types::PersonId;

/// Substring marking a remote-reported business error in a response body.
pub const ERROR_MARKER: &str = "ERROR";

/// Substring marking a successful administrator login.
pub const SUCCESS_MARKER: &str = "SUCCESS";

/// Classification of a remote response to an event submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The service could not be contacted, or returned an empty body.
    Unreachable,
    /// The service explicitly rejected the event; retrying is futile
    /// without operator intervention.
    Rejected(String),
    /// The service confirmed the event.
    Accepted(String),
}

impl SubmitOutcome {
    /// Classify a raw response body.
    pub fn classify(body: &str) -> Self {
        let body = body.trim();
        if body.is_empty() {
            SubmitOutcome::Unreachable
        } else if body.contains(ERROR_MARKER) {
            SubmitOutcome::Rejected(body.to_string())
        } else {
            SubmitOutcome::Accepted(body.to_string())
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }

    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SubmitOutcome::Unreachable => "unreachable",
            SubmitOutcome::Rejected(_) => "rejected",
            SubmitOutcome::Accepted(_) => "accepted",
        }
    }
}

/// The single seam between the core and the remote service.
///
/// Production uses [`HttpService`]; tests substitute a scripted mock.
#[async_trait]
pub trait AttendanceService: Send + Sync {
    /// Submit one attendance event and classify the response.
    async fn submit(&self, id: PersonId, date: AttendanceDate) -> SubmitOutcome;
}

/// Reference-counted handle to an [`AttendanceService`].
pub type ServiceRef = Arc<dyn AttendanceService>;

/// Administrator credentials attached to privileged requests.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Outcome of an administrator login attempt.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub accepted: bool,
    pub message: String,
}

/// HTTP client for the remote attendance service.
pub struct HttpService {
    client: reqwest::Client,
    base_url: String,
    /// Set once a login succeeds; attached to every later request.
    credentials: Mutex<Option<Credentials>>,
}

impl HttpService {
    /// Build a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            base_url: base_url.into(),
            credentials: Mutex::new(None),
        })
    }

    /// POST form fields to `path` and return the trimmed response body.
    ///
    /// Any transport failure collapses to an empty body, which downstream
    /// classification reads as "could not contact server".
    async fn post_raw(&self, path: &str, fields: &[(&'static str, String)]) -> String {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response =
            async { self.client.post(&url).form(fields).send().await?.text().await }.await;

        match response {
            Ok(body) => body.trim().to_string(),
            Err(e) => {
                debug!(url = %url, error = %e, "request failed");
                String::new()
            }
        }
    }

    /// [`Self::post_raw`], with any held administrator credentials attached.
    async fn send(&self, path: &str, mut fields: Vec<(&'static str, String)>) -> String {
        if let Some(creds) = self.credentials.lock().await.clone() {
            fields.push(("email", creds.email));
            fields.push(("pass", creds.password));
        }
        self.post_raw(path, &fields).await
    }

    fn date_fields(date: AttendanceDate) -> Vec<(&'static str, String)> {
        vec![
            ("month", date.month().to_string()),
            ("day", date.day().to_string()),
            ("year", date.year().to_string()),
        ]
    }

    /// Verify administrator credentials against the service.
    ///
    /// On success the credentials are retained and attached to every later
    /// request from this client.
    pub async fn login(&self, email: &str, password: &str) -> LoginOutcome {
        let mut fields = vec![
            ("email", email.to_string()),
            ("pass", password.to_string()),
        ];
        fields.extend(Self::date_fields(AttendanceDate::today()));

        let body = self.post_raw("/", &fields).await;

        if body.contains(SUCCESS_MARKER) {
            *self.credentials.lock().await = Some(Credentials {
                email: email.to_string(),
                password: password.to_string(),
            });
            LoginOutcome {
                accepted: true,
                message: body,
            }
        } else {
            let message = if body.is_empty() {
                "could not contact server".to_string()
            } else {
                body
            };
            LoginOutcome {
                accepted: false,
                message,
            }
        }
    }

    /// Dump every recorded attendance event.
    pub async fn dump_all(&self) -> String {
        self.send("/dump", Vec::new()).await
    }

    /// Dump attendance for one day.
    pub async fn dump_day(&self, date: AttendanceDate) -> String {
        self.send("/day", Self::date_fields(date)).await
    }

    /// Dump attendance history for one person.
    pub async fn dump_student(&self, id: PersonId) -> String {
        self.send("/student", vec![("id", id.to_string())]).await
    }

    /// Export attendance data as CSV, optionally limited to one month.
    pub async fn export_csv(&self, month: Option<u32>) -> String {
        let mut fields = Vec::new();
        if let Some(month) = month {
            fields.push(("month", month.to_string()));
        }
        self.send("/csv", fields).await
    }

    /// Percentage of meetings attended by one person.
    pub async fn percentage(&self, id: PersonId) -> String {
        self.send("/percent", vec![("id", id.to_string())]).await
    }

    /// Delete one recorded event (privileged).
    pub async fn delete_event(&self, id: PersonId, date: AttendanceDate) -> String {
        let mut fields = Self::date_fields(date);
        fields.push(("id", id.to_string()));
        self.send("/delete", fields).await
    }

    /// Drop all remote attendance data (privileged).
    pub async fn drop_database(&self) -> String {
        self.send("/dropdb", Vec::new()).await
    }
}

#[async_trait]
impl AttendanceService for HttpService {
    async fn submit(&self, id: PersonId, date: AttendanceDate) -> SubmitOutcome {
        let mut fields = vec![("id", id.to_string())];
        fields.extend(Self::date_fields(date));
        let body = self.send("/", fields).await;
        SubmitOutcome::classify(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_empty_is_unreachable() {
        assert_eq!(SubmitOutcome::classify(""), SubmitOutcome::Unreachable);
        assert_eq!(SubmitOutcome::classify("  \n"), SubmitOutcome::Unreachable);
    }

    #[test]
    fn test_classify_error_marker_is_rejected() {
        assert_eq!(
            SubmitOutcome::classify("ERROR: student not enrolled"),
            SubmitOutcome::Rejected("ERROR: student not enrolled".to_string())
        );
        // Marker anywhere in the body counts.
        assert_eq!(
            SubmitOutcome::classify("upstream said ERROR"),
            SubmitOutcome::Rejected("upstream said ERROR".to_string())
        );
    }

    #[test]
    fn test_classify_other_bodies_are_accepted() {
        assert_eq!(
            SubmitOutcome::classify("Recorded 123456789\n"),
            SubmitOutcome::Accepted("Recorded 123456789".to_string())
        );
        assert!(SubmitOutcome::classify("OK").is_accepted());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(SubmitOutcome::Unreachable.label(), "unreachable");
        assert_eq!(SubmitOutcome::Rejected(String::new()).label(), "rejected");
        assert_eq!(SubmitOutcome::Accepted(String::new()).label(), "accepted");
    }
}
