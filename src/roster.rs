//! Roster lookup: display name to person identifier.
//!
//! The roster is a static mapping loaded once per capture session from a
//! local CSV export (`id,name` with a header row). When the file is absent
//! it is fetched from the remote service's CSV export first, matching how a
//! fresh deployment bootstraps itself.

use std::collections::HashMap;
use std::path::Path;

use snafu::prelude::*;
use tracing::{info, warn};

use crate::client::HttpService;
use crate::error::{FetchRosterSnafu, ReadRosterSnafu, RosterError, SaveRosterSnafu};
use crate::types::PersonId;

/// Result of resolving a typed name against the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No roster entry starts with the query.
    NotFound,
    /// Exactly one candidate.
    One { name: String, id: PersonId },
    /// Several candidates; disambiguation is the caller's job.
    Many(Vec<(String, PersonId)>),
}

/// In-memory display-name → identifier mapping.
pub struct Roster {
    by_name: HashMap<String, PersonId>,
}

impl Roster {
    /// Load the roster from a CSV file.
    ///
    /// Rows whose identifier column does not parse are skipped with a
    /// warning rather than failing the whole roster.
    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let mut reader = csv::Reader::from_path(path).context(ReadRosterSnafu { path })?;

        let mut by_name = HashMap::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.context(ReadRosterSnafu { path })?;
            let (Some(raw_id), Some(name)) = (record.get(0), record.get(1)) else {
                warn!(row, "skipping roster row with missing columns");
                continue;
            };
            match PersonId::parse(raw_id) {
                Ok(id) => {
                    by_name.insert(name.trim().to_string(), id);
                }
                Err(_) => {
                    warn!(row, raw_id, "skipping roster row with malformed id");
                }
            }
        }

        info!(entries = by_name.len(), "loaded roster");
        Ok(Self { by_name })
    }

    /// Load the roster, fetching it from the service first if the local
    /// file is absent.
    pub async fn load_or_fetch(path: &Path, service: &HttpService) -> Result<Self, RosterError> {
        if !path.exists() {
            info!(path = %path.display(), "roster missing; fetching from server");
            let body = service.export_csv(None).await;
            ensure!(!body.is_empty(), FetchRosterSnafu);
            tokio::fs::write(path, body)
                .await
                .context(SaveRosterSnafu { path })?;
        }
        Self::load(path)
    }

    /// Resolve a typed name by case-insensitive prefix match.
    pub fn resolve(&self, query: &str) -> Resolution {
        let query = query.trim().to_lowercase();
        let mut candidates: Vec<(String, PersonId)> = self
            .by_name
            .iter()
            .filter(|(name, _)| name.to_lowercase().starts_with(&query))
            .map(|(name, id)| (name.clone(), *id))
            .collect();

        match candidates.len() {
            0 => Resolution::NotFound,
            1 => {
                let (name, id) = candidates.remove(0);
                Resolution::One { name, id }
            }
            _ => {
                // Stable presentation order for the disambiguation prompt.
                candidates.sort();
                Resolution::Many(candidates)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_roster(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("STUDENTS.csv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn sample() -> &'static str {
        "id,name\n\
         123456789,Alice Smith\n\
         234567890,Alan Jones\n\
         345678901,Bob Brown\n"
    }

    #[test]
    fn test_load_skips_header_and_bad_rows() {
        let temp = TempDir::new().unwrap();
        let path = write_roster(
            &temp,
            "id,name\n123456789,Alice Smith\nnot-an-id,Ghost\n",
        );

        let roster = Roster::load(&path).unwrap();
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_resolve_unique_prefix() {
        let temp = TempDir::new().unwrap();
        let roster = Roster::load(&write_roster(&temp, sample())).unwrap();

        let resolution = roster.resolve("bob");
        assert_eq!(
            resolution,
            Resolution::One {
                name: "Bob Brown".to_string(),
                id: PersonId::parse("345678901").unwrap(),
            }
        );
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let temp = TempDir::new().unwrap();
        let roster = Roster::load(&write_roster(&temp, sample())).unwrap();

        let Resolution::Many(candidates) = roster.resolve("al") else {
            panic!("expected multiple candidates");
        };
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].0, "Alan Jones");
        assert_eq!(candidates[1].0, "Alice Smith");
    }

    #[test]
    fn test_resolve_not_found() {
        let temp = TempDir::new().unwrap();
        let roster = Roster::load(&write_roster(&temp, sample())).unwrap();

        assert_eq!(roster.resolve("zzz"), Resolution::NotFound);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let roster = Roster::load(&write_roster(&temp, sample())).unwrap();

        assert!(matches!(roster.resolve("ALICE"), Resolution::One { .. }));
    }
}
