//! Error types for the rollcall scanner.

use std::path::PathBuf;

use snafu::prelude::*;

use crate::date::DateError;

/// Errors that can occur in the on-disk attendance stores.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// Failed to create the data directory.
    #[snafu(display("failed to create data directory {}", path.display()))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a store file.
    #[snafu(display("failed to read {}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to append to a store file.
    #[snafu(display("failed to append to {}", path.display()))]
    AppendFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a staging file for atomic replacement.
    #[snafu(display("failed to write staging file {}", path.display()))]
    WriteStaging {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to rename a staging file over a store file.
    #[snafu(display("failed to replace {} atomically", path.display()))]
    ReplaceFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to remove a store file.
    #[snafu(display("failed to remove {}", path.display()))]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to list the data directory.
    #[snafu(display("failed to list data directory {}", path.display()))]
    ListDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to create or remove a reconciliation lock token.
    #[snafu(display("failed to manage lock token {}", path.display()))]
    LockToken {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[snafu(display("failed to read configuration file {}", path.display()))]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[snafu(display("failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Environment variable interpolation failed.
    #[snafu(display("environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// No server address configured for an online session.
    #[snafu(display("server address cannot be empty outside offline mode"))]
    EmptyServerAddress,

    /// The data directory is empty.
    #[snafu(display("data directory cannot be empty"))]
    EmptyDataDir,

    /// The in-flight submission bound is zero.
    #[snafu(display("max_in_flight must be at least 1"))]
    ZeroInFlight,
}

/// Errors that can occur loading or refreshing the roster.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RosterError {
    /// The remote service returned nothing usable for the roster export.
    #[snafu(display("could not fetch roster from server"))]
    FetchRoster,

    /// Failed to save a fetched roster locally.
    #[snafu(display("failed to save roster to {}", path.display()))]
    SaveRoster {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read or parse the roster CSV.
    #[snafu(display("failed to read roster {}", path.display()))]
    ReadRoster { path: PathBuf, source: csv::Error },
}

/// Top-level application errors surfaced by the CLI.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AppError {
    /// Store error.
    #[snafu(display("store error: {source}"))]
    Store { source: StoreError },

    /// Configuration error.
    #[snafu(display("configuration error: {source}"))]
    Config { source: ConfigError },

    /// Roster error.
    #[snafu(display("roster error: {source}"))]
    Roster { source: RosterError },

    /// Date error from operator input.
    #[snafu(display("date error: {source}"))]
    Date { source: DateError },

    /// Failed to save a server response to a local file.
    #[snafu(display("failed to save output to {}", path.display()))]
    SaveOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Administrator login was refused by the server.
    #[snafu(display("login failed: {message}"))]
    LoginRefused { message: String },

    /// Failed to build the HTTP client.
    #[snafu(display("failed to build HTTP client"))]
    HttpClient { source: reqwest::Error },
}

impl From<StoreError> for AppError {
    fn from(source: StoreError) -> Self {
        AppError::Store { source }
    }
}

impl From<ConfigError> for AppError {
    fn from(source: ConfigError) -> Self {
        AppError::Config { source }
    }
}

impl From<RosterError> for AppError {
    fn from(source: RosterError) -> Self {
        AppError::Roster { source }
    }
}

impl From<DateError> for AppError {
    fn from(source: DateError) -> Self {
        AppError::Date { source }
    }
}
