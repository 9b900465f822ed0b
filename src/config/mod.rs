//! Configuration for the rollcall scanner.

mod vars;

pub use vars::{InterpolationResult, interpolate};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::error::{ConfigError, ReadConfigSnafu};

/// Main configuration, owned by the process entry point and handed to each
/// component at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the remote attendance service.
    #[serde(default)]
    pub server_address: String,
    /// Directory holding the per-date event logs and pending queues.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Local roster CSV (fetched from the service when absent).
    #[serde(default = "default_roster_path")]
    pub roster_path: PathBuf,
    /// Where one-shot report output is saved.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// NDJSON diagnostic log for contained faults.
    #[serde(default = "default_diagnostics_path")]
    pub diagnostics_path: PathBuf,
    /// Deliberate offline mode: queue everything, never touch the network.
    #[serde(default)]
    pub offline: bool,
    /// Bound on concurrently in-flight submissions.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_roster_path() -> PathBuf {
    PathBuf::from("STUDENTS.csv")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("OUT")
}

fn default_diagnostics_path() -> PathBuf {
    PathBuf::from("error.ndjson")
}

fn default_max_in_flight() -> usize {
    16
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            data_dir: default_data_dir(),
            roster_path: default_roster_path(),
            output_path: default_output_path(),
            diagnostics_path: default_diagnostics_path(),
            offline: false,
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).context(ReadConfigSnafu { path })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let result = interpolate(contents);
        if !result.is_ok() {
            return Err(ConfigError::EnvInterpolation {
                message: result.errors.join("\n"),
            });
        }

        let config: Config = serde_yaml::from_str(&result.text)
            .map_err(|source| ConfigError::YamlParse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// An empty server address is only acceptable in offline mode, where
    /// the network is never touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_address.is_empty() && !self.offline {
            return Err(ConfigError::EmptyServerAddress);
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroInFlight);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::parse("server_address: https://attendance.example.org\n").unwrap();
        assert_eq!(config.server_address, "https://attendance.example.org");
        assert_eq!(config.data_dir, PathBuf::from("logs"));
        assert_eq!(config.roster_path, PathBuf::from("STUDENTS.csv"));
        assert_eq!(config.max_in_flight, 16);
        assert!(!config.offline);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server_address: https://attendance.example.org
data_dir: /var/lib/rollcall
roster_path: roster.csv
offline: true
max_in_flight: 4
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/rollcall"));
        assert_eq!(config.max_in_flight, 4);
        assert!(config.offline);
    }

    #[test]
    fn test_offline_permits_empty_server() {
        let config = Config::parse("offline: true\n").unwrap();
        assert!(config.server_address.is_empty());
    }

    #[test]
    fn test_online_requires_server() {
        assert!(matches!(
            Config::parse("data_dir: logs\n"),
            Err(ConfigError::EmptyServerAddress)
        ));
    }

    #[test]
    fn test_zero_in_flight_rejected() {
        let yaml = "server_address: https://a.example\nmax_in_flight: 0\n";
        assert!(matches!(
            Config::parse(yaml),
            Err(ConfigError::ZeroInFlight)
        ));
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(matches!(
            Config::parse("server_address: [unclosed"),
            Err(ConfigError::YamlParse { .. })
        ));
    }
}
