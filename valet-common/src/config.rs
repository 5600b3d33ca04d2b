//! Environment-driven configuration overrides.
//!
//! A handful of knobs are exposed as environment variables so CI pipelines
//! can tune them without plumbing extra CLI flags through wrapper scripts.
//! CLI flags always win over these; these win over the platform default.

use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::platform::Platform;

const JOBS_VAR: &str = "VALET_JOBS";
const HOME_VAR: &str = "VALET_HOME";
const GIT_TIMEOUT_VAR: &str = "VALET_GIT_TIMEOUT_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}' is not a valid {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Overrides read once from the environment at process startup.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub jobs: Option<usize>,
    pub home: Option<PathBuf>,
    pub git_timeout_secs: u64,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|name| env::var(name).ok())
    }

    /// Testable variant: `lookup` stands in for `std::env::var` so tests can
    /// inject values without mutating the process environment.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jobs = match lookup(JOBS_VAR) {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                var: JOBS_VAR,
                value: raw,
                expected: "positive integer",
            })?),
            None => None,
        };

        let home = lookup(HOME_VAR).map(PathBuf::from);

        let git_timeout_secs = match lookup(GIT_TIMEOUT_VAR) {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: GIT_TIMEOUT_VAR,
                value: raw,
                expected: "integer seconds",
            })?,
            None => 120,
        };

        if jobs.is_some() || home.is_some() {
            debug!(?jobs, ?home, git_timeout_secs, "environment overrides applied");
        }

        Ok(Self {
            jobs,
            home,
            git_timeout_secs,
        })
    }

    /// Resolve the effective worker count: `cli_jobs` beats the env
    /// override, which beats the platform's recommendation.
    pub fn effective_jobs(&self, cli_jobs: Option<usize>, platform: &Platform) -> usize {
        cli_jobs
            .or(self.jobs)
            .unwrap_or_else(|| platform.default_worker_count())
    }

    /// Root directory for the garage cache and installed binaries,
    /// defaulting to `~/.valet`.
    pub fn valet_home(&self, platform: &Platform) -> Option<PathBuf> {
        self.home.clone().or_else(|| platform.home_dir().map(|h| h.join(".valet")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let cfg = EnvConfig::from_env_with(|_| None).unwrap();
        assert_eq!(cfg.jobs, None);
        assert_eq!(cfg.home, None);
        assert_eq!(cfg.git_timeout_secs, 120);
    }

    #[test]
    fn parses_overrides() {
        let cfg = EnvConfig::from_env_with(|name| match name {
            "VALET_JOBS" => Some("4".to_string()),
            "VALET_HOME" => Some("/tmp/valet-home".to_string()),
            "VALET_GIT_TIMEOUT_SECS" => Some("30".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.jobs, Some(4));
        assert_eq!(cfg.home, Some(PathBuf::from("/tmp/valet-home")));
        assert_eq!(cfg.git_timeout_secs, 30);
    }

    #[test]
    fn rejects_malformed_jobs() {
        let err = EnvConfig::from_env_with(|name| {
            (name == "VALET_JOBS").then(|| "not-a-number".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "VALET_JOBS",
                value: "not-a-number".to_string(),
                expected: "positive integer",
            }
        );
    }

    #[test]
    fn cli_jobs_wins_over_env() {
        let cfg = EnvConfig::from_env_with(|name| (name == "VALET_JOBS").then(|| "4".to_string())).unwrap();
        let platform = Platform::Linux;
        assert_eq!(cfg.effective_jobs(Some(8), &platform), 8);
        assert_eq!(cfg.effective_jobs(None, &platform), 4);
    }
}
