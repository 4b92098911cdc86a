//! Session configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Configurable timeout values (seconds) for response collection.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Per-line wait when collecting a response; 0 blocks until the sentinel.
    #[serde(default = "default_response_seconds")]
    pub response_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            response_seconds: default_response_seconds(),
        }
    }
}

fn default_response_seconds() -> u64 {
    5
}

fn default_sentinel() -> String {
    "[end]\n".into()
}

fn default_child_command() -> String {
    "./run".into()
}

fn default_child_args() -> Vec<String> {
    vec!["rv".into()]
}

/// Session configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Path of the named pipe the child reads commands from.
    pub pipe_in: PathBuf,
    /// Path of the named pipe the child writes output to.
    pub pipe_out: PathBuf,
    /// Directory the child process is launched in.
    pub working_dir: PathBuf,
    /// Literal line marking end-of-response. Normalized to end with `'\n'`.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
    /// Executable launched for the session, resolved against `working_dir`.
    #[serde(default = "default_child_command")]
    pub child_command: String,
    /// Fixed argument list passed to the child.
    #[serde(default = "default_child_args")]
    pub child_args: Vec<String>,
    /// Timeout configuration for response collection.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl SessionConfig {
    /// Build a configuration with default sentinel, command, and timeouts.
    #[must_use]
    pub fn new(
        pipe_in: impl Into<PathBuf>,
        pipe_out: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pipe_in: pipe_in.into(),
            pipe_out: pipe_out.into(),
            working_dir: working_dir.into(),
            sentinel: default_sentinel(),
            child_command: default_child_command(),
            child_args: default_child_args(),
            timeouts: TimeoutConfig::default(),
        }
    }

    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize paths.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Per-line wait for `read_response`, derived from `timeouts`.
    ///
    /// `None` when `response_seconds` is 0: block until the sentinel.
    #[must_use]
    pub fn response_timeout(&self) -> Option<Duration> {
        if self.timeouts.response_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeouts.response_seconds))
        }
    }

    /// Validate and normalize the configuration in place.
    ///
    /// Also callable on hand-built configs before constructing a session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a field is empty, the pipe paths
    /// collide, or `working_dir` does not resolve to a directory.
    pub fn validate(&mut self) -> Result<()> {
        if self.pipe_in.as_os_str().is_empty() || self.pipe_out.as_os_str().is_empty() {
            return Err(AppError::Config("pipe paths must not be empty".into()));
        }

        if self.pipe_in == self.pipe_out {
            return Err(AppError::Config(
                "pipe_in and pipe_out must be distinct paths".into(),
            ));
        }

        if self.child_command.is_empty() {
            return Err(AppError::Config("child_command must not be empty".into()));
        }

        if self.sentinel.trim().is_empty() {
            return Err(AppError::Config("sentinel must not be empty".into()));
        }

        // Comparisons happen against whole lines from the output pipe,
        // which keep their trailing newline.
        if !self.sentinel.ends_with('\n') {
            self.sentinel.push('\n');
        }

        let canonical_dir = self
            .working_dir
            .canonicalize()
            .map_err(|err| AppError::Config(format!("working_dir invalid: {err}")))?;
        if !canonical_dir.is_dir() {
            return Err(AppError::Config(format!(
                "working_dir is not a directory: {}",
                canonical_dir.display()
            )));
        }
        self.working_dir = canonical_dir;

        Ok(())
    }
}
