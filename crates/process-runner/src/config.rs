//! Configuration for the local runner

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// How [`LocalRunner`](crate::LocalRunner) starts processes
///
/// Every field is optional in YAML:
///
/// ```yaml
/// working_dir: /srv/checkout
/// inherit_env: false
/// trim_output: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalRunnerConfig {
    /// Working directory for spawned processes, the current one if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Start from the inherited process environment before applying the
    /// context store; when false only context variables are passed
    pub inherit_env: bool,

    /// Trim surrounding whitespace from successful stdout
    pub trim_output: bool,
}

impl Default for LocalRunnerConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            inherit_env: true,
            trim_output: true,
        }
    }
}

impl LocalRunnerConfig {
    /// Parse a configuration from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}
