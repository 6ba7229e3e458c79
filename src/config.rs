//! Scheduler configuration
//!
//! Small JSON-persistable config: which external tool to invoke, what to do
//! when a target directory cannot be created, and how long the advisory
//! process-table probe may take.

use crate::error::{IoResultExt, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Policy applied when the target's parent directory cannot be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingDirPolicy {
    /// Return the error to the caller; nothing is scheduled.
    #[default]
    Fail,
    /// Log the error and drop the job without scheduling it. Attached
    /// callbacks are still notified with a failed outcome so batched
    /// completions cannot stall.
    LogAndSkip,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Name of the external mirroring executable
    pub tool: String,
    /// What to do when the target's parent directory cannot be created
    pub missing_target_dir: MissingDirPolicy,
    /// Upper bound for the process-table probe, in milliseconds
    pub probe_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tool: "rsync".to_string(),
            missing_target_dir: MissingDirPolicy::default(),
            probe_timeout_ms: 2_000,
        }
    }
}

impl SchedulerConfig {
    /// Probe timeout as a [`Duration`]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Load configuration from a JSON file
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_path(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content).with_path(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tool, "rsync");
        assert_eq!(config.missing_target_dir, MissingDirPolicy::Fail);
        assert_eq!(config.probe_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scheduler.json");

        let mut config = SchedulerConfig::default();
        config.missing_target_dir = MissingDirPolicy::LogAndSkip;
        config.save(&path).unwrap();

        let loaded = SchedulerConfig::load(&path).unwrap();
        assert_eq!(loaded.tool, config.tool);
        assert_eq!(loaded.missing_target_dir, MissingDirPolicy::LogAndSkip);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(SchedulerConfig::load("/nonexistent/scheduler.json").is_err());
    }
}
