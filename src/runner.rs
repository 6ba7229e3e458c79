//! External tool invocation
//!
//! The scheduler never spawns the mirroring executable directly; it goes
//! through the narrow [`Runner`] trait so the queueing and mutual-exclusion
//! logic can be unit-tested with fakes instead of real subprocesses.

use crate::error::{MirrorError, Result};
use std::ffi::OsString;
use std::process::{Command, Stdio};

/// Narrow seam between the scheduler and the external mirroring executable
pub trait Runner: Send + Sync {
    /// Invoke the tool with a full argument vector (program first) and
    /// return its exit code. `Err` means the process could not be run at
    /// all; a non-zero code means it ran and failed.
    fn run(&self, argv: &[OsString]) -> Result<i32>;
}

/// External tool availability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    /// Tool responded to a version probe
    Available,
    /// Tool is not installed or not on PATH
    NotInstalled,
    /// Tool is present but the version probe failed
    ValidationFailed,
}

/// Detect whether the mirroring tool is usable
pub fn detect_tool(tool: &str) -> ToolStatus {
    match Command::new(tool)
        .arg("--version")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
    {
        Ok(output) => {
            if output.status.success() {
                ToolStatus::Available
            } else {
                ToolStatus::ValidationFailed
            }
        }
        Err(_) => ToolStatus::NotInstalled,
    }
}

/// Production [`Runner`] that spawns the external tool synchronously
#[derive(Debug)]
pub struct MirrorRunner {
    tool: String,
}

impl MirrorRunner {
    /// Create a runner after validating the tool is installed
    pub fn new(tool: &str) -> Result<Self> {
        match detect_tool(tool) {
            ToolStatus::Available => Ok(Self {
                tool: tool.to_string(),
            }),
            ToolStatus::NotInstalled | ToolStatus::ValidationFailed => {
                Err(MirrorError::ToolUnavailable(tool.to_string()))
            }
        }
    }

    /// Name of the validated tool
    pub fn tool(&self) -> &str {
        &self.tool
    }
}

impl Runner for MirrorRunner {
    fn run(&self, argv: &[OsString]) -> Result<i32> {
        let (program, args) = argv.split_first().ok_or(MirrorError::EmptyCommand)?;

        let output = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| MirrorError::io(program, e))?;

        if !output.status.success() {
            tracing::warn!(
                "{} exited with {}: {}",
                program.to_string_lossy(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(output.status.code().unwrap_or(-1))
    }
}
