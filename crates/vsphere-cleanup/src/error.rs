//! Error types for vsphere-cleanup

use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Cleanup result type
pub type Result<T> = std::result::Result<T, CleanupError>;

/// Errors that can occur during a cleanup run
#[derive(Error, Debug)]
pub enum CleanupError {
    /// The external CLI could not be started at all
    #[error("failed to run {command}: {source}")]
    Spawn {
        /// Command that was being started
        command: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Inventory query exited non-zero
    #[error("inventory query in datacenter {datacenter} failed ({status}): {stderr}")]
    QueryFailed {
        /// Datacenter that was queried
        datacenter: String,
        /// Exit status of the CLI
        status: ExitStatus,
        /// Captured standard error
        stderr: String,
    },

    /// Destroy command exited non-zero for one VM
    #[error("destroy of VM {name} in datacenter {datacenter} failed ({status}): {stderr}")]
    DestroyFailed {
        /// VM name
        name: String,
        /// Datacenter that owns the VM
        datacenter: String,
        /// Exit status of the CLI
        status: ExitStatus,
        /// Captured standard error
        stderr: String,
    },

    /// External command did not finish in time
    #[error("{command} timed out after {timeout:?}")]
    Timeout {
        /// Command that timed out
        command: String,
        /// Configured timeout
        timeout: Duration,
    },

    /// Inventory output did not have the expected shape
    #[error("malformed inventory output at line {line}: {message}")]
    Inventory {
        /// 1-based line number in the CLI output
        line: usize,
        /// What was wrong
        message: String,
    },

    /// Boot timestamp does not match `YYYY-MM-DD HH:MM:SS`
    #[error("invalid boot time {value:?} for VM {name}: {source}")]
    Timestamp {
        /// VM name
        name: String,
        /// Raw timestamp text
        value: String,
        /// Parse failure
        source: chrono::ParseError,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CleanupError {
    /// Create an inventory parse error
    pub fn inventory(line: usize, message: impl Into<String>) -> Self {
        Self::Inventory {
            line,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
