//! vSphere access through the `govc` CLI
//!
//! Each call spawns one `govc` process with an argument list and `GOVC_*`
//! environment variables; nothing goes through a shell. VM names and globs
//! follow `--` so govc never reads them as flags. Calls block the run
//! until the process exits, optionally bounded by a timeout.

use crate::config::GovcConfig;
use crate::error::{CleanupError, Result};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Operations the cleanup pipeline needs from vSphere.
#[async_trait]
pub trait VsphereClient: Send + Sync {
    /// Raw `vm.info` text for every VM matching `pattern` in `datacenter`
    async fn list_vm_info(&self, datacenter: &str, pattern: &str) -> Result<String>;

    /// Destroy one VM by exact name
    async fn destroy_vm(&self, datacenter: &str, name: &str) -> Result<()>;
}

/// [`VsphereClient`] backed by the govc binary
#[derive(Debug, Clone)]
pub struct GovcClient {
    config: GovcConfig,
}

impl GovcClient {
    /// Create a client
    pub fn new(config: GovcConfig) -> Self {
        Self { config }
    }

    /// Runner configuration
    pub fn config(&self) -> &GovcConfig {
        &self.config
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(args)
            .envs(self.config.credentials.env_vars())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run govc to completion and capture its output
    async fn run(&self, args: Vec<String>) -> Result<Output> {
        let label = format!("{} {}", self.config.binary, args.join(" "));
        debug!(command = %label, "Running govc");

        let mut cmd = self.command(&args);
        let output = cmd.output();
        let result = match self.config.command_timeout {
            Some(timeout) => tokio::time::timeout(timeout, output)
                .await
                .map_err(|_| CleanupError::Timeout {
                    command: label.clone(),
                    timeout,
                })?,
            None => output.await,
        };

        result.map_err(|source| CleanupError::Spawn {
            command: label,
            source,
        })
    }
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

#[async_trait]
impl VsphereClient for GovcClient {
    async fn list_vm_info(&self, datacenter: &str, pattern: &str) -> Result<String> {
        let output = self
            .run(vec![
                "vm.info".to_string(),
                format!("-dc={}", datacenter),
                "--".to_string(),
                pattern.to_string(),
            ])
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(CleanupError::QueryFailed {
                datacenter: datacenter.to_string(),
                status: output.status,
                stderr: stderr_text(&output),
            })
        }
    }

    async fn destroy_vm(&self, datacenter: &str, name: &str) -> Result<()> {
        let output = self
            .run(vec![
                "vm.destroy".to_string(),
                format!("-dc={}", datacenter),
                "--".to_string(),
                name.to_string(),
            ])
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(CleanupError::DestroyFailed {
                name: name.to_string(),
                datacenter: datacenter.to_string(),
                status: output.status,
                stderr: stderr_text(&output),
            })
        }
    }
}
