//! Run configuration
//!
//! Everything a cleanup run needs is collected once at start-up into an
//! immutable [`CleanupConfig`] and handed to the pipeline explicitly.

use crate::error::{CleanupError, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default datacenter queried when none is configured
pub const DEFAULT_DATACENTER: &str = "Datacenter7.0";

/// Default VM name glob for edge VMs
pub const DEFAULT_NAME_PATTERN: &str = "*-70";

/// Default retention threshold in days
pub const DEFAULT_MAX_AGE_DAYS: i64 = 2;

/// Connection settings passed to every govc invocation.
///
/// These are handed to the child process as `GOVC_*` environment variables.
#[derive(Clone)]
pub struct GovcCredentials {
    /// vCenter / ESXi endpoint (`GOVC_URL`)
    pub url: String,
    /// Username (`GOVC_USERNAME`)
    pub username: Option<String>,
    /// Password (`GOVC_PASSWORD`)
    pub password: Option<String>,
    /// Skip TLS verification (`GOVC_INSECURE`)
    pub insecure: bool,
}

impl GovcCredentials {
    /// Create credentials for an endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            insecure: false,
        }
    }

    /// Set username and password
    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the insecure-TLS flag
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Environment variables understood by govc
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            ("GOVC_URL", self.url.clone()),
            ("GOVC_INSECURE", self.insecure.to_string()),
        ];
        if let Some(username) = &self.username {
            vars.push(("GOVC_USERNAME", username.clone()));
        }
        if let Some(password) = &self.password {
            vars.push(("GOVC_PASSWORD", password.clone()));
        }
        vars
    }
}

impl fmt::Debug for GovcCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GovcCredentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// A datacenter to scan, with an optional name glob of its own.
///
/// Parsed from `NAME` or `NAME=PATTERN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatacenterTarget {
    /// Datacenter name as known to vSphere
    pub name: String,
    /// VM name glob, falls back to the run-wide pattern when unset
    pub pattern: Option<String>,
}

impl DatacenterTarget {
    /// Target a datacenter with the run-wide pattern
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: None,
        }
    }

    /// Use a specific name glob for this datacenter
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Glob to query with, given the run-wide default
    pub fn pattern_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.pattern.as_deref().unwrap_or(default)
    }
}

impl FromStr for DatacenterTarget {
    type Err = CleanupError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, pattern) = match s.split_once('=') {
            Some((name, pattern)) => (name.trim(), Some(pattern.trim())),
            None => (s.trim(), None),
        };

        if name.is_empty() {
            return Err(CleanupError::config(format!(
                "datacenter name missing in {:?}",
                s
            )));
        }

        let target = DatacenterTarget::new(name);
        match pattern {
            Some("") => Err(CleanupError::config(format!(
                "empty name pattern for datacenter {}",
                name
            ))),
            Some(pattern) => Ok(target.with_pattern(pattern)),
            None => Ok(target),
        }
    }
}

impl fmt::Display for DatacenterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            Some(pattern) => write!(f, "{}={}", self.name, pattern),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Immutable configuration for one cleanup run
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Datacenters scanned, in order
    pub datacenters: Vec<DatacenterTarget>,
    /// Name glob for datacenters without their own
    pub name_pattern: String,
    /// VMs booted at least this many whole days ago are expired
    pub max_age_days: i64,
    /// Report expired VMs without destroying them
    pub dry_run: bool,
    /// Where to keep the raw inventory output, overwritten each run
    pub inventory_file: Option<PathBuf>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            datacenters: vec![DatacenterTarget::new(DEFAULT_DATACENTER)
                .with_pattern(DEFAULT_NAME_PATTERN)],
            name_pattern: DEFAULT_NAME_PATTERN.to_string(),
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            dry_run: false,
            inventory_file: None,
        }
    }
}

impl CleanupConfig {
    /// Replace the datacenter list
    pub fn with_datacenters(mut self, datacenters: Vec<DatacenterTarget>) -> Self {
        self.datacenters = datacenters;
        self
    }

    /// Set the run-wide name glob
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = pattern.into();
        self
    }

    /// Set the retention threshold
    pub fn with_max_age_days(mut self, days: i64) -> Self {
        self.max_age_days = days;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Keep the raw inventory output in a file
    pub fn with_inventory_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.inventory_file = Some(path.into());
        self
    }

    /// Check the configuration before a run
    pub fn validate(&self) -> Result<()> {
        if self.datacenters.is_empty() {
            return Err(CleanupError::config("no datacenter configured"));
        }
        if self.name_pattern.trim().is_empty() {
            return Err(CleanupError::config("name pattern must not be empty"));
        }
        if self.max_age_days < 0 {
            return Err(CleanupError::config(format!(
                "max age must not be negative, got {} days",
                self.max_age_days
            )));
        }
        Ok(())
    }
}

/// Settings for the govc process runner
#[derive(Debug, Clone)]
pub struct GovcConfig {
    /// Path or name of the govc binary
    pub binary: String,
    /// Connection settings
    pub credentials: GovcCredentials,
    /// Upper bound per invocation, none waits indefinitely
    pub command_timeout: Option<Duration>,
}

impl GovcConfig {
    /// Create a runner config using `govc` from `PATH`
    pub fn new(credentials: GovcCredentials) -> Self {
        Self {
            binary: "govc".to_string(),
            credentials,
            command_timeout: None,
        }
    }

    /// Use a different govc binary
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Bound every invocation by a timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }
}
