//! Single-pass cleanup pipeline
//!
//! ```text
//! for each datacenter ── govc vm.info ──► parse ──► records
//!                                                     │
//!                              expiry policy (all) ◄──┘
//!                                                     │
//!                          govc vm.destroy (expired) ◄┘
//! ```
//!
//! Every record is evaluated before anything is destroyed, so a malformed
//! boot time stops the run with nothing deleted. Destroys run one at a time;
//! a failed destroy is reported for that VM and the rest are still attempted.

use crate::config::CleanupConfig;
use crate::error::Result;
use crate::expiry::ExpiryPolicy;
use crate::govc::VsphereClient;
use crate::inventory::{parse_vm_info, VmRecord};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// Inventory was empty
    NoVmsFound,
    /// VMs were found but none had expired
    NoneExpired,
    /// Expired VMs were listed but left alone
    DryRun,
    /// Destroy was attempted for every expired VM
    Destroyed,
}

/// A destroy that the CLI reported as failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyFailure {
    /// The VM that is still there
    pub vm: VmRecord,
    /// Error text
    pub error: String,
}

/// Summary of one cleanup run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupReport {
    /// How the run ended
    pub outcome: CleanupOutcome,
    /// Every VM found across all datacenters
    pub discovered: Vec<VmRecord>,
    /// VMs past the retention threshold
    pub expired: Vec<VmRecord>,
    /// VMs the CLI confirmed as destroyed
    pub destroyed: Vec<VmRecord>,
    /// Destroys that failed
    pub failures: Vec<DestroyFailure>,
}

impl CleanupReport {
    fn new(outcome: CleanupOutcome, discovered: Vec<VmRecord>) -> Self {
        Self {
            outcome,
            discovered,
            expired: Vec::new(),
            destroyed: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when no destroy failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the inventory → expiry → destroy pipeline against one client
pub struct CleanupRunner<C> {
    client: C,
    config: CleanupConfig,
    policy: ExpiryPolicy,
}

impl<C: VsphereClient> CleanupRunner<C> {
    /// Create a runner
    pub fn new(client: C, config: CleanupConfig) -> Self {
        let policy = ExpiryPolicy::new(config.max_age_days);
        Self {
            client,
            config,
            policy,
        }
    }

    /// Run configuration
    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Query every configured datacenter and parse the results.
    ///
    /// The raw output gathered so far is saved to the inventory file even
    /// when a query or parse fails.
    pub async fn inventory(&self) -> Result<Vec<VmRecord>> {
        let mut raw_output = String::new();
        let result = self.collect_inventory(&mut raw_output).await;

        if let Some(path) = &self.config.inventory_file {
            tokio::fs::write(path, &raw_output).await?;
            debug!(path = %path.display(), "Saved raw inventory");
        }

        result
    }

    async fn collect_inventory(&self, raw_output: &mut String) -> Result<Vec<VmRecord>> {
        let mut records = Vec::new();

        for target in &self.config.datacenters {
            let pattern = target.pattern_or(&self.config.name_pattern);
            debug!(datacenter = %target.name, pattern = %pattern, "Querying inventory");

            let output = self.client.list_vm_info(&target.name, pattern).await?;
            raw_output.push_str(&output);
            records.extend(parse_vm_info(&output, &target.name)?);
        }

        Ok(records)
    }

    /// Run once using the local wall clock
    pub async fn run(&self) -> Result<CleanupReport> {
        self.run_at(Local::now().naive_local()).await
    }

    /// Run once, judging ages against `now`
    pub async fn run_at(&self, now: NaiveDateTime) -> Result<CleanupReport> {
        let records = self.inventory().await?;

        if records.is_empty() {
            info!("No edge VM found in vSphere, exit now");
            return Ok(CleanupReport::new(CleanupOutcome::NoVmsFound, records));
        }

        info!("Found existing edge VMs:");
        for vm in &records {
            info!("> Name:{}, Date:{}", vm.name, vm.boot_time);
        }

        info!("Check VM date and destroy expired VM");
        let expired: Vec<VmRecord> = self
            .policy
            .expired(&records, now)?
            .into_iter()
            .cloned()
            .collect();

        if expired.is_empty() {
            info!("No expired edge VM found, exit now");
            return Ok(CleanupReport::new(CleanupOutcome::NoneExpired, records));
        }

        if self.config.dry_run {
            for vm in &expired {
                info!("> VM {} would be destroyed (date: {})", vm.name, vm.boot_time);
            }
            let mut report = CleanupReport::new(CleanupOutcome::DryRun, records);
            report.expired = expired;
            return Ok(report);
        }

        let mut report = CleanupReport::new(CleanupOutcome::Destroyed, records);
        for vm in &expired {
            match self.client.destroy_vm(&vm.datacenter, &vm.name).await {
                Ok(()) => {
                    info!("> VM {} is destroyed (date: {})", vm.name, vm.boot_time);
                    report.destroyed.push(vm.clone());
                }
                Err(e) => {
                    error!(vm = %vm.name, datacenter = %vm.datacenter, "Destroy failed: {}", e);
                    report.failures.push(DestroyFailure {
                        vm: vm.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report.expired = expired;

        Ok(report)
    }
}
