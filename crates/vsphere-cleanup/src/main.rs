//! vsphere-cleanup - destroy expired edge VMs
//!
//! ## Usage
//!
//! ```bash
//! export GOVC_URL=https://vcenter.lab.local/sdk
//! export GOVC_USERNAME=ops GOVC_PASSWORD=... GOVC_INSECURE=true
//!
//! # Default: Datacenter7.0, VMs named *-70, expire after 2 days
//! vsphere-cleanup
//!
//! # Several datacenters, each with its own name glob
//! vsphere-cleanup --datacenter 'Datacenter7.0=*-70' --datacenter 'Datacenter6.7=*-67'
//!
//! # See what would go without touching anything
//! vsphere-cleanup --dry-run --json
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vsphere_cleanup::{
    CleanupConfig, CleanupRunner, DatacenterTarget, GovcClient, GovcConfig, GovcCredentials,
    DEFAULT_MAX_AGE_DAYS, DEFAULT_NAME_PATTERN,
};

/// Destroy edge VMs that have been running for too long
#[derive(Parser)]
#[command(name = "vsphere-cleanup", version)]
#[command(about = "Destroy expired edge VMs in vSphere", long_about = None)]
struct Cli {
    /// vCenter / ESXi SDK endpoint
    #[arg(long, env = "GOVC_URL")]
    url: String,

    /// vSphere username
    #[arg(long, env = "GOVC_USERNAME")]
    username: Option<String>,

    /// vSphere password
    #[arg(long, env = "GOVC_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, env = "GOVC_INSECURE", value_parser = clap::builder::BoolishValueParser::new())]
    insecure: bool,

    /// govc binary to run
    #[arg(long, env = "GOVC_BIN", default_value = "govc")]
    govc: String,

    /// Datacenter to scan, as NAME or NAME=PATTERN (repeatable)
    #[arg(
        long = "datacenter",
        env = "VSPHERE_CLEANUP_DATACENTERS",
        value_delimiter = ',',
        default_value = "Datacenter7.0=*-70"
    )]
    datacenters: Vec<DatacenterTarget>,

    /// VM name glob for datacenters given without a pattern
    #[arg(long, default_value = DEFAULT_NAME_PATTERN)]
    name_pattern: String,

    /// Destroy VMs up for at least this many whole days
    #[arg(long, default_value_t = DEFAULT_MAX_AGE_DAYS)]
    max_age_days: i64,

    /// Give up on a govc call after this many seconds (default: wait forever)
    #[arg(long)]
    command_timeout: Option<u64>,

    /// Write the raw govc vm.info output to this file
    #[arg(long)]
    inventory_file: Option<PathBuf>,

    /// List expired VMs without destroying them
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn govc_config(&self) -> GovcConfig {
        let mut credentials = GovcCredentials::new(&self.url).with_insecure(self.insecure);
        credentials.username = self.username.clone();
        credentials.password = self.password.clone();

        let config = GovcConfig::new(credentials).with_binary(&self.govc);
        match self.command_timeout {
            Some(secs) => config.with_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }

    fn cleanup_config(&self) -> CleanupConfig {
        let config = CleanupConfig::default()
            .with_datacenters(self.datacenters.clone())
            .with_name_pattern(&self.name_pattern)
            .with_max_age_days(self.max_age_days)
            .with_dry_run(self.dry_run);
        match &self.inventory_file {
            Some(path) => config.with_inventory_file(path),
            None => config,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vsphere_cleanup=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = cli.cleanup_config();
    config.validate().context("invalid configuration")?;

    let targets: Vec<String> = config.datacenters.iter().map(|dc| dc.to_string()).collect();
    info!(
        "Scanning {} (max age {} days{})",
        targets.join(", "),
        config.max_age_days,
        if config.dry_run { ", dry run" } else { "" }
    );

    let runner = CleanupRunner::new(GovcClient::new(cli.govc_config()), config);
    let report = runner.run().await.context("cleanup run failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !report.is_success() {
        for failure in &report.failures {
            error!("> VM {} was not destroyed: {}", failure.vm.name, failure.error);
        }
        anyhow::bail!(
            "{} of {} expired VM(s) could not be destroyed",
            report.failures.len(),
            report.expired.len()
        );
    }

    Ok(())
}
