//! # vsphere-cleanup
//!
//! Finds edge VMs in vSphere that have been up for too long and destroys them.
//!
//! ## Pipeline
//!
//! ```text
//! govc vm.info ──► inventory parser ──► expiry policy ──► govc vm.destroy
//! ```
//!
//! One pass per invocation, strictly sequential:
//! - **Inventory**: list VMs matching a name glob in each configured datacenter
//! - **Parse**: turn `Name` / `Boot time` blocks into [`VmRecord`]s
//! - **Evaluate**: a VM is expired once it has been up for the configured
//!   number of whole days (2 by default)
//! - **Destroy**: one `vm.destroy` per expired VM, failures reported per VM
//!
//! All vSphere access goes through the [`VsphereClient`] trait; [`GovcClient`]
//! implements it on top of the govc CLI.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod config;
pub mod error;
pub mod expiry;
pub mod govc;
pub mod inventory;

// Error handling
pub use error::{CleanupError, Result};

// Configuration
pub use config::{
    CleanupConfig, DatacenterTarget, GovcConfig, GovcCredentials, DEFAULT_DATACENTER,
    DEFAULT_MAX_AGE_DAYS, DEFAULT_NAME_PATTERN,
};

// Inventory
pub use inventory::{parse_vm_info, VmRecord, BOOT_TIME_FORMAT};

// Expiry
pub use expiry::ExpiryPolicy;

// vSphere access
pub use govc::{GovcClient, VsphereClient};

// Pipeline
pub use cleanup::{CleanupOutcome, CleanupReport, CleanupRunner, DestroyFailure};
