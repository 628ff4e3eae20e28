//! VM inventory records and the `govc vm.info` text parser
//!
//! `govc vm.info` prints one block per VM:
//!
//! ```text
//! Name:           edge-runner-70
//!   Path:         /Datacenter7.0/vm/edge-runner-70
//!   Power state:  poweredOn
//!   Boot time:    2024-05-02 08:15:27.431 +0000 UTC
//! ```
//!
//! A `Name` line opens a block and a `Boot time` line completes it. Any other
//! label is ignored. Powered-off VMs have no `Boot time` and produce no record.

use crate::error::{CleanupError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Format of the boot timestamp prefix
pub const BOOT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Length of a `YYYY-MM-DD HH:MM:SS` timestamp; anything after it is dropped
pub const BOOT_TIME_LEN: usize = 19;

const NAME_LABEL: &str = "Name";
const BOOT_TIME_LABEL: &str = "Boot time";

/// A VM found during one run.
///
/// Lives only for the duration of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRecord {
    /// VM name, unique within its datacenter
    pub name: String,
    /// Boot time as reported, truncated to second precision
    pub boot_time: String,
    /// Datacenter owning the VM
    pub datacenter: String,
}

impl VmRecord {
    /// Create a record
    pub fn new(
        name: impl Into<String>,
        boot_time: impl Into<String>,
        datacenter: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            boot_time: boot_time.into(),
            datacenter: datacenter.into(),
        }
    }

    /// Parse the boot time as local wall-clock time
    pub fn boot_timestamp(&self) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.boot_time, BOOT_TIME_FORMAT).map_err(|source| {
            CleanupError::Timestamp {
                name: self.name.clone(),
                value: self.boot_time.clone(),
                source,
            }
        })
    }
}

/// Split a trimmed line into `(label, value)` at the first colon
fn split_label(line: &str) -> Option<(&str, &str)> {
    let (label, value) = line.split_once(':')?;
    Some((label.trim(), value.trim()))
}

/// Parse `govc vm.info` output for one datacenter into records.
///
/// Fails when a `Boot time` line has no VM block to belong to, or when one
/// block carries two boot times.
pub fn parse_vm_info(output: &str, datacenter: &str) -> Result<Vec<VmRecord>> {
    let mut records = Vec::new();
    // (name, line of the Name label, boot time already seen)
    let mut current: Option<(String, usize, bool)> = None;

    for (idx, raw) in output.lines().enumerate() {
        let line_no = idx + 1;
        let Some((label, value)) = split_label(raw.trim()) else {
            continue;
        };

        match label {
            NAME_LABEL => {
                if let Some((name, opened_at, false)) = current.take() {
                    debug!(vm = %name, line = opened_at, "No boot time reported, skipping VM");
                }
                if value.is_empty() {
                    return Err(CleanupError::inventory(line_no, "empty VM name"));
                }
                current = Some((value.to_string(), line_no, false));
            }
            BOOT_TIME_LABEL => {
                let Some((name, _, seen)) = current.as_mut() else {
                    return Err(CleanupError::inventory(
                        line_no,
                        "boot time without a preceding Name line",
                    ));
                };
                if *seen {
                    return Err(CleanupError::inventory(
                        line_no,
                        format!("second boot time for VM {}", name),
                    ));
                }
                *seen = true;

                let boot_time: String = value.chars().take(BOOT_TIME_LEN).collect();
                records.push(VmRecord::new(name.clone(), boot_time, datacenter));
            }
            _ => {}
        }
    }

    if let Some((name, opened_at, false)) = current {
        debug!(vm = %name, line = opened_at, "No boot time reported, skipping VM");
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const TWO_VMS: &str = "\
Name:           edge-a-70
  Path:         /Datacenter7.0/vm/edge-a-70
  UUID:         42171e2b-1f3c-6b0a-9e5f-2a1c8d7e4b11
  Guest name:   Ubuntu Linux (64-bit)
  Memory:       4096MB
  CPU:          2 vCPU(s)
  Power state:  poweredOn
  Boot time:    2024-05-02 08:15:27.431852 +0000 UTC
  IP address:   10.10.0.21
  Host:         esx-01.lab.local
Name:           edge-b-70
  Path:         /Datacenter7.0/vm/edge-b-70
  Power state:  poweredOn
  Boot time:    2024-05-04 23:59:59 +0000 UTC
";

    #[test]
    fn test_single_block() {
        let output = "Name:   edge-70  \n  Boot time:    2024-01-01 10:00:00.123 +0000 UTC\n";
        let records = parse_vm_info(output, "Datacenter7.0").unwrap();

        assert_eq!(
            records,
            vec![VmRecord::new("edge-70", "2024-01-01 10:00:00", "Datacenter7.0")]
        );
    }

    #[test]
    fn test_two_blocks() {
        let records = parse_vm_info(TWO_VMS, "Datacenter7.0").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "edge-a-70");
        assert_eq!(records[0].boot_time, "2024-05-02 08:15:27");
        assert_eq!(records[1].name, "edge-b-70");
        assert_eq!(records[1].boot_time, "2024-05-04 23:59:59");
        assert!(records.iter().all(|r| r.datacenter == "Datacenter7.0"));
    }

    #[test]
    fn test_guest_name_is_not_a_name_line() {
        let output = "Name: edge-70\n  Guest name: Other Linux\n  Boot time: 2024-01-01 00:00:00\n";
        let records = parse_vm_info(output, "dc").unwrap();
        assert_eq!(records[0].name, "edge-70");
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_vm_info("", "dc").unwrap().is_empty());
        assert!(parse_vm_info("\n\n", "dc").unwrap().is_empty());
    }

    #[test]
    fn test_powered_off_vm_is_skipped() {
        let output = "\
Name:           stopped-70
  Power state:  poweredOff
Name:           running-70
  Boot time:    2024-01-01 00:00:00
";
        let records = parse_vm_info(output, "dc").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "running-70");
    }

    #[test]
    fn test_boot_time_without_name() {
        let err = parse_vm_info("  Boot time: 2024-01-01 00:00:00\n", "dc").unwrap_err();
        assert!(matches!(err, CleanupError::Inventory { line: 1, .. }));
    }

    #[test]
    fn test_duplicate_boot_time() {
        let output = "Name: a-70\n Boot time: 2024-01-01 00:00:00\n Boot time: 2024-01-02 00:00:00\n";
        let err = parse_vm_info(output, "dc").unwrap_err();
        assert!(matches!(err, CleanupError::Inventory { line: 3, .. }));
    }

    #[test]
    fn test_short_timestamp_kept_whole() {
        let records = parse_vm_info("Name: a\nBoot time: 2024-01-01\n", "dc").unwrap();
        assert_eq!(records[0].boot_time, "2024-01-01");
    }

    #[test]
    fn test_boot_timestamp() {
        let record = VmRecord::new("a", "2024-03-09 17:45:02", "dc");
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(17, 45, 2)
            .unwrap();
        assert_eq!(record.boot_timestamp().unwrap(), expected);
    }

    #[test]
    fn test_boot_timestamp_malformed() {
        let record = VmRecord::new("a", "2024/01/01 00:00:00", "dc");
        assert!(matches!(
            record.boot_timestamp(),
            Err(CleanupError::Timestamp { .. })
        ));
    }
}
