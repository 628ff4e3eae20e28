//! Age-since-boot expiry policy

use crate::config::DEFAULT_MAX_AGE_DAYS;
use crate::error::Result;
use crate::inventory::VmRecord;
use chrono::NaiveDateTime;

/// Decides whether a VM has outlived its retention window.
///
/// Both timestamps are naive local time. Age is counted in whole days,
/// truncated: 1 day 23h59m is one day old, not two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    max_age_days: i64,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE_DAYS)
    }
}

impl ExpiryPolicy {
    /// Expire VMs booted at least `max_age_days` whole days ago
    pub fn new(max_age_days: i64) -> Self {
        Self { max_age_days }
    }

    /// Retention threshold in days
    pub fn max_age_days(&self) -> i64 {
        self.max_age_days
    }

    /// Whether a VM booted at `boot` is expired at `now`
    pub fn is_expired(&self, boot: NaiveDateTime, now: NaiveDateTime) -> bool {
        (now - boot).num_days() >= self.max_age_days
    }

    /// Parse the record's boot time and classify it
    pub fn evaluate(&self, record: &VmRecord, now: NaiveDateTime) -> Result<bool> {
        Ok(self.is_expired(record.boot_timestamp()?, now))
    }

    /// Select the expired records, failing on the first malformed timestamp
    pub fn expired<'a>(
        &self,
        records: &'a [VmRecord],
        now: NaiveDateTime,
    ) -> Result<Vec<&'a VmRecord>> {
        let mut expired = Vec::new();
        for record in records {
            if self.evaluate(record, now)? {
                expired.push(record);
            }
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CleanupError;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn record_booted(name: &str, ago: Duration) -> VmRecord {
        let boot = (now() - ago).format("%Y-%m-%d %H:%M:%S").to_string();
        VmRecord::new(name, boot, "Datacenter7.0")
    }

    #[test]
    fn test_just_under_two_days_is_not_expired() {
        let policy = ExpiryPolicy::default();
        let boot = now() - Duration::hours(47) - Duration::minutes(59);
        assert!(!policy.is_expired(boot, now()));

        let boot = now() - Duration::days(1) - Duration::hours(23) - Duration::minutes(59);
        assert!(!policy.is_expired(boot, now()));
    }

    #[test]
    fn test_exactly_two_days_is_expired() {
        let policy = ExpiryPolicy::default();
        assert!(policy.is_expired(now() - Duration::hours(48), now()));
        assert!(policy.is_expired(now() - Duration::days(30), now()));
    }

    #[test]
    fn test_future_boot_time_is_not_expired() {
        let policy = ExpiryPolicy::default();
        assert!(!policy.is_expired(now() + Duration::days(5), now()));
    }

    #[test]
    fn test_custom_threshold() {
        let policy = ExpiryPolicy::new(7);
        assert!(!policy.is_expired(now() - Duration::days(6), now()));
        assert!(policy.is_expired(now() - Duration::days(7), now()));

        // Zero days expires everything already booted
        assert!(ExpiryPolicy::new(0).is_expired(now(), now()));
    }

    #[test]
    fn test_expired_selection() {
        let records = vec![
            record_booted("old-70", Duration::days(3)),
            record_booted("new-70", Duration::days(1)),
        ];

        let expired = ExpiryPolicy::default().expired(&records, now()).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].name, "old-70");
    }

    #[test]
    fn test_malformed_timestamp_fails() {
        let records = vec![
            record_booted("old-70", Duration::days(3)),
            VmRecord::new("bad-70", "2024/01/01 00:00:00", "Datacenter7.0"),
        ];

        let err = ExpiryPolicy::default().expired(&records, now()).unwrap_err();
        match err {
            CleanupError::Timestamp { name, value, .. } => {
                assert_eq!(name, "bad-70");
                assert_eq!(value, "2024/01/01 00:00:00");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
