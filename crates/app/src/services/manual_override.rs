//! Last manual command per device.

use dashmap::DashMap;

use camlink_domain::time::Timestamp;

/// Remembers when a human last commanded each device.
#[derive(Debug, Default)]
pub struct ManualOverrides {
    marks: DashMap<String, Timestamp>,
}

impl ManualOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a manual command. Older stamps never replace newer ones.
    pub fn record(&self, client_id: &str, at: Timestamp) {
        self.marks
            .entry(client_id.to_string())
            .and_modify(|last| {
                if at > *last {
                    *last = at;
                }
            })
            .or_insert(at);
    }

    #[must_use]
    pub fn last(&self, client_id: &str) -> Option<Timestamp> {
        self.marks.get(client_id).map(|entry| *entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};

    #[test]
    fn should_return_none_for_untouched_device() {
        assert_eq!(ManualOverrides::new().last("cam01"), None);
    }

    #[test]
    fn should_keep_latest_stamp() {
        let overrides = ManualOverrides::new();
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        overrides.record("cam01", t0 + TimeDelta::seconds(5));
        overrides.record("cam01", t0);
        assert_eq!(overrides.last("cam01"), Some(t0 + TimeDelta::seconds(5)));
    }
}
