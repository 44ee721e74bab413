//
// Copyright 2024 the axolotl developers
// SPDX-License-Identifier: ISC
//

//! Wall-clock seconds used for key expiry bookkeeping.

use std::time::{Duration, SystemTime};

/// Timestamp recorded as seconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_epoch_seconds(seconds: u64) -> Self {
        Self(seconds)
    }

    pub const fn epoch_seconds(&self) -> u64 {
        self.0
    }

    /// The current wall-clock time. Expiry decisions are only ever made
    /// against timestamps the caller passes in, so a skewed clock here
    /// affects freshness stamps, not correctness.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self(elapsed.as_secs())
    }

    pub const fn add_duration(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_secs()))
    }

    pub const fn sub_duration(&self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration.as_secs()))
    }
}

impl From<Timestamp> for SystemTime {
    fn from(value: Timestamp) -> Self {
        Self::UNIX_EPOCH + Duration::from_secs(value.epoch_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_saturates() {
        let t = Timestamp::from_epoch_seconds(100);
        assert_eq!(t.add_duration(Duration::from_secs(5)).epoch_seconds(), 105);
        assert_eq!(t.sub_duration(Duration::from_secs(500)).epoch_seconds(), 0);
        assert_eq!(
            Timestamp::from_epoch_seconds(u64::MAX)
                .add_duration(Duration::from_secs(1))
                .epoch_seconds(),
            u64::MAX
        );
    }
}
