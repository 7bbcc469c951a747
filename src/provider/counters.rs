//! Per-provider call accounting.
//!
//! Counters are bumped on every attempted HTTP call (retries included) and
//! only ever read for the end-of-run summary; nothing branches on them.

use std::sync::atomic::{AtomicU64, Ordering};

use super::ProviderClass;

#[derive(Debug, Default)]
pub struct CallCounters {
    photo_search: AtomicU64,
    satellite: AtomicU64,
    curated: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCountersSnapshot {
    pub photo_search: u64,
    pub satellite: u64,
    pub curated: u64,
}

impl CallCounters {
    pub fn record_attempt(&self, class: ProviderClass) {
        match class {
            ProviderClass::PhotoSearch => self.photo_search.fetch_add(1, Ordering::SeqCst),
            ProviderClass::SatelliteImagery => self.satellite.fetch_add(1, Ordering::SeqCst),
            ProviderClass::CuratedMetadata => self.curated.fetch_add(1, Ordering::SeqCst),
        };
    }

    pub fn snapshot(&self) -> CallCountersSnapshot {
        CallCountersSnapshot {
            photo_search: self.photo_search.load(Ordering::SeqCst),
            satellite: self.satellite.load(Ordering::SeqCst),
            curated: self.curated.load(Ordering::SeqCst),
        }
    }
}

impl CallCountersSnapshot {
    pub fn total(&self) -> u64 {
        self.photo_search + self.satellite + self.curated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_class() {
        let counters = CallCounters::default();
        counters.record_attempt(ProviderClass::PhotoSearch);
        counters.record_attempt(ProviderClass::PhotoSearch);
        counters.record_attempt(ProviderClass::SatelliteImagery);

        let snap = counters.snapshot();
        assert_eq!(snap.photo_search, 2);
        assert_eq!(snap.satellite, 1);
        assert_eq!(snap.curated, 0);
        assert_eq!(snap.total(), 3);
    }
}
