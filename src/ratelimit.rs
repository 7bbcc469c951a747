//! Minimum-spacing rate limiter, one clock per provider class.
//!
//! Quota ceilings on the external APIs are expressed as a minimum interval
//! between calls of the same class. The mutex on each slot is held across
//! the wait, which is what serializes concurrent callers of one class while
//! leaving the other classes free.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::provider::ProviderClass;

pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    slots: [ClassSlot; ProviderClass::ALL.len()],
}

struct ClassSlot {
    min_interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>, intervals: [Duration; ProviderClass::ALL.len()]) -> Self {
        Self {
            clock,
            slots: intervals.map(|min_interval| ClassSlot {
                min_interval,
                last_grant: Mutex::new(None),
            }),
        }
    }

    /// Uniform spacing for every provider class.
    pub fn uniform(clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self::new(clock, [interval; ProviderClass::ALL.len()])
    }

    /// Block until this class is allowed another call, then record the grant.
    /// A zero interval degrades to an immediate grant.
    pub fn await_slot(&self, class: ProviderClass) {
        let slot = &self.slots[class as usize];
        if slot.min_interval.is_zero() {
            return;
        }

        let mut last = slot.last_grant.lock().unwrap();
        if let Some(prev) = *last {
            let elapsed = self.clock.now().saturating_duration_since(prev);
            if elapsed < slot.min_interval {
                self.clock.sleep(slot.min_interval - elapsed);
            }
        }
        *last = Some(self.clock.now());
    }
}
