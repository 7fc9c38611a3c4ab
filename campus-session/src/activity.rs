//! Activity tracking and inactivity expiry
//!
//! The last-interaction timestamp lives in the durable tier so an idle
//! session is still caught after a browser restart. The clock is an
//! injected port so tests drive the expiry arithmetic directly.

use crate::storage::{SessionStores, StorageKey};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Time source port
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().expect("manual clock lock poisoned");
        *now += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().expect("manual clock lock poisoned")
    }
}

/// Tracks last user interaction and decides when a session has idled out
pub struct ActivityTracker {
    stores: SessionStores,
    clock: std::sync::Arc<dyn Clock>,
    idle_timeout: Duration,
}

impl ActivityTracker {
    pub fn new(
        stores: SessionStores,
        clock: std::sync::Arc<dyn Clock>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            stores,
            clock,
            idle_timeout,
        }
    }

    /// Record an interaction; called per tracked event, no debouncing
    pub fn touch(&self) {
        let millis = self.clock.now().timestamp_millis();
        self.stores
            .write(StorageKey::ActivityLastSeen, &millis.to_string());
    }

    /// Last recorded interaction, if any
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        let raw = self.stores.read(StorageKey::ActivityLastSeen)?;
        let millis: i64 = raw.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Whether the idle timeout has elapsed since the last interaction
    ///
    /// Cold start (no record yet) never counts as expired.
    pub fn idle_expired(&self) -> bool {
        let last_seen = match self.last_seen() {
            Some(last_seen) => last_seen,
            None => return false,
        };

        let idle = self.clock.now() - last_seen;
        let limit = chrono::Duration::from_std(self.idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::MAX);

        if idle > limit {
            debug!(idle_seconds = idle.num_seconds(), "Session idle limit exceeded");
            true
        } else {
            false
        }
    }

    /// Drop the activity record
    pub fn clear(&self) {
        self.stores.remove(StorageKey::ActivityLastSeen);
    }
}
