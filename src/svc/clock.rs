use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Milliseconds since the origin of the clock that produced it.
#[derive(
    Default, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, serde::Serialize, serde::Deserialize,
)]
pub struct Instant(u64);

impl Instant {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn to_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Wall clock, counting milliseconds from its creation.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        let t = std::time::Instant::now().saturating_duration_since(self.start);

        // u64 milliseconds outlive any realistic process
        Instant(u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Virtual clock that only moves when told to.
///
/// Clones share the same time, so a test can keep a handle while the gate
/// owns another one.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_millis(ms: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(ms)),
        }
    }

    pub fn set(&self, t: Instant) {
        self.millis.store(t.to_millis(), Ordering::Release);
    }

    pub fn advance(&self, d: Duration) {
        let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        // fetch_update never fails when the closure always returns Some
        let _ = self
            .millis
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(ms))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant(self.millis.load(Ordering::Acquire))
    }
}
