use std::time::Duration;

use crate::config::GateTiming;
use crate::gate::{ClosedValueFn, HysteresisGate, ThresholdFn};
use crate::svc::{Clock, MonotonicClock};

pub struct GateBuilder<T> {
    threshold: ThresholdFn<T>,
    closed_value: Option<ClosedValueFn<T>>,
    timing: GateTiming,
}

impl<T: 'static> GateBuilder<T> {
    pub fn new<F>(mut predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        Self::try_new(move |value: &T| Ok(predicate(value)))
    }

    /// Predicate that may fail. A failure is returned by `process` as is.
    pub fn try_new<F>(predicate: F) -> Self
    where
        F: FnMut(&T) -> anyhow::Result<bool> + Send + 'static,
    {
        Self {
            threshold: Box::new(predicate),
            closed_value: None,
            timing: GateTiming::default(),
        }
    }

    /// Value emitted for every tick while the gate is closed.
    pub fn closed_value<F>(mut self, closed_value: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        self.closed_value = Some(Box::new(closed_value));
        self
    }

    pub fn time_before_open(mut self, d: Duration) -> Self {
        self.timing.time_before_open = d;
        self
    }

    pub fn time_before_close(mut self, d: Duration) -> Self {
        self.timing.time_before_close = d;
        self
    }

    pub fn timing(mut self, timing: GateTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn build(self) -> HysteresisGate<T, MonotonicClock> {
        self.build_with_clock(MonotonicClock::default())
    }

    pub fn build_with_clock<C: Clock>(self, clock: C) -> HysteresisGate<T, C> {
        HysteresisGate::from_parts(self.threshold, self.closed_value, self.timing, clock)
    }
}
