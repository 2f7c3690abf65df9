//! Hysteresis gate.
//!
//! A filter with time restrictions: values only get through once they have
//! satisfied a threshold predicate continuously for `time_before_open`, and
//! keep getting through until the predicate has failed continuously for
//! `time_before_close`. A typical use is audio, where the gate opens when
//! the amplitude stays above a level and stays open a little after it drops
//! to avoid chopping short pauses.
//!
//! Both delays are measured from the moment the predicate's result last
//! flipped, not from the moment the gate last opened or closed.

use std::fmt;
use std::time::Duration;

pub use builder::GateBuilder;
pub use state::{GateState, GateStatus, ProcessResult};

use crate::config::GateTiming;
use crate::svc::{Clock, Instant, MonotonicClock};

mod builder;
mod state;

pub type ThresholdFn<T> = Box<dyn FnMut(&T) -> anyhow::Result<bool> + Send>;
pub type ClosedValueFn<T> = Box<dyn FnMut() -> T + Send>;

/// Stateful filter deciding, value by value, what goes downstream.
///
/// `process` takes `&mut self`: one gate belongs to one sequential
/// processing path. Move it into a worker if needed, but do not share it.
pub struct HysteresisGate<T, C = MonotonicClock> {
    threshold: ThresholdFn<T>,
    closed_value: Option<ClosedValueFn<T>>,
    timing: GateTiming,
    state: GateState,
    clock: C,
}

impl<T: 'static> HysteresisGate<T, MonotonicClock> {
    /// Gate with default delays that emits nothing while closed.
    pub fn new<F>(predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        GateBuilder::new(predicate).build()
    }

    pub fn with_closed_value<F, G>(predicate: F, closed_value: G) -> Self
    where
        F: FnMut(&T) -> bool + Send + 'static,
        G: FnMut() -> T + Send + 'static,
    {
        GateBuilder::new(predicate).closed_value(closed_value).build()
    }

    pub fn with_timing<F>(predicate: F, timing: GateTiming) -> Self
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        GateBuilder::new(predicate).timing(timing).build()
    }

    pub fn builder<F>(predicate: F) -> GateBuilder<T>
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        GateBuilder::new(predicate)
    }

    pub fn try_builder<F>(predicate: F) -> GateBuilder<T>
    where
        F: FnMut(&T) -> anyhow::Result<bool> + Send + 'static,
    {
        GateBuilder::try_new(predicate)
    }
}

impl<T, C: Clock> HysteresisGate<T, C> {
    pub(crate) fn from_parts(
        threshold: ThresholdFn<T>,
        closed_value: Option<ClosedValueFn<T>>,
        timing: GateTiming,
        clock: C,
    ) -> Self {
        let state = GateState::new(clock.now());
        Self {
            threshold,
            closed_value,
            timing,
            state,
            clock,
        }
    }

    /// Runs one value through the gate.
    ///
    /// Must be called once per upstream value, in arrival order. If the
    /// predicate fails, its error is returned unchanged and the gate state
    /// is left exactly as it was.
    pub fn process(&mut self, value: T) -> anyhow::Result<ProcessResult<T>> {
        let passed = (self.threshold)(&value)?;
        let now = self.clock.now();

        let state = &mut self.state;

        if passed != state.should_open {
            log::trace!(
                "Threshold {} at {}ms",
                if passed { "passed" } else { "failed" },
                now.to_millis()
            );
            state.should_open = passed;
            state.last_transition = now;
        }

        let held = now.saturating_duration_since(state.last_transition);

        if state.should_open && !state.is_open && held >= self.timing.time_before_open {
            log::debug!("Gate opened after {}ms", held.as_millis());
            state.is_open = true;
        }

        if !state.should_open && state.is_open && held >= self.timing.time_before_close {
            log::debug!("Gate closed after {}ms", held.as_millis());
            state.is_open = false;
        }

        if state.is_open {
            Ok(ProcessResult::Pass(value))
        } else if let Some(closed_value) = self.closed_value.as_mut() {
            Ok(ProcessResult::Closed(closed_value()))
        } else {
            Ok(ProcessResult::Suppressed)
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<T, C> HysteresisGate<T, C> {
    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    pub fn status(&self) -> GateStatus {
        self.state.status()
    }

    pub fn should_open(&self) -> bool {
        self.state.should_open
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// When the threshold result last flipped, on the gate's clock.
    pub fn last_transition(&self) -> Instant {
        self.state.last_transition
    }

    pub fn has_closed_value(&self) -> bool {
        self.closed_value.is_some()
    }

    pub fn timing(&self) -> GateTiming {
        self.timing
    }

    pub fn set_timing(&mut self, timing: GateTiming) {
        self.timing = timing;
    }

    pub fn time_before_open(&self) -> Duration {
        self.timing.time_before_open
    }

    /// Takes effect on the next processed value.
    pub fn set_time_before_open(&mut self, d: Duration) {
        self.timing.time_before_open = d;
    }

    pub fn time_before_close(&self) -> Duration {
        self.timing.time_before_close
    }

    /// Takes effect on the next processed value.
    pub fn set_time_before_close(&mut self, d: Duration) {
        self.timing.time_before_close = d;
    }
}

impl<T, C> fmt::Debug for HysteresisGate<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HysteresisGate")
            .field("timing", &self.timing)
            .field("state", &self.state)
            .field("has_closed_value", &self.closed_value.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use insta::assert_debug_snapshot;

    use crate::config::{DEFAULT_GATE_CLOSE_TIME, DEFAULT_GATE_OPEN_TIME};
    use crate::svc::ManualClock;

    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    fn make_gate<F>(
        predicate: F,
        open_ms: u64,
        close_ms: u64,
    ) -> (HysteresisGate<i32, ManualClock>, ManualClock)
    where
        F: FnMut(&i32) -> bool + Send + 'static,
    {
        let clock = ManualClock::new();
        let gate = HysteresisGate::builder(predicate)
            .timing(GateTiming::from_millis(open_ms, close_ms))
            .build_with_clock(clock.clone());
        (gate, clock)
    }

    fn feed<C: Clock>(
        gate: &mut HysteresisGate<i32, C>,
        clock: &ManualClock,
        values: &[i32],
    ) -> Vec<ProcessResult<i32>> {
        values
            .iter()
            .map(|&v| {
                clock.advance(TICK);
                gate.process(v).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let clock = ManualClock::from_millis(1_234);
        let gate = HysteresisGate::builder(|_: &i32| true).build_with_clock(clock);

        assert!(!gate.is_open());
        assert!(!gate.should_open());
        assert_eq!(gate.status(), GateStatus::Closed);
        assert_eq!(gate.last_transition(), Instant::from_millis(1_234));
        assert_eq!(gate.time_before_open(), DEFAULT_GATE_OPEN_TIME);
        assert_eq!(gate.time_before_close(), DEFAULT_GATE_CLOSE_TIME);
        assert!(!gate.has_closed_value());
    }

    #[test_log::test]
    fn test_results_carry_pass_closed_and_suppressed() {
        let clock = ManualClock::new();
        let mut gate = HysteresisGate::builder(|v: &i32| *v > 0)
            .closed_value(|| -1)
            .timing(GateTiming::from_millis(0, 0))
            .build_with_clock(clock.clone());

        let results = feed(&mut gate, &clock, &[5, 0, 7]);
        assert_debug_snapshot!(results, @r###"
        [
            Pass(
                5,
            ),
            Closed(
                -1,
            ),
            Pass(
                7,
            ),
        ]
        "###);

        let (mut gate, clock) = make_gate(|v| *v > 0, 0, 0);
        let results = feed(&mut gate, &clock, &[0]);
        assert_eq!(results, vec![ProcessResult::Suppressed]);
    }

    #[test_log::test]
    fn test_state_after_opening() {
        let (mut gate, clock) = make_gate(|v| *v == 2, 150, 150);

        feed(&mut gate, &clock, &[1, 2, 2, 2]);

        assert_debug_snapshot!(gate.state(), @r###"
        GateState {
            is_open: true,
            should_open: true,
            last_transition: Instant(
                200,
            ),
        }
        "###);
    }

    #[test]
    fn test_last_transition_only_moves_when_threshold_flips() {
        let (mut gate, clock) = make_gate(|v| *v == 2, 0, 0);

        feed(&mut gate, &clock, &[1, 1]);
        assert_eq!(gate.last_transition(), Instant::from_millis(0));

        feed(&mut gate, &clock, &[2]);
        assert_eq!(gate.last_transition(), Instant::from_millis(300));

        feed(&mut gate, &clock, &[2, 2]);
        assert_eq!(gate.last_transition(), Instant::from_millis(300));

        feed(&mut gate, &clock, &[1]);
        assert_eq!(gate.last_transition(), Instant::from_millis(600));
    }

    #[test]
    fn test_held_time_counts_from_threshold_flip_not_from_opening() {
        // opens at 300 after holding since 200, then a long close delay
        let (mut gate, clock) = make_gate(|v| *v == 2, 100, 250);

        feed(&mut gate, &clock, &[1, 2, 2]);
        assert!(gate.is_open());
        assert_eq!(gate.last_transition(), Instant::from_millis(200));

        // close timer starts at the failure, regardless of how long it was open
        let results = feed(&mut gate, &clock, &[1, 1, 1, 1]);
        assert_eq!(
            results,
            vec![
                ProcessResult::Pass(1),
                ProcessResult::Pass(1),
                ProcessResult::Pass(1),
                ProcessResult::Suppressed,
            ]
        );
    }

    #[test]
    fn test_rapid_toggling_never_changes_state() {
        let (mut gate, clock) = make_gate(|v| *v == 2, 150, 150);

        let results = feed(&mut gate, &clock, &[2, 1, 2, 1, 2, 1, 2, 1]);
        assert!(results.iter().all(|r| *r == ProcessResult::Suppressed));
        assert!(!gate.is_open());

        // open it, then toggle: it stays open
        feed(&mut gate, &clock, &[2, 2, 2]);
        assert!(gate.is_open());

        let results = feed(&mut gate, &clock, &[1, 2, 1, 2, 1]);
        assert!(results.iter().all(|r| r.is_emitted()));
        assert!(gate.is_open());
    }

    #[test]
    fn test_setters_take_effect_on_next_value() {
        let (mut gate, clock) = make_gate(|_| true, 1_000, 0);

        feed(&mut gate, &clock, &[1, 1]);
        assert!(!gate.is_open());

        gate.set_time_before_open(Duration::from_millis(100));
        assert!(!gate.is_open());

        feed(&mut gate, &clock, &[1]);
        assert!(gate.is_open());

        gate.set_timing(GateTiming::from_millis(7, 9));
        assert_eq!(gate.timing(), GateTiming::from_millis(7, 9));
        gate.set_time_before_close(Duration::from_millis(11));
        assert_eq!(gate.time_before_close(), Duration::from_millis(11));
    }

    #[test]
    fn test_predicate_error_leaves_state_untouched() {
        let clock = ManualClock::new();
        let mut gate = HysteresisGate::try_builder(|v: &i32| {
            if *v < 0 {
                Err(anyhow!("negative sample {v}"))
            } else {
                Ok(*v == 2)
            }
        })
        .timing(GateTiming::from_millis(0, 0))
        .build_with_clock(clock.clone());

        feed(&mut gate, &clock, &[2]);
        let before = gate.state();

        clock.advance(TICK);
        let err = gate.process(-3).unwrap_err();
        assert_eq!(err.to_string(), "negative sample -3");
        assert_eq!(gate.state(), before);
    }

    #[test]
    fn test_closed_value_not_called_while_open() {
        let clock = ManualClock::new();
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let mut gate = HysteresisGate::builder(|v: &i32| *v == 2)
            .closed_value(move || {
                counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                0
            })
            .timing(GateTiming::from_millis(0, 0))
            .build_with_clock(clock.clone());

        feed(&mut gate, &clock, &[2, 2, 1, 2]);
        assert_eq!(calls.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_debug_hides_closures() {
        let (gate, _clock) = make_gate(|_| true, 1, 2);
        let s = format!("{gate:?}");
        assert!(s.starts_with("HysteresisGate"));
        assert!(s.contains("has_closed_value: false"));
    }
}
