use crate::gate::HysteresisGate;
use crate::svc::Clock;

/// Iterator adapters driving a [`HysteresisGate`].
pub trait GateIterExt: Iterator + Sized {
    /// Yields what the gate emits. A predicate failure is yielded once,
    /// then the iterator ends.
    fn gated<C: Clock>(self, gate: HysteresisGate<Self::Item, C>) -> Gated<Self, C> {
        Gated {
            iter: self,
            gate,
            done: false,
        }
    }

    /// Like [`gated`](GateIterExt::gated), for fallible upstreams. Upstream
    /// errors are yielded unchanged and end the iterator.
    fn try_gated<T, E, C>(self, gate: HysteresisGate<T, C>) -> TryGated<Self, T, C>
    where
        Self: Iterator<Item = Result<T, E>>,
        E: Into<anyhow::Error>,
        C: Clock,
    {
        TryGated {
            iter: self,
            gate,
            done: false,
        }
    }
}

impl<I: Iterator> GateIterExt for I {}

pub struct Gated<I: Iterator, C> {
    iter: I,
    gate: HysteresisGate<I::Item, C>,
    done: bool,
}

impl<I: Iterator, C> Gated<I, C> {
    pub fn gate(&self) -> &HysteresisGate<I::Item, C> {
        &self.gate
    }
}

impl<I: Iterator, C: Clock> Iterator for Gated<I, C> {
    type Item = anyhow::Result<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        for value in self.iter.by_ref() {
            match self.gate.process(value) {
                Ok(result) => {
                    if let Some(v) = result.into_option() {
                        return Some(Ok(v));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        self.done = true;
        None
    }
}

impl<I: Iterator, C: Clock> std::iter::FusedIterator for Gated<I, C> {}

pub struct TryGated<I, T, C> {
    iter: I,
    gate: HysteresisGate<T, C>,
    done: bool,
}

impl<I, T, C> TryGated<I, T, C> {
    pub fn gate(&self) -> &HysteresisGate<T, C> {
        &self.gate
    }
}

impl<I, T, E, C> Iterator for TryGated<I, T, C>
where
    I: Iterator<Item = Result<T, E>>,
    E: Into<anyhow::Error>,
    C: Clock,
{
    type Item = anyhow::Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        for item in self.iter.by_ref() {
            let processed = item
                .map_err(Into::into)
                .and_then(|value| self.gate.process(value));

            match processed {
                Ok(result) => {
                    if let Some(v) = result.into_option() {
                        return Some(Ok(v));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        self.done = true;
        None
    }
}

impl<I, T, E, C> std::iter::FusedIterator for TryGated<I, T, C>
where
    I: Iterator<Item = Result<T, E>>,
    E: Into<anyhow::Error>,
    C: Clock,
{
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use crate::config::GateTiming;
    use crate::gate::HysteresisGate;
    use crate::svc::ManualClock;

    use super::*;

    #[test]
    fn test_gated_skips_suppressed_values() {
        let gate = HysteresisGate::with_timing(|v: &i32| v % 2 == 0, GateTiming::from_millis(0, 0));
        let out: Vec<i32> = [2, 3, 4, 5, 6]
            .into_iter()
            .gated(gate)
            .collect::<anyhow::Result<_>>()
            .unwrap();

        assert_eq!(out, vec![2, 4, 6]);
    }

    #[test]
    fn test_gated_stops_after_predicate_error() {
        let gate = HysteresisGate::try_builder(|v: &i32| {
            if *v > 100 {
                Err(anyhow!("out of range"))
            } else {
                Ok(true)
            }
        })
        .timing(GateTiming::from_millis(0, 0))
        .build_with_clock(ManualClock::new());

        let mut it = [1, 200, 3].into_iter().gated(gate);

        assert_eq!(it.next().unwrap().unwrap(), 1);
        assert_eq!(it.next().unwrap().unwrap_err().to_string(), "out of range");
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_try_gated_forwards_upstream_error() {
        let gate = HysteresisGate::builder(|_: &i32| true)
            .timing(GateTiming::from_millis(0, 0))
            .build_with_clock(ManualClock::new());

        let upstream: Vec<Result<i32, std::num::ParseIntError>> =
            vec![Ok(1), "x".parse::<i32>(), Ok(3)];
        let mut it = upstream.into_iter().try_gated(gate);

        assert_eq!(it.next().unwrap().unwrap(), 1);
        let err = it.next().unwrap().unwrap_err();
        assert!(err.downcast_ref::<std::num::ParseIntError>().is_some());
        assert!(it.next().is_none());
        assert!(it.gate().is_open());
    }
}
