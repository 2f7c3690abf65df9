use crate::gate::{HysteresisGate, ProcessResult};
use crate::stream::Sink;
use crate::svc::Clock;

/// A gate lifted onto a downstream sink.
///
/// Upstream calls `on_next` for every value in arrival order. A predicate
/// failure is delivered once through `on_error` and ends the stream: all
/// later calls are ignored.
pub struct GateOperator<T, C, S> {
    gate: HysteresisGate<T, C>,
    sink: S,
    terminated: bool,
}

impl<T, C: Clock, S: Sink<T>> GateOperator<T, C, S> {
    pub fn new(gate: HysteresisGate<T, C>, sink: S) -> Self {
        Self {
            gate,
            sink,
            terminated: false,
        }
    }

    fn is_live(&self) -> bool {
        !self.terminated && !self.sink.is_unsubscribed()
    }

    pub fn on_next(&mut self, value: T) {
        if !self.is_live() {
            return;
        }

        match self.gate.process(value) {
            Ok(ProcessResult::Pass(v)) | Ok(ProcessResult::Closed(v)) => self.sink.on_next(v),
            Ok(ProcessResult::Suppressed) => {}
            Err(e) => {
                log::warn!("Threshold predicate failed: {e:#}");
                self.terminated = true;
                self.sink.on_error(e);
            }
        }
    }

    pub fn on_completed(&mut self) {
        if self.is_live() {
            self.terminated = true;
            self.sink.on_completed();
        }
    }

    pub fn on_error(&mut self, error: anyhow::Error) {
        if self.is_live() {
            self.terminated = true;
            self.sink.on_error(error);
        }
    }

    /// Feeds every value, then completes.
    pub fn run<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        for value in values {
            if !self.is_live() {
                return;
            }
            self.on_next(value);
        }
        self.on_completed();
    }
}

impl<T, C, S> GateOperator<T, C, S> {
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn gate(&self) -> &HysteresisGate<T, C> {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut HysteresisGate<T, C> {
        &mut self.gate
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_parts(self) -> (HysteresisGate<T, C>, S) {
        (self.gate, self.sink)
    }
}

impl<T, C: Clock> HysteresisGate<T, C> {
    pub fn lift<S: Sink<T>>(self, sink: S) -> GateOperator<T, C, S> {
        GateOperator::new(self, sink)
    }
}
