use crate::svc::Instant;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
pub enum GateStatus {
    #[default]
    Closed,
    Open,
}

impl GateStatus {
    pub fn is_open(&self) -> bool {
        *self == GateStatus::Open
    }
}

impl From<bool> for GateStatus {
    fn from(is_open: bool) -> Self {
        if is_open {
            GateStatus::Open
        } else {
            GateStatus::Closed
        }
    }
}

/// Everything the gate remembers between two processed values.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub struct GateState {
    pub is_open: bool,
    /// Latest predicate result, the state the timer is counting toward.
    pub should_open: bool,
    /// Set when `should_open` last flipped.
    pub last_transition: Instant,
}

impl GateState {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            is_open: false,
            should_open: false,
            last_transition: now,
        }
    }

    pub fn status(&self) -> GateStatus {
        self.is_open.into()
    }
}

/// Outcome of one processed value.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ProcessResult<T> {
    /// Gate is open, the original value goes through.
    Pass(T),
    /// Gate is closed, this is the closed-value provider's output.
    Closed(T),
    /// Gate is closed and there is nothing to emit for this tick.
    Suppressed,
}

impl<T> ProcessResult<T> {
    pub fn is_emitted(&self) -> bool {
        !matches!(self, ProcessResult::Suppressed)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            ProcessResult::Pass(v) | ProcessResult::Closed(v) => Some(v),
            ProcessResult::Suppressed => None,
        }
    }
}
