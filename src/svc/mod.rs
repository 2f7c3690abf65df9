pub use clock::{Clock, Instant, ManualClock, MonotonicClock};

pub mod clock;
