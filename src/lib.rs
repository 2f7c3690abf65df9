pub use config::GateTiming;
pub use gate::{GateBuilder, GateState, GateStatus, HysteresisGate, ProcessResult};

pub mod config;
pub mod gate;
pub mod stream;
pub mod svc;
