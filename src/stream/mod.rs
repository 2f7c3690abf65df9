//! Glue between a [`HysteresisGate`](crate::gate::HysteresisGate) and the
//! code feeding it, either push style through a [`Sink`] or pull style
//! through an [`Iterator`].

pub use iter::{GateIterExt, Gated, TryGated};
pub use operator::GateOperator;
pub use sink::{CollectSink, Sink};

mod iter;
mod operator;
mod sink;
